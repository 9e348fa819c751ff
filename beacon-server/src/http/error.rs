use std::time::Duration;

use axum::{
    Json,
    http::{
        HeaderValue, StatusCode,
        header::{CACHE_CONTROL, CONTENT_TYPE, RETRY_AFTER},
    },
    response::{IntoResponse, Response},
};
use serde_json::{Value, json};
use shared::models::StoreError;
use thiserror::Error;

use super::problem::{ErrorCode, PROBLEM_JSON, ProblemDetails};

/// How long clients are told to wait after a store outage.
pub const STORE_RETRY_AFTER: Duration = Duration::from_secs(5);

pub type AppResult<T> = Result<T, ApiError>;

/// Error returned by handlers and middleware; rendered as a problem document.
#[derive(Debug, Error)]
#[error("{code}: {message}")]
pub struct ApiError {
    code: ErrorCode,
    message: String,
    details: Option<Value>,
    retry_after: Option<Duration>,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
            retry_after: None,
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Unauthorized, message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ValidationFailed, message)
    }

    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self {
            retry_after: Some(STORE_RETRY_AFTER),
            ..Self::new(ErrorCode::StoreUnavailable, message)
        }
    }

    pub fn internal_server_error(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }

    #[must_use]
    pub fn with_details(self, details: Value) -> Self {
        Self {
            details: Some(details),
            ..self
        }
    }

    pub const fn status(&self) -> StatusCode {
        self.code.status()
    }

    pub const fn code(&self) -> ErrorCode {
        self.code
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let retry_after = self.retry_after;
        let problem = ProblemDetails::new(self.code, self.message, self.details);

        let mut response = (status, Json(problem)).into_response();
        let headers = response.headers_mut();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(PROBLEM_JSON));
        headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-store"));
        if let Some(wait) = retry_after {
            headers.insert(RETRY_AFTER, HeaderValue::from(wait.as_secs()));
        }
        response
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Unavailable(message) => Self::service_unavailable(message),
            StoreError::Rejected(message) => Self::bad_request(message),
        }
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        Self::internal_server_error(format!("{err:#}"))
    }
}

impl From<http::Error> for ApiError {
    fn from(err: http::Error) -> Self {
        Self::internal_server_error(err.to_string())
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        Self::internal_server_error("failed to encode response")
            .with_details(json!({ "reason": err.to_string() }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_json(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), 4096)
            .await
            .expect("read body");
        serde_json::from_slice(&bytes).expect("problem json")
    }

    #[test]
    fn store_errors_keep_their_meaning() {
        let unavailable = ApiError::from(StoreError::Unavailable("pool timed out".into()));
        assert_eq!(unavailable.code(), ErrorCode::StoreUnavailable);
        assert_eq!(unavailable.status(), StatusCode::SERVICE_UNAVAILABLE);

        let rejected = ApiError::from(StoreError::Rejected("title must not be empty".into()));
        assert_eq!(rejected.code(), ErrorCode::ValidationFailed);
        assert_eq!(rejected.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn unauthorized_renders_problem_json() {
        let response = ApiError::unauthorized("missing principal")
            .with_details(json!({ "header": "x-principal-id" }))
            .into_response();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(response.headers()[CONTENT_TYPE], PROBLEM_JSON);
        assert_eq!(response.headers()[CACHE_CONTROL], "no-store");
        assert!(response.headers().get(RETRY_AFTER).is_none());

        let json = body_json(response).await;
        assert_eq!(json["code"], "unauthorized");
        assert_eq!(json["status"], 401);
        assert_eq!(json["message"], "missing principal");
        assert_eq!(json["details"]["header"], "x-principal-id");
    }

    #[tokio::test]
    async fn store_outage_asks_clients_to_retry_later() {
        let response = ApiError::from(StoreError::Unavailable("down".into())).into_response();

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(response.headers()[RETRY_AFTER], "5");
        assert_eq!(body_json(response).await["title"], "Notification store unavailable");
    }
}
