use std::str::FromStr;

use axum::{
    body::Body,
    extract::{FromRequestParts, State},
    http::{HeaderName, Request, request::Parts},
    middleware::Next,
    response::Response,
};
use shared::config::server::Config;
use tracing::{Span, debug};
use uuid::Uuid;

use crate::{
    http::error::{ApiError, AppResult},
    middleware::request_context::RequestContext,
};

/// Identity is resolved upstream; this layer only trusts the configured principal header.
#[derive(Clone, Debug)]
pub struct PrincipalState {
    header: HeaderName,
}

impl PrincipalState {
    pub fn from_config(config: &Config) -> Self {
        let header = HeaderName::from_str(&config.server.principal_header)
            .unwrap_or_else(|_| HeaderName::from_static("x-principal-id"));
        Self { header }
    }
}

/// Rejects requests without a valid principal and records it on the [`RequestContext`] and the
/// enclosing request span.
pub async fn require_principal(
    State(state): State<PrincipalState>,
    mut request: Request<Body>,
    next: Next,
) -> AppResult<Response> {
    let principal_id = request
        .headers()
        .get(&state.header)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| Uuid::parse_str(value.trim()).ok())
        .ok_or_else(|| {
            ApiError::unauthorized(format!(
                "a valid `{}` header is required",
                state.header.as_str()
            ))
        })?;

    Span::current().record("principal_id", tracing::field::display(principal_id));
    debug!("principal resolved");
    match request.extensions_mut().get_mut::<RequestContext>() {
        Some(context) => context.principal_id = Some(principal_id),
        None => {
            request.extensions_mut().insert(RequestContext {
                request_id: String::new(),
                principal_id: Some(principal_id),
            });
        }
    }

    Ok(next.run(request).await)
}

/// Extracts the principal resolved by [`require_principal`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Principal(pub Uuid);

impl<S> FromRequestParts<S> for Principal
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<RequestContext>()
            .and_then(|context| context.principal_id)
            .map(Principal)
            .ok_or_else(|| ApiError::unauthorized("request has no authenticated principal"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{Router, http::StatusCode, middleware, routing::get};
    use shared::config::server::Profile;
    use tower::ServiceExt;

    fn app() -> Router {
        let state = PrincipalState::from_config(&Config::default_for_profile(Profile::Test));
        Router::new()
            .route(
                "/whoami",
                get(|Principal(id): Principal| async move { id.to_string() }),
            )
            .route_layer(middleware::from_fn_with_state(state, require_principal))
    }

    #[tokio::test]
    async fn missing_header_is_unauthorized() {
        let response = app()
            .oneshot(Request::builder().uri("/whoami").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn malformed_header_is_unauthorized() {
        let response = app()
            .oneshot(
                Request::builder()
                    .uri("/whoami")
                    .header("x-principal-id", "not-a-uuid")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn valid_header_reaches_handler() {
        let principal = Uuid::new_v4();
        let response = app()
            .oneshot(
                Request::builder()
                    .uri("/whoami")
                    .header("x-principal-id", principal.to_string())
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), 64).await.unwrap();
        assert_eq!(body, principal.to_string());
    }
}
