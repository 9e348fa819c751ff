use std::str::FromStr;

use axum::{
    body::Body,
    extract::State,
    http::{HeaderMap, HeaderName, HeaderValue, Request},
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use shared::config::server::Config;

/// Per-request data shared between middleware, tracing and handlers.
#[derive(Clone, Debug, Default)]
pub struct RequestContext {
    pub request_id: String,
    /// Set by the principal middleware on `/api` routes.
    pub principal_id: Option<Uuid>,
}

#[derive(Clone, Debug)]
pub struct RequestIdState {
    header: HeaderName,
}

impl RequestIdState {
    pub fn from_config(config: &Config) -> Self {
        let header = HeaderName::from_str(&config.server.request_id_header)
            .unwrap_or_else(|_| HeaderName::from_static("x-request-id"));
        Self { header }
    }
}

const MAX_REQUEST_ID_LEN: usize = 128;

/// Reuses the caller's request id when it is usable, otherwise mints one, and echoes it on the
/// response.
pub async fn assign_request_id(
    State(state): State<RequestIdState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let header_value = caller_request_id(request.headers(), &state.header)
        .unwrap_or_else(minted_request_id);
    let request_id = header_value.to_str().unwrap_or_default().to_owned();

    request.extensions_mut().insert(RequestContext {
        request_id,
        principal_id: None,
    });
    request
        .headers_mut()
        .insert(state.header.clone(), header_value.clone());

    let mut response = next.run(request).await;
    response.headers_mut().insert(state.header, header_value);
    response
}

/// Printable ASCII only, so the id is safe to echo and to log.
fn caller_request_id(headers: &HeaderMap, header: &HeaderName) -> Option<HeaderValue> {
    let raw = headers.get(header)?.to_str().ok()?.trim();
    let usable = !raw.is_empty()
        && raw.len() <= MAX_REQUEST_ID_LEN
        && raw.bytes().all(|byte| byte.is_ascii_graphic());
    if usable {
        HeaderValue::from_str(raw).ok()
    } else {
        None
    }
}

fn minted_request_id() -> HeaderValue {
    let id = Uuid::new_v4();
    HeaderValue::from_str(&id.hyphenated().to_string())
        .unwrap_or_else(|_| HeaderValue::from_static("unassigned"))
}
