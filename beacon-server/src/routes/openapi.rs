use std::sync::Arc;

use axum::{
    Router,
    http::header::CONTENT_TYPE,
    response::{IntoResponse, Response},
    routing::get,
};

use crate::{
    app_state::AppState,
    http::error::{ApiError, AppResult},
    openapi::DocFormat,
};

async fn serve_document(format: DocFormat) -> AppResult<Response> {
    let body = format.render().map_err(ApiError::from)?;
    Ok(([(CONTENT_TYPE, format.content_type())], body).into_response())
}

/// `/openapi/beacon.json` and `/openapi/beacon.yaml`, outside principal resolution.
pub fn openapi_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/openapi/beacon.json",
            get(|| serve_document(DocFormat::Json)),
        )
        .route(
            "/openapi/beacon.yaml",
            get(|| serve_document(DocFormat::Yaml)),
        )
}
