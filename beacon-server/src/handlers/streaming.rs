use std::{convert::Infallible, sync::Arc};

use axum::{
    extract::State,
    http::{
        HeaderName, HeaderValue,
        header::{CACHE_CONTROL, CONNECTION},
    },
    response::{
        IntoResponse,
        sse::{Event, Sse},
    },
};
use futures_util::StreamExt;
use shared::models::StreamFrame;
use tracing::{error, info};

use crate::{app_state::AppState, middleware::auth::Principal, services::StreamController};

static X_ACCEL_BUFFERING: HeaderName = HeaderName::from_static("x-accel-buffering");

/// One SSE message per frame: `event:` carries the frame type, `data:` the JSON object.
pub(crate) fn frame_event(frame: &StreamFrame) -> Event {
    let kind = frame.kind().as_str();
    match serde_json::to_string(frame) {
        Ok(data) => Event::default().event(kind).data(data),
        Err(err) => {
            error!(kind, error = %err, "failed to encode stream frame");
            Event::default().comment("frame encoding failed")
        }
    }
}

/// Push channel for the calling principal. The poll loop runs until the client disconnects or the
/// server shuts down.
#[utoipa::path(
    get,
    path = "/api/notifications/stream",
    params(("x-principal-id" = uuid::Uuid, Header, description = "Authenticated principal")),
    responses(
        (status = 200, description = "text/event-stream of connected, notification and heartbeat frames", body = StreamFrame, content_type = "text/event-stream"),
        (status = 401, description = "Missing or malformed principal")
    ),
    tag = "Notifications"
)]
pub async fn stream_notifications(
    State(state): State<Arc<AppState>>,
    Principal(principal_id): Principal,
) -> impl IntoResponse {
    let frames = StreamController::open(
        Arc::clone(&state.store),
        Arc::clone(&state.registry),
        &state.config.stream,
        principal_id,
    )
    .await;
    info!(principal_id = %principal_id, connection_id = %frames.connection_id(), "notification stream established");

    let events = frames.map(|frame| Ok::<_, Infallible>(frame_event(&frame)));

    (
        [
            (CACHE_CONTROL, HeaderValue::from_static("no-cache")),
            (CONNECTION, HeaderValue::from_static("keep-alive")),
            (X_ACCEL_BUFFERING.clone(), HeaderValue::from_static("no")),
        ],
        Sse::new(events),
    )
}
