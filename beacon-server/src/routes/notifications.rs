use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};

use crate::{
    app_state::AppState,
    handlers::{
        notifications::{create_notification, list_notifications, mark_read},
        streaming::stream_notifications,
    },
};

/// Routes mounted under `/api`. The caller layers principal resolution on top.
pub fn create_router_notifications() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/notifications",
            get(list_notifications).post(create_notification),
        )
        .route("/notifications/mark-read", post(mark_read))
        .route("/notifications/stream", get(stream_notifications))
}
