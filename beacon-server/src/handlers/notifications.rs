use std::sync::Arc;

use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
};
use metrics::counter;
use serde::Deserialize;
use shared::models::{
    CreateNotificationRequest, CreateNotificationResponse, MarkReadAction, MarkReadRequest,
    MarkReadResponse, SnapshotResponse, StoreError,
};
use tracing::{info, warn};
use utoipa::IntoParams;

use crate::{
    app_state::AppState,
    http::error::{ApiError, AppResult},
    middleware::auth::Principal,
};

const DEFAULT_SNAPSHOT_LIMIT: usize = 20;
const MAX_SNAPSHOT_LIMIT: usize = 100;

#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct SnapshotQuery {
    /// Rows to return, newest first. Defaults to 20, capped at 100.
    pub limit: Option<usize>,
    /// Only return rows that are still unread.
    #[serde(default)]
    pub unread_only: bool,
}

impl SnapshotQuery {
    fn effective_limit(&self) -> usize {
        self.limit
            .unwrap_or(DEFAULT_SNAPSHOT_LIMIT)
            .clamp(1, MAX_SNAPSHOT_LIMIT)
    }
}

fn record_store_error(op: &'static str, err: StoreError) -> ApiError {
    counter!("beacon_store_errors_total", "op" => op).increment(1);
    warn!(op, error = %err, "notification store call failed");
    ApiError::from(err)
}

/// Recent notifications plus the authoritative unread count.
#[utoipa::path(
    get,
    path = "/api/notifications",
    params(
        SnapshotQuery,
        ("x-principal-id" = uuid::Uuid, Header, description = "Authenticated principal")
    ),
    responses(
        (status = 200, description = "Notification snapshot", body = SnapshotResponse),
        (status = 401, description = "Missing or malformed principal"),
        (status = 503, description = "Notification store unavailable")
    ),
    tag = "Notifications"
)]
pub async fn list_notifications(
    State(state): State<Arc<AppState>>,
    Principal(principal_id): Principal,
    Query(query): Query<SnapshotQuery>,
) -> AppResult<Json<SnapshotResponse>> {
    let limit = query.effective_limit();
    let (data, unread_count) = tokio::try_join!(
        async {
            state
                .store
                .fetch_recent(principal_id, limit, query.unread_only)
                .await
                .map_err(|err| record_store_error("fetch_recent", err))
        },
        async {
            state
                .store
                .count_unread(principal_id)
                .await
                .map_err(|err| record_store_error("count_unread", err))
        },
    )?;

    Ok(Json(SnapshotResponse {
        success: true,
        data,
        unread_count,
    }))
}

/// Producer hook: persists a notification for its recipient. Connected streams pick it up on their
/// next poll tick.
#[utoipa::path(
    post,
    path = "/api/notifications",
    request_body = CreateNotificationRequest,
    params(("x-principal-id" = uuid::Uuid, Header, description = "Authenticated principal")),
    responses(
        (status = 201, description = "Notification created", body = CreateNotificationResponse),
        (status = 400, description = "Invalid notification"),
        (status = 401, description = "Missing or malformed principal"),
        (status = 503, description = "Notification store unavailable")
    ),
    tag = "Notifications"
)]
pub async fn create_notification(
    State(state): State<Arc<AppState>>,
    Principal(producer_id): Principal,
    Json(request): Json<CreateNotificationRequest>,
) -> AppResult<(StatusCode, Json<CreateNotificationResponse>)> {
    request.validate().map_err(ApiError::bad_request)?;

    let notification = state
        .store
        .create(request)
        .await
        .map_err(|err| record_store_error("create", err))?;

    counter!("beacon_notifications_created_total", "type" => notification.notification_type.as_str())
        .increment(1);
    info!(
        producer_id = %producer_id,
        recipient_id = %notification.recipient_id,
        notification_id = %notification.id,
        kind = notification.notification_type.as_str(),
        "notification created"
    );

    Ok((
        StatusCode::CREATED,
        Json(CreateNotificationResponse {
            success: true,
            data: notification,
        }),
    ))
}

/// Marks notifications read, either by id or all at once. Re-marking is a no-op.
#[utoipa::path(
    post,
    path = "/api/notifications/mark-read",
    request_body = MarkReadRequest,
    params(("x-principal-id" = uuid::Uuid, Header, description = "Authenticated principal")),
    responses(
        (status = 200, description = "Read state updated", body = MarkReadResponse),
        (status = 400, description = "Neither ids nor markAllAsRead supplied"),
        (status = 401, description = "Missing or malformed principal"),
        (status = 503, description = "Notification store unavailable")
    ),
    tag = "Notifications"
)]
pub async fn mark_read(
    State(state): State<Arc<AppState>>,
    Principal(principal_id): Principal,
    Json(request): Json<MarkReadRequest>,
) -> AppResult<Json<MarkReadResponse>> {
    let updated = match request.action().map_err(ApiError::bad_request)? {
        MarkReadAction::Ids(ids) => state
            .store
            .mark_read(principal_id, &ids)
            .await
            .map_err(|err| record_store_error("mark_read", err))?,
        MarkReadAction::All => state
            .store
            .mark_all_read(principal_id)
            .await
            .map_err(|err| record_store_error("mark_all_read", err))?,
    };

    Ok(Json(MarkReadResponse {
        success: true,
        updated,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_limit_defaults_and_clamps() {
        assert_eq!(SnapshotQuery::default().effective_limit(), 20);

        let huge = SnapshotQuery {
            limit: Some(5_000),
            unread_only: false,
        };
        assert_eq!(huge.effective_limit(), 100);

        let zero = SnapshotQuery {
            limit: Some(0),
            unread_only: false,
        };
        assert_eq!(zero.effective_limit(), 1);
    }

    #[test]
    fn store_errors_keep_their_status() {
        let err = record_store_error("count_unread", StoreError::Unavailable("down".into()));
        assert_eq!(err.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
