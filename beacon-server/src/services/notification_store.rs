use async_trait::async_trait;
use chrono::{DateTime, Utc};
use shared::models::{
    CreateNotificationRequest, Notification, NotificationType, RelatedEntityType, StoreError,
    StoreResult, Timestamp,
};
use sqlx::PgPool;
use std::sync::Arc;
use tracing::{trace, warn};
use uuid::Uuid;

use crate::db::bootstrap;

/// Typed access to the durable notification table.
///
/// Every read returns rows newest first. Implementations hold no per-connection state; callers own
/// cursors and retry policy.
#[async_trait]
pub trait NotificationStore: Send + Sync {
    /// Rows for `recipient_id` with `created_at >= cursor`, newest first, at most `limit`.
    ///
    /// The bound is inclusive so rows sharing the cursor's timestamp are never skipped; callers
    /// filter the ones they already delivered.
    async fn fetch_since(
        &self,
        recipient_id: Uuid,
        cursor: Timestamp,
        limit: usize,
    ) -> StoreResult<Vec<Notification>>;

    /// Most recent rows for the snapshot surface.
    async fn fetch_recent(
        &self,
        recipient_id: Uuid,
        limit: usize,
        unread_only: bool,
    ) -> StoreResult<Vec<Notification>>;

    async fn count_unread(&self, recipient_id: Uuid) -> StoreResult<u64>;

    /// Marks the given ids read. Returns how many rows flipped; already-read or foreign ids are
    /// ignored rather than reported as errors.
    async fn mark_read(&self, recipient_id: Uuid, ids: &[Uuid]) -> StoreResult<u64>;

    async fn mark_all_read(&self, recipient_id: Uuid) -> StoreResult<u64>;

    /// Inserts a notification on behalf of a business-logic producer.
    async fn create(&self, request: CreateNotificationRequest) -> StoreResult<Notification>;

    /// Cheap readiness probe.
    async fn ping(&self) -> StoreResult<()>;
}

pub type SharedNotificationStore = Arc<dyn NotificationStore>;

/// Maps driver failures onto the store taxonomy. Constraint and data errors are the caller's
/// fault; everything else is treated as a transient outage.
pub(crate) fn store_error(err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => StoreError::Rejected(db_err.message().to_string()),
        sqlx::Error::RowNotFound | sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) => {
            StoreError::Rejected(err.to_string())
        }
        other => StoreError::Unavailable(other.to_string()),
    }
}

#[derive(Clone, Debug, sqlx::FromRow)]
struct NotificationRow {
    id: Uuid,
    recipient_id: Uuid,
    #[sqlx(rename = "type")]
    notification_type: String,
    title: String,
    message: String,
    related_type: Option<String>,
    related_id: Option<Uuid>,
    is_read: bool,
    created_at: DateTime<Utc>,
}

impl NotificationRow {
    fn into_notification(self) -> Option<Notification> {
        let Ok(notification_type) = NotificationType::try_from(self.notification_type.as_str())
        else {
            warn!(id = %self.id, kind = %self.notification_type, "skipping notification with unknown type");
            return None;
        };
        let related_type = self
            .related_type
            .as_deref()
            .and_then(|value| RelatedEntityType::try_from(value).ok());

        Some(Notification {
            id: self.id,
            recipient_id: self.recipient_id,
            notification_type,
            title: self.title,
            message: self.message,
            related_type,
            related_id: self.related_id,
            is_read: self.is_read,
            created_at: Timestamp(self.created_at),
        })
    }
}

const SELECT_COLUMNS: &str =
    "id, recipient_id, type, title, message, related_type, related_id, is_read, created_at";

fn sql_limit(limit: usize) -> i64 {
    i64::try_from(limit).unwrap_or(i64::MAX)
}

/// PostgreSQL-backed accessor.
#[derive(Clone, Debug)]
pub struct PgNotificationStore {
    pool: PgPool,
}

impl PgNotificationStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn collect(rows: Vec<NotificationRow>) -> Vec<Notification> {
        rows.into_iter()
            .filter_map(NotificationRow::into_notification)
            .collect()
    }
}

#[async_trait]
impl NotificationStore for PgNotificationStore {
    async fn fetch_since(
        &self,
        recipient_id: Uuid,
        cursor: Timestamp,
        limit: usize,
    ) -> StoreResult<Vec<Notification>> {
        let rows = sqlx::query_as::<_, NotificationRow>(&format!(
            "SELECT {SELECT_COLUMNS} FROM notifications \
             WHERE recipient_id = $1 AND created_at >= $2 \
             ORDER BY created_at DESC, id DESC LIMIT $3"
        ))
        .bind(recipient_id)
        .bind(cursor.0)
        .bind(sql_limit(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(store_error)?;

        trace!(recipient_id = %recipient_id, cursor = %cursor, rows = rows.len(), "fetched notifications since cursor");
        Ok(Self::collect(rows))
    }

    async fn fetch_recent(
        &self,
        recipient_id: Uuid,
        limit: usize,
        unread_only: bool,
    ) -> StoreResult<Vec<Notification>> {
        let rows = sqlx::query_as::<_, NotificationRow>(&format!(
            "SELECT {SELECT_COLUMNS} FROM notifications \
             WHERE recipient_id = $1 AND ($2 = FALSE OR is_read = FALSE) \
             ORDER BY created_at DESC, id DESC LIMIT $3"
        ))
        .bind(recipient_id)
        .bind(unread_only)
        .bind(sql_limit(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(store_error)?;

        Ok(Self::collect(rows))
    }

    async fn count_unread(&self, recipient_id: Uuid) -> StoreResult<u64> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM notifications WHERE recipient_id = $1 AND is_read = FALSE",
        )
        .bind(recipient_id)
        .fetch_one(&self.pool)
        .await
        .map_err(store_error)?;

        Ok(u64::try_from(count).unwrap_or_default())
    }

    async fn mark_read(&self, recipient_id: Uuid, ids: &[Uuid]) -> StoreResult<u64> {
        if ids.is_empty() {
            return Ok(0);
        }

        let result = sqlx::query(
            "UPDATE notifications SET is_read = TRUE \
             WHERE recipient_id = $1 AND id = ANY($2) AND is_read = FALSE",
        )
        .bind(recipient_id)
        .bind(ids)
        .execute(&self.pool)
        .await
        .map_err(store_error)?;

        Ok(result.rows_affected())
    }

    async fn mark_all_read(&self, recipient_id: Uuid) -> StoreResult<u64> {
        let result = sqlx::query(
            "UPDATE notifications SET is_read = TRUE WHERE recipient_id = $1 AND is_read = FALSE",
        )
        .bind(recipient_id)
        .execute(&self.pool)
        .await
        .map_err(store_error)?;

        Ok(result.rows_affected())
    }

    async fn create(&self, request: CreateNotificationRequest) -> StoreResult<Notification> {
        request.validate().map_err(StoreError::Rejected)?;

        let row = sqlx::query_as::<_, NotificationRow>(&format!(
            "INSERT INTO notifications \
             (id, recipient_id, type, title, message, related_type, related_id) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             RETURNING {SELECT_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(request.recipient_id)
        .bind(request.notification_type.as_str())
        .bind(&request.title)
        .bind(&request.message)
        .bind(request.related_type.map(RelatedEntityType::as_str))
        .bind(request.related_id)
        .fetch_one(&self.pool)
        .await
        .map_err(store_error)?;

        row.into_notification()
            .ok_or_else(|| StoreError::Rejected("inserted row could not be decoded".to_string()))
    }

    async fn ping(&self) -> StoreResult<()> {
        bootstrap::ensure_readiness(&self.pool)
            .await
            .map_err(store_error)
    }
}
