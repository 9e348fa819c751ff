use async_trait::async_trait;
use shared::models::{
    CreateNotificationRequest, Notification, StoreError, StoreResult, Timestamp,
};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::notification_store::NotificationStore;

/// Process-local store used by `serve --in-memory` and as the test double for the accessor.
///
/// `set_available(false)` makes every call fail with [`StoreError::Unavailable`] until it is
/// switched back, which is how store outages are simulated.
#[derive(Debug)]
pub struct MemoryNotificationStore {
    rows: RwLock<Vec<Notification>>,
    available: AtomicBool,
}

impl Default for MemoryNotificationStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryNotificationStore {
    pub fn new() -> Self {
        Self {
            rows: RwLock::new(Vec::new()),
            available: AtomicBool::new(true),
        }
    }

    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Seeds a fully formed row, bypassing validation. Lets callers pick `created_at`.
    pub async fn insert(&self, notification: Notification) {
        self.rows.write().await.push(notification);
    }

    pub async fn len(&self) -> usize {
        self.rows.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.rows.read().await.is_empty()
    }

    fn check(&self) -> StoreResult<()> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(StoreError::Unavailable("in-memory store switched off".to_string()))
        }
    }

    async fn select<F>(&self, recipient_id: Uuid, limit: usize, keep: F) -> Vec<Notification>
    where
        F: Fn(&Notification) -> bool,
    {
        let rows = self.rows.read().await;
        let mut selected: Vec<Notification> = rows
            .iter()
            .filter(|row| row.recipient_id == recipient_id && keep(row))
            .cloned()
            .collect();
        selected.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        selected.truncate(limit);
        selected
    }
}

#[async_trait]
impl NotificationStore for MemoryNotificationStore {
    async fn fetch_since(
        &self,
        recipient_id: Uuid,
        cursor: Timestamp,
        limit: usize,
    ) -> StoreResult<Vec<Notification>> {
        self.check()?;
        Ok(self
            .select(recipient_id, limit, |row| row.created_at >= cursor)
            .await)
    }

    async fn fetch_recent(
        &self,
        recipient_id: Uuid,
        limit: usize,
        unread_only: bool,
    ) -> StoreResult<Vec<Notification>> {
        self.check()?;
        Ok(self
            .select(recipient_id, limit, |row| !unread_only || !row.is_read)
            .await)
    }

    async fn count_unread(&self, recipient_id: Uuid) -> StoreResult<u64> {
        self.check()?;
        let rows = self.rows.read().await;
        Ok(rows
            .iter()
            .filter(|row| row.recipient_id == recipient_id && !row.is_read)
            .count() as u64)
    }

    async fn mark_read(&self, recipient_id: Uuid, ids: &[Uuid]) -> StoreResult<u64> {
        self.check()?;
        let mut rows = self.rows.write().await;
        let mut updated = 0;
        for row in rows
            .iter_mut()
            .filter(|row| row.recipient_id == recipient_id && !row.is_read && ids.contains(&row.id))
        {
            row.is_read = true;
            updated += 1;
        }
        Ok(updated)
    }

    async fn mark_all_read(&self, recipient_id: Uuid) -> StoreResult<u64> {
        self.check()?;
        let mut rows = self.rows.write().await;
        let mut updated = 0;
        for row in rows
            .iter_mut()
            .filter(|row| row.recipient_id == recipient_id && !row.is_read)
        {
            row.is_read = true;
            updated += 1;
        }
        Ok(updated)
    }

    async fn create(&self, request: CreateNotificationRequest) -> StoreResult<Notification> {
        self.check()?;
        request.validate().map_err(StoreError::Rejected)?;

        let notification = Notification {
            id: Uuid::new_v4(),
            recipient_id: request.recipient_id,
            notification_type: request.notification_type,
            title: request.title,
            message: request.message,
            related_type: request.related_type,
            related_id: request.related_id,
            is_read: false,
            created_at: Timestamp::now(),
        };
        self.rows.write().await.push(notification.clone());
        Ok(notification)
    }

    async fn ping(&self) -> StoreResult<()> {
        self.check()
    }
}
