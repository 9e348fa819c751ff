use shared::models::MarkReadRequest;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::{api::SharedApi, cache::SharedCache, error::ClientError};

/// Applies read-state changes to the local cache first, then writes them back.
///
/// A failed write-back leaves the optimistic state in place. The next `notification` or
/// `heartbeat` frame carries the server's count and overwrites the local one.
#[derive(Clone)]
pub struct ReadStateReconciler {
    api: SharedApi,
    cache: SharedCache,
}

impl ReadStateReconciler {
    #[must_use]
    pub fn new(api: SharedApi, cache: SharedCache) -> Self {
        Self { api, cache }
    }

    /// Marks `ids` read. Returns how many rows the server flipped.
    ///
    /// # Errors
    /// Returns [`ClientError::MarkReadFailed`] when the server did not acknowledge the call.
    pub async fn mark_as_read(&self, ids: &[Uuid]) -> Result<u64, ClientError> {
        if ids.is_empty() {
            return Ok(0);
        }

        let flipped = self.cache.write().await.mark_read(ids);
        debug!(requested = ids.len(), flipped, "marked notifications read locally");

        let response = self
            .api
            .mark_read(MarkReadRequest::ids(ids.to_vec()))
            .await
            .map_err(write_back_failed)?;
        Ok(response.updated)
    }

    /// Marks every notification read.
    ///
    /// # Errors
    /// Returns [`ClientError::MarkReadFailed`] when the server did not acknowledge the call.
    pub async fn mark_all_as_read(&self) -> Result<u64, ClientError> {
        self.cache.write().await.mark_all_read();
        debug!("marked all notifications read locally");

        let response = self
            .api
            .mark_read(MarkReadRequest::all())
            .await
            .map_err(write_back_failed)?;
        Ok(response.updated)
    }
}

fn write_back_failed(err: ClientError) -> ClientError {
    warn!(error = %err, "mark-read write-back failed; keeping local state");
    match err {
        ClientError::MarkReadFailed(_) => err,
        other => ClientError::MarkReadFailed(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        cache::{NotificationCache, tests::notification},
        testing::FakeApi,
    };
    use std::sync::Arc;

    #[tokio::test]
    async fn mark_as_read_decrements_by_previously_unread_only() {
        let fresh = notification(1, false);
        let seen = notification(2, true);
        let api = Arc::new(FakeApi::new([]));
        let cache = NotificationCache::shared(50);
        cache
            .write()
            .await
            .replace(vec![fresh.clone(), seen.clone()], 4);
        let reconciler = ReadStateReconciler::new(api.clone(), cache.clone());

        reconciler.mark_as_read(&[fresh.id, seen.id]).await.unwrap();

        assert_eq!(cache.read().await.unread_count(), 3);
        assert_eq!(
            api.mark_requests(),
            vec![MarkReadRequest::ids(vec![fresh.id, seen.id])]
        );
    }

    #[tokio::test]
    async fn repeated_mark_read_does_not_double_decrement() {
        let row = notification(1, false);
        let api = Arc::new(FakeApi::new([]));
        let cache = NotificationCache::shared(50);
        cache.write().await.replace(vec![row.clone()], 2);
        let reconciler = ReadStateReconciler::new(api.clone(), cache.clone());

        reconciler.mark_as_read(&[row.id]).await.unwrap();
        reconciler.mark_as_read(&[row.id]).await.unwrap();

        assert_eq!(cache.read().await.unread_count(), 1);
        assert_eq!(api.mark_requests().len(), 2);
    }

    #[tokio::test]
    async fn mark_all_zeroes_immediately() {
        let api = Arc::new(FakeApi::new([]));
        let cache = NotificationCache::shared(50);
        cache
            .write()
            .await
            .replace((0..5).map(|age| notification(age, false)).collect(), 5);
        let reconciler = ReadStateReconciler::new(api.clone(), cache.clone());

        reconciler.mark_all_as_read().await.unwrap();

        assert_eq!(cache.read().await.unread_count(), 0);
        assert!(cache.read().await.iter().all(|row| row.is_read));
        assert_eq!(api.mark_requests(), vec![MarkReadRequest::all()]);
    }

    #[tokio::test]
    async fn failure_keeps_optimistic_state() {
        let row = notification(1, false);
        let api = Arc::new(FakeApi::new([]));
        api.fail_mark_read(true);
        let cache = NotificationCache::shared(50);
        cache.write().await.replace(vec![row.clone()], 1);
        let reconciler = ReadStateReconciler::new(api.clone(), cache.clone());

        let result = reconciler.mark_as_read(&[row.id]).await;

        assert!(matches!(result, Err(ClientError::MarkReadFailed(_))));
        assert_eq!(cache.read().await.unread_count(), 0);
        assert!(cache.read().await.get(row.id).unwrap().is_read);
    }

    #[tokio::test]
    async fn empty_id_set_is_a_no_op() {
        let api = Arc::new(FakeApi::new([]));
        let reconciler = ReadStateReconciler::new(api.clone(), NotificationCache::shared(50));

        assert_eq!(reconciler.mark_as_read(&[]).await.unwrap(), 0);
        assert!(api.mark_requests().is_empty());
    }
}
