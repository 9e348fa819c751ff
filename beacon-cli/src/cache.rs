use std::{collections::VecDeque, sync::Arc};

use shared::models::Notification;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Cache shared between the stream consumer and the read-state reconciler.
pub type SharedCache = Arc<RwLock<NotificationCache>>;

/// Bounded local window of recent notifications plus the last known unread count.
///
/// Entries are kept newest first and unique by id. The unread count is whatever the server last
/// reported, adjusted only by optimistic mark-read operations.
#[derive(Debug, Clone)]
pub struct NotificationCache {
    entries: VecDeque<Notification>,
    unread_count: u64,
    capacity: usize,
}

impl NotificationCache {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            unread_count: 0,
            capacity: capacity.max(1),
        }
    }

    #[must_use]
    pub fn shared(capacity: usize) -> SharedCache {
        Arc::new(RwLock::new(Self::new(capacity)))
    }

    /// Replaces the whole window with a fresh snapshot.
    pub fn replace(&mut self, snapshot: Vec<Notification>, unread_count: u64) {
        self.entries.clear();
        for notification in snapshot {
            if !self.contains(notification.id) {
                self.entries.push_back(notification);
            }
        }
        self.entries.truncate(self.capacity);
        self.unread_count = unread_count;
    }

    /// Merges rows from a `notification` frame (newest first) and returns the ones not seen
    /// before, in the same order.
    pub fn merge(&mut self, rows: Vec<Notification>) -> Vec<Notification> {
        let mut fresh: Vec<Notification> = Vec::new();
        for row in rows {
            if !self.contains(row.id) && !fresh.iter().any(|seen| seen.id == row.id) {
                fresh.push(row);
            }
        }

        for row in fresh.iter().rev() {
            self.entries.push_front(row.clone());
        }
        self.entries.truncate(self.capacity);
        fresh
    }

    pub fn set_unread_count(&mut self, unread_count: u64) {
        self.unread_count = unread_count;
    }

    /// Flips the matching cached entries to read and returns how many were unread before.
    pub fn mark_read(&mut self, ids: &[Uuid]) -> u64 {
        let mut flipped = 0;
        for entry in &mut self.entries {
            if !entry.is_read && ids.contains(&entry.id) {
                entry.is_read = true;
                flipped += 1;
            }
        }
        self.unread_count = self.unread_count.saturating_sub(flipped);
        flipped
    }

    pub fn mark_all_read(&mut self) {
        for entry in &mut self.entries {
            entry.is_read = true;
        }
        self.unread_count = 0;
    }

    #[must_use]
    pub fn unread_count(&self) -> u64 {
        self.unread_count
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Notification> {
        self.entries.iter()
    }

    #[must_use]
    pub fn get(&self, id: Uuid) -> Option<&Notification> {
        self.entries.iter().find(|entry| entry.id == id)
    }

    fn contains(&self, id: Uuid) -> bool {
        self.get(id).is_some()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use shared::models::{NotificationType, Timestamp};
    use std::time::Duration;

    pub(crate) fn notification(age_seconds: u64, is_read: bool) -> Notification {
        Notification {
            id: Uuid::new_v4(),
            recipient_id: Uuid::nil(),
            notification_type: NotificationType::CampaignAssigned,
            title: "Campaign".into(),
            message: "You were assigned to a campaign".into(),
            related_type: None,
            related_id: None,
            is_read,
            created_at: Timestamp::now().minus(Duration::from_secs(age_seconds)),
        }
    }

    fn ids(cache: &NotificationCache) -> Vec<Uuid> {
        cache.iter().map(|entry| entry.id).collect()
    }

    #[test]
    fn merge_puts_new_rows_on_top_and_skips_known_ids() {
        let older = notification(30, false);
        let mut cache = NotificationCache::new(10);
        cache.replace(vec![older.clone()], 1);

        let newest = notification(1, false);
        let newer = notification(5, false);
        let fresh = cache.merge(vec![newest.clone(), newer.clone(), older.clone()]);

        assert_eq!(fresh.len(), 2);
        assert_eq!(ids(&cache), vec![newest.id, newer.id, older.id]);
        assert!(cache.merge(vec![newest]).is_empty());
        assert_eq!(cache.len(), 3);
    }

    #[test]
    fn merge_ignores_duplicates_inside_one_frame() {
        let row = notification(2, false);
        let mut cache = NotificationCache::new(10);

        let fresh = cache.merge(vec![row.clone(), row]);

        assert_eq!(fresh.len(), 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn window_is_bounded() {
        let mut cache = NotificationCache::new(3);
        let rows: Vec<_> = (0..5).map(|age| notification(age, false)).collect();

        cache.merge(rows.clone());

        assert_eq!(cache.len(), 3);
        assert_eq!(ids(&cache), rows[..3].iter().map(|r| r.id).collect::<Vec<_>>());
    }

    #[test]
    fn mark_read_counts_only_previously_unread_entries() {
        let unread = notification(1, false);
        let already = notification(2, true);
        let mut cache = NotificationCache::new(10);
        cache.replace(vec![unread.clone(), already.clone()], 7);

        let flipped = cache.mark_read(&[unread.id, already.id, Uuid::new_v4()]);

        assert_eq!(flipped, 1);
        assert_eq!(cache.unread_count(), 6);
        assert_eq!(cache.mark_read(&[unread.id]), 0);
        assert_eq!(cache.unread_count(), 6);
    }

    #[test]
    fn unread_count_never_underflows() {
        let mut cache = NotificationCache::new(10);
        cache.replace(vec![notification(1, false), notification(2, false)], 1);

        let all: Vec<_> = ids(&cache);
        cache.mark_read(&all);

        assert_eq!(cache.unread_count(), 0);
    }

    #[test]
    fn mark_all_read_zeroes_count() {
        let mut cache = NotificationCache::new(10);
        cache.replace((0..5).map(|age| notification(age, false)).collect(), 5);

        cache.mark_all_read();

        assert_eq!(cache.unread_count(), 0);
        assert!(cache.iter().all(|entry| entry.is_read));
    }
}
