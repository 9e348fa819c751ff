use std::{
    cmp::Ordering as TimeOrdering,
    collections::{HashMap, HashSet},
    sync::{
        Arc,
        atomic::{AtomicU8, Ordering},
    },
    time::Instant,
};

use metrics::{counter, gauge, histogram};
use shared::models::{Notification, Timestamp};
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use uuid::Uuid;

/// Delivery watermark: the newest `created_at` handed to a client plus the ids delivered at exactly
/// that instant.
///
/// Store reads are inclusive of the watermark, so rows sharing its timestamp come back on every
/// tick; the id set is what keeps them from being sent twice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryCursor {
    watermark: Timestamp,
    delivered: HashSet<Uuid>,
}

impl DeliveryCursor {
    pub fn starting_at(watermark: Timestamp) -> Self {
        Self {
            watermark,
            delivered: HashSet::new(),
        }
    }

    pub fn watermark(&self) -> Timestamp {
        self.watermark
    }

    /// Drops rows older than the watermark or already delivered at it. Preserves input order.
    pub fn unseen(&self, rows: Vec<Notification>) -> Vec<Notification> {
        rows.into_iter()
            .filter(|row| match row.created_at.cmp(&self.watermark) {
                TimeOrdering::Greater => true,
                TimeOrdering::Equal => !self.delivered.contains(&row.id),
                TimeOrdering::Less => false,
            })
            .collect()
    }

    /// Records rows as delivered, raising the watermark to the newest of them.
    pub fn record(&mut self, rows: &[Notification]) {
        for row in rows {
            match row.created_at.cmp(&self.watermark) {
                TimeOrdering::Greater => {
                    self.watermark = row.created_at;
                    self.delivered.clear();
                    self.delivered.insert(row.id);
                }
                TimeOrdering::Equal => {
                    self.delivered.insert(row.id);
                }
                TimeOrdering::Less => {}
            }
        }
    }

    /// Folds another cursor in, keeping whichever watermark is newer.
    pub fn merge(&mut self, other: &Self) {
        match other.watermark.cmp(&self.watermark) {
            TimeOrdering::Greater => *self = other.clone(),
            TimeOrdering::Equal => self.delivered.extend(other.delivered.iter().copied()),
            TimeOrdering::Less => {}
        }
    }
}

const STATE_ACTIVE: u8 = 0;
const STATE_CLOSED: u8 = 1;

/// Ephemeral record of one open push channel.
///
/// The delivery cursor itself lives in the controller that owns the connection; the session only
/// exposes liveness and the cancellation handle.
#[derive(Debug)]
pub struct ConnectionSession {
    connection_id: Uuid,
    principal_id: Uuid,
    token: CancellationToken,
    state: AtomicU8,
    opened_at: Instant,
}

impl ConnectionSession {
    fn new(principal_id: Uuid, token: CancellationToken) -> Arc<Self> {
        Arc::new(Self {
            connection_id: Uuid::new_v4(),
            principal_id,
            token,
            state: AtomicU8::new(STATE_ACTIVE),
            opened_at: Instant::now(),
        })
    }

    pub fn connection_id(&self) -> Uuid {
        self.connection_id
    }

    pub fn principal_id(&self) -> Uuid {
        self.principal_id
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.token.clone()
    }

    pub fn is_active(&self) -> bool {
        self.state.load(Ordering::SeqCst) == STATE_ACTIVE && !self.token.is_cancelled()
    }

    /// Flips the session to closed and cancels its poll loop. Returns `false` if it was already
    /// closed.
    fn close(&self) -> bool {
        if self
            .state
            .compare_exchange(STATE_ACTIVE, STATE_CLOSED, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            self.token.cancel();
            histogram!("beacon_stream_connection_seconds")
                .record(self.opened_at.elapsed().as_secs_f64());
            true
        } else {
            false
        }
    }
}

/// Process-wide registry of open connections and per-principal resume cursors.
///
/// Sessions are removed as soon as their channel closes. Cursors outlive them so a reconnecting
/// principal does not replay rows it already received, until [`StreamRegistry::prune_cursors`]
/// finds them behind the backlog floor with no session left.
#[derive(Debug)]
pub struct StreamRegistry {
    sessions: RwLock<HashMap<Uuid, Arc<ConnectionSession>>>,
    cursors: RwLock<HashMap<Uuid, DeliveryCursor>>,
    shutdown: CancellationToken,
}

impl StreamRegistry {
    /// Every session token is a child of `shutdown`, so cancelling it closes all connections.
    pub fn new(shutdown: CancellationToken) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            cursors: RwLock::new(HashMap::new()),
            shutdown,
        }
    }

    pub async fn open(&self, principal_id: Uuid) -> Arc<ConnectionSession> {
        let session = ConnectionSession::new(principal_id, self.shutdown.child_token());
        let active = {
            let mut guard = self.sessions.write().await;
            guard.insert(session.connection_id(), Arc::clone(&session));
            guard.len()
        };

        counter!("beacon_stream_connections_total").increment(1);
        gauge!("beacon_stream_active_connections").set(active as f64);
        debug!(principal_id = %principal_id, connection_id = %session.connection_id(), active, "stream session registered");
        session
    }

    /// Removes the session and cancels its loop. Safe to call more than once.
    pub async fn close(&self, connection_id: Uuid) -> bool {
        let (session, active) = {
            let mut guard = self.sessions.write().await;
            let session = guard.remove(&connection_id);
            (session, guard.len())
        };
        gauge!("beacon_stream_active_connections").set(active as f64);

        session.is_some_and(|session| {
            let closed = session.close();
            if closed {
                debug!(principal_id = %session.principal_id(), connection_id = %connection_id, active, "stream session closed");
            }
            closed
        })
    }

    /// Raises the principal's resume cursor. Never moves it backwards.
    pub async fn advance(&self, principal_id: Uuid, cursor: &DeliveryCursor) {
        let mut guard = self.cursors.write().await;
        guard
            .entry(principal_id)
            .and_modify(|current| current.merge(cursor))
            .or_insert_with(|| cursor.clone());
    }

    /// Drops cursors whose watermark is older than `floor` for principals with no open session.
    /// Such cursors would never be resumed from. Returns how many were removed.
    pub async fn prune_cursors(&self, floor: Timestamp) -> usize {
        let sessions = self.sessions.read().await;
        let connected: HashSet<Uuid> = sessions.values().map(|session| session.principal_id()).collect();
        let mut cursors = self.cursors.write().await;
        let before = cursors.len();
        cursors.retain(|principal_id, cursor| {
            cursor.watermark() >= floor || connected.contains(principal_id)
        });
        let pruned = before - cursors.len();
        if pruned > 0 {
            debug!(pruned, remaining = cursors.len(), "stale resume cursors pruned");
        }
        pruned
    }

    pub async fn resume_cursor(&self, principal_id: Uuid) -> Option<DeliveryCursor> {
        self.cursors.read().await.get(&principal_id).cloned()
    }

    pub async fn session(&self, connection_id: Uuid) -> Option<Arc<ConnectionSession>> {
        self.sessions.read().await.get(&connection_id).cloned()
    }

    pub async fn active_connections(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn connections_for(&self, principal_id: Uuid) -> usize {
        self.sessions
            .read()
            .await
            .values()
            .filter(|session| session.principal_id() == principal_id)
            .count()
    }

    /// Cancels every open connection. Loops exit and unregister themselves.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }

    pub fn is_shutting_down(&self) -> bool {
        self.shutdown.is_cancelled()
    }
}

pub type SharedStreamRegistry = Arc<StreamRegistry>;
