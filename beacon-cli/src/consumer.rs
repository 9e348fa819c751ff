//! Reconnecting consumer for the notification push channel.
//!
//! Each connection attempt fetches a snapshot over REST, opens the stream and waits for its
//! `connected` frame. From then on `notification` and `heartbeat` frames are merged into the shared
//! cache. When the channel fails, goes silent past the idle timeout, or is closed by the server,
//! the consumer backs off and reconnects until the [`ReconnectPolicy`] budget is spent.

use std::time::Duration;

use futures_util::StreamExt;
use shared::{
    config::client::ClientConfig,
    models::{Notification, StreamFrame},
};
use tokio::{
    sync::{
        mpsc::{self, error::TrySendError},
        watch,
    },
    task::JoinHandle,
    time::{sleep, timeout},
};
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::{debug, error, info, trace, warn};

use crate::{
    api::{FrameStream, SharedApi},
    backoff::ReconnectPolicy,
    cache::SharedCache,
    error::ClientError,
};

const EVENT_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsumerState {
    Connecting,
    Connected,
    /// Waiting out the backoff before reconnect attempt `attempt` (1-based).
    Reconnecting { attempt: u32 },
    Terminated,
}

/// What the consumer reports to its owner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsumerEvent {
    StateChanged(ConsumerState),
    /// The cache was replaced by a connect-time snapshot.
    Snapshot {
        notifications: Vec<Notification>,
        unread_count: u64,
    },
    /// Rows delivered by the stream that were not cached yet, newest first.
    Arrived(Vec<Notification>),
    /// The server reported a different unread count.
    UnreadCount(u64),
    /// Reconnect budget spent. Real-time updates stay off until the owner starts a new consumer.
    ConnectionLost { attempts: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConsumerOptions {
    pub snapshot_limit: usize,
    pub policy: ReconnectPolicy,
    pub idle_timeout: Duration,
}

impl From<&ClientConfig> for ConsumerOptions {
    fn from(config: &ClientConfig) -> Self {
        Self {
            snapshot_limit: config.snapshot_limit,
            policy: ReconnectPolicy::from(&config.reconnect),
            idle_timeout: config.reconnect.idle_timeout(),
        }
    }
}

impl Default for ConsumerOptions {
    fn default() -> Self {
        Self::from(&ClientConfig::default())
    }
}

/// Owner side of a running consumer. Dropping it tears the consumer down, including any pending
/// reconnect timer.
#[derive(Debug)]
pub struct ConsumerHandle {
    events: mpsc::Receiver<ConsumerEvent>,
    state: watch::Receiver<ConsumerState>,
    cache: SharedCache,
    cancel: CancellationToken,
    task: JoinHandle<Result<(), ClientError>>,
    _cancel_on_drop: DropGuard,
}

impl ConsumerHandle {
    /// Next event, or `None` once the consumer stopped and every event was read.
    ///
    /// Events are buffered up to a fixed depth and dropped past it; [`Self::cache`] and
    /// [`Self::state`] always track the stream regardless.
    pub async fn next_event(&mut self) -> Option<ConsumerEvent> {
        self.events.recv().await
    }

    #[must_use]
    pub fn state(&self) -> ConsumerState {
        *self.state.borrow()
    }

    #[must_use]
    pub fn cache(&self) -> SharedCache {
        SharedCache::clone(&self.cache)
    }

    pub fn close(&self) {
        self.cancel.cancel();
    }

    /// Waits for the consumer to stop.
    ///
    /// # Errors
    /// Returns [`ClientError::ReconnectExhausted`] when it stopped because the reconnect budget
    /// ran out.
    pub async fn join(self) -> Result<(), ClientError> {
        let Self {
            task,
            _cancel_on_drop: _guard,
            ..
        } = self;
        task.await
            .map_err(|err| ClientError::Channel(format!("consumer task failed: {err}")))?
    }
}

pub struct StreamConsumer {
    api: SharedApi,
    cache: SharedCache,
    options: ConsumerOptions,
    events: mpsc::Sender<ConsumerEvent>,
    state: watch::Sender<ConsumerState>,
    cancel: CancellationToken,
}

impl StreamConsumer {
    /// Starts consuming on a background task.
    #[must_use]
    pub fn spawn(api: SharedApi, cache: SharedCache, options: ConsumerOptions) -> ConsumerHandle {
        let (events_tx, events_rx) = mpsc::channel(EVENT_CAPACITY);
        let (state_tx, state_rx) = watch::channel(ConsumerState::Connecting);
        let cancel = CancellationToken::new();

        let consumer = Self {
            api,
            cache: SharedCache::clone(&cache),
            options,
            events: events_tx,
            state: state_tx,
            cancel: cancel.clone(),
        };
        let task = tokio::spawn(consumer.run());

        ConsumerHandle {
            events: events_rx,
            state: state_rx,
            cache,
            cancel: cancel.clone(),
            task,
            _cancel_on_drop: cancel.drop_guard(),
        }
    }

    async fn run(self) -> Result<(), ClientError> {
        let result = tokio::select! {
            biased;
            () = self.cancel.cancelled() => {
                debug!("stream consumer cancelled");
                Ok(())
            }
            result = self.reconnect_loop() => result,
        };
        self.set_state(ConsumerState::Terminated);
        result
    }

    async fn reconnect_loop(&self) -> Result<(), ClientError> {
        let mut attempt = 0;
        self.set_state(ConsumerState::Connecting);

        loop {
            let err = self.session(&mut attempt).await;
            warn!(attempt, error = %err, "notification stream dropped");

            let Some(delay) = self.options.policy.delay_for(attempt) else {
                error!(attempts = attempt, "reconnect budget exhausted");
                self.emit(ConsumerEvent::ConnectionLost { attempts: attempt });
                return Err(ClientError::ReconnectExhausted { attempts: attempt });
            };

            attempt += 1;
            self.set_state(ConsumerState::Reconnecting { attempt });
            debug!(attempt, delay_ms = delay.as_millis(), "reconnect scheduled");
            sleep(delay).await;
        }
    }

    /// One connection lifetime. Only returns once the connection is gone.
    async fn session(&self, attempt: &mut u32) -> ClientError {
        let snapshot = match self.api.snapshot(self.options.snapshot_limit, false).await {
            Ok(snapshot) => snapshot,
            Err(err) => return err,
        };
        self.cache
            .write()
            .await
            .replace(snapshot.data.clone(), snapshot.unread_count);
        self.emit(ConsumerEvent::Snapshot {
            notifications: snapshot.data,
            unread_count: snapshot.unread_count,
        });

        let mut frames = match self.api.open_stream().await {
            Ok(frames) => frames,
            Err(err) => return err,
        };
        match self.next_frame(&mut frames).await {
            Ok(StreamFrame::Connected { .. }) => {}
            Ok(other) => {
                return ClientError::Channel(format!(
                    "expected connected frame, got {}",
                    other.kind().as_str()
                ));
            }
            Err(err) => return err,
        }

        *attempt = 0;
        self.set_state(ConsumerState::Connected);
        info!("notification stream connected");

        loop {
            match self.next_frame(&mut frames).await {
                Ok(frame) => self.apply(frame).await,
                Err(err) => return err,
            }
        }
    }

    async fn next_frame(&self, frames: &mut FrameStream) -> Result<StreamFrame, ClientError> {
        loop {
            match timeout(self.options.idle_timeout, frames.next()).await {
                Err(_) => {
                    return Err(ClientError::Channel(format!(
                        "no frame within {}ms",
                        self.options.idle_timeout.as_millis()
                    )));
                }
                Ok(None) => return Err(ClientError::Channel("stream closed by server".into())),
                Ok(Some(Ok(frame))) => return Ok(frame),
                Ok(Some(Err(ClientError::Decode(err)))) => {
                    warn!(error = %err, "skipping undecodable frame");
                }
                Ok(Some(Err(err))) => return Err(err),
            }
        }
    }

    async fn apply(&self, frame: StreamFrame) {
        let (fresh, unread_count, changed) = {
            let mut cache = self.cache.write().await;
            let previous = cache.unread_count();
            let (fresh, unread_count) = match frame {
                StreamFrame::Connected { .. } => {
                    trace!("ignoring repeated connected frame");
                    return;
                }
                StreamFrame::Notification {
                    notifications,
                    unread_count,
                    ..
                } => (cache.merge(notifications), unread_count),
                StreamFrame::Heartbeat { unread_count, .. } => (Vec::new(), unread_count),
            };
            cache.set_unread_count(unread_count);
            (fresh, unread_count, previous != unread_count)
        };

        if !fresh.is_empty() {
            debug!(count = fresh.len(), "notifications arrived");
            self.emit(ConsumerEvent::Arrived(fresh));
        }
        if changed {
            self.emit(ConsumerEvent::UnreadCount(unread_count));
        }
    }

    fn set_state(&self, state: ConsumerState) {
        if self.state.send_replace(state) != state {
            self.emit(ConsumerEvent::StateChanged(state));
        }
    }

    /// Never waits on the owner: the cache and the state watch are updated before this is called,
    /// so an event that does not fit is dropped.
    fn emit(&self, event: ConsumerEvent) {
        match self.events.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(event)) => {
                debug!(?event, "consumer event queue full; dropping event");
            }
            Err(TrySendError::Closed(_)) => trace!("consumer event receiver dropped"),
        }
    }
}
