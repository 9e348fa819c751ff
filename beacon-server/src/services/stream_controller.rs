use std::{
    panic::AssertUnwindSafe,
    pin::Pin,
    sync::Arc,
    task::{Context, Poll},
    time::Duration,
};

use futures::{FutureExt, Stream};
use metrics::counter;
use shared::{
    config::server::StreamConfig,
    models::{StreamFrame, Timestamp},
};
use tokio::{
    sync::mpsc,
    time::{MissedTickBehavior, interval},
};
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::DropGuard;
use tracing::{debug, error, trace, warn};
use uuid::Uuid;

use super::{
    notification_store::SharedNotificationStore,
    stream_registry::{ConnectionSession, DeliveryCursor, SharedStreamRegistry},
};

/// Frames for one connection. Dropping it cancels the connection's poll loop.
#[derive(Debug)]
pub struct FrameStream {
    connection_id: Uuid,
    frames: ReceiverStream<StreamFrame>,
    _cancel_on_drop: DropGuard,
}

impl FrameStream {
    pub fn connection_id(&self) -> Uuid {
        self.connection_id
    }
}

impl Stream for FrameStream {
    type Item = StreamFrame;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.frames).poll_next(cx)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TickOutcome {
    Delivered,
    Skipped,
    ChannelClosed,
}

/// Owns one push channel: polls the store on a fixed cadence and emits exactly one frame per
/// successful tick.
pub struct StreamController {
    store: SharedNotificationStore,
    registry: SharedStreamRegistry,
    session: Arc<ConnectionSession>,
    cursor: DeliveryCursor,
    poll_interval: Duration,
    fetch_limit: usize,
    frames: mpsc::Sender<StreamFrame>,
}

impl std::fmt::Debug for StreamController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamController")
            .field("connection_id", &self.session.connection_id())
            .field("principal_id", &self.session.principal_id())
            .field("cursor", &self.cursor)
            .finish_non_exhaustive()
    }
}

impl StreamController {
    /// Registers a session for `principal_id`, spawns its poll loop and returns the frame stream.
    ///
    /// The starting cursor is the backlog window floor, or the principal's resume cursor when that
    /// is newer.
    pub async fn open(
        store: SharedNotificationStore,
        registry: SharedStreamRegistry,
        settings: &StreamConfig,
        principal_id: Uuid,
    ) -> FrameStream {
        let session = registry.open(principal_id).await;
        let floor = Timestamp::now().minus(settings.backlog_window());
        registry.prune_cursors(floor).await;
        let cursor = match registry.resume_cursor(principal_id).await {
            Some(resumed) if resumed.watermark() >= floor => resumed,
            _ => DeliveryCursor::starting_at(floor),
        };

        let (sender, receiver) = mpsc::channel(settings.channel_capacity.max(1));
        let connection_id = session.connection_id();
        let cancel_on_drop = session.cancellation_token().drop_guard();

        debug!(principal_id = %principal_id, connection_id = %connection_id, cursor = %cursor.watermark(), "opening notification stream");

        let controller = Self {
            store,
            registry,
            session,
            cursor,
            poll_interval: settings.poll_interval(),
            fetch_limit: settings.fetch_limit.max(1),
            frames: sender,
        };
        controller.spawn();

        FrameStream {
            connection_id,
            frames: ReceiverStream::new(receiver),
            _cancel_on_drop: cancel_on_drop,
        }
    }

    /// Runs the loop on its own task. A panic inside one loop is logged and contained; the session is
    /// always unregistered afterwards.
    fn spawn(self) {
        let registry = Arc::clone(&self.registry);
        let connection_id = self.session.connection_id();
        let principal_id = self.session.principal_id();

        tokio::spawn(async move {
            if AssertUnwindSafe(self.run()).catch_unwind().await.is_err() {
                error!(principal_id = %principal_id, connection_id = %connection_id, "notification stream loop panicked");
            }
            registry.close(connection_id).await;
        });
    }

    async fn run(mut self) {
        let token = self.session.cancellation_token();

        if !self.emit(StreamFrame::connected()).await {
            return;
        }

        let mut ticker = interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                () = token.cancelled() => break,
                _ = ticker.tick() => {}
            }

            let outcome = tokio::select! {
                biased;
                () = token.cancelled() => break,
                outcome = self.tick() => outcome,
            };

            if outcome == TickOutcome::ChannelClosed {
                break;
            }
        }

        debug!(
            principal_id = %self.session.principal_id(),
            connection_id = %self.session.connection_id(),
            cursor = %self.cursor.watermark(),
            "notification stream closed"
        );
    }

    /// One poll: fetch, count, send a single frame, then commit the cursor.
    ///
    /// A store failure skips the tick without sending anything, heartbeat included. An outage
    /// longer than the client's idle timeout therefore reads as a dead channel on the client side,
    /// which reconnects and snapshots again once the store is back.
    async fn tick(&mut self) -> TickOutcome {
        counter!("beacon_stream_ticks_total").increment(1);
        let principal_id = self.session.principal_id();

        let rows = match self
            .store
            .fetch_since(principal_id, self.cursor.watermark(), self.fetch_limit)
            .await
        {
            Ok(rows) => rows,
            Err(err) => {
                counter!("beacon_store_errors_total", "op" => "fetch_since").increment(1);
                warn!(principal_id = %principal_id, connection_id = %self.session.connection_id(), error = %err, "poll tick failed to fetch notifications");
                return TickOutcome::Skipped;
            }
        };
        let fresh = self.cursor.unseen(rows);

        let unread_count = match self.store.count_unread(principal_id).await {
            Ok(count) => count,
            Err(err) => {
                counter!("beacon_store_errors_total", "op" => "count_unread").increment(1);
                warn!(principal_id = %principal_id, connection_id = %self.session.connection_id(), error = %err, "poll tick failed to count unread notifications");
                return TickOutcome::Skipped;
            }
        };

        let frame = if fresh.is_empty() {
            StreamFrame::heartbeat(unread_count)
        } else {
            trace!(principal_id = %principal_id, rows = fresh.len(), unread_count, "delivering notifications");
            StreamFrame::notification(fresh.clone(), unread_count)
        };

        if !self.emit(frame).await {
            return TickOutcome::ChannelClosed;
        }

        if !fresh.is_empty() {
            self.cursor.record(&fresh);
            self.registry.advance(principal_id, &self.cursor).await;
        }
        TickOutcome::Delivered
    }

    async fn emit(&self, frame: StreamFrame) -> bool {
        let kind = frame.kind();
        if self.frames.send(frame).await.is_err() {
            return false;
        }
        counter!("beacon_stream_frames_total", "type" => kind.as_str()).increment(1);
        true
    }
}
