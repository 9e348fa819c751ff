//! Scripted [`NotificationApi`] double for consumer and reconciler tests.

use std::{
    collections::VecDeque,
    sync::{
        Mutex,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
};

use async_trait::async_trait;
use futures_util::{StreamExt, stream};
use shared::models::{MarkReadRequest, MarkReadResponse, Notification, SnapshotResponse, StreamFrame};
use tokio::{sync::mpsc, time::Instant};

use crate::{
    api::{FrameStream, NotificationApi},
    error::ClientError,
};

/// What the next `open_stream` call does.
pub(crate) enum Script {
    /// The request fails before any frame.
    Fail,
    /// Yields the frames, then the server closes the stream.
    Frames(Vec<StreamFrame>),
    /// Yields the frames, then stays open without sending anything.
    Hold(Vec<StreamFrame>),
    /// Yields whatever the test pushes; ends when the sender is dropped.
    Live(mpsc::UnboundedReceiver<StreamFrame>),
}

#[derive(Default)]
pub(crate) struct FakeApi {
    scripts: Mutex<VecDeque<Script>>,
    snapshot: Mutex<(Vec<Notification>, u64)>,
    snapshot_calls: AtomicUsize,
    opened_at: Mutex<Vec<Instant>>,
    mark_requests: Mutex<Vec<MarkReadRequest>>,
    fail_mark_read: AtomicBool,
}

impl FakeApi {
    pub(crate) fn new(scripts: impl IntoIterator<Item = Script>) -> Self {
        Self {
            scripts: Mutex::new(scripts.into_iter().collect()),
            ..Self::default()
        }
    }

    pub(crate) fn with_snapshot(self, rows: Vec<Notification>, unread_count: u64) -> Self {
        *self.snapshot.lock().unwrap() = (rows, unread_count);
        self
    }

    pub(crate) fn fail_mark_read(&self, fail: bool) {
        self.fail_mark_read.store(fail, Ordering::SeqCst);
    }

    pub(crate) fn snapshot_calls(&self) -> usize {
        self.snapshot_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn opened_at(&self) -> Vec<Instant> {
        self.opened_at.lock().unwrap().clone()
    }

    pub(crate) fn mark_requests(&self) -> Vec<MarkReadRequest> {
        self.mark_requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl NotificationApi for FakeApi {
    async fn snapshot(&self, limit: usize, unread_only: bool) -> Result<SnapshotResponse, ClientError> {
        self.snapshot_calls.fetch_add(1, Ordering::SeqCst);
        let (rows, unread_count) = self.snapshot.lock().unwrap().clone();
        let data = rows
            .into_iter()
            .filter(|row| !unread_only || !row.is_read)
            .take(limit)
            .collect();
        Ok(SnapshotResponse {
            success: true,
            data,
            unread_count,
        })
    }

    async fn open_stream(&self) -> Result<FrameStream, ClientError> {
        self.opened_at.lock().unwrap().push(Instant::now());
        let script = self.scripts.lock().unwrap().pop_front().unwrap_or(Script::Fail);

        match script {
            Script::Fail => Err(ClientError::Channel("connection refused".into())),
            Script::Frames(frames) => Ok(Box::pin(stream::iter(frames.into_iter().map(Ok::<_, ClientError>)))),
            Script::Hold(frames) => Ok(Box::pin(
                stream::iter(frames.into_iter().map(Ok::<_, ClientError>)).chain(stream::pending()),
            )),
            Script::Live(receiver) => Ok(Box::pin(stream::unfold(receiver, |mut receiver| async move {
                receiver
                    .recv()
                    .await
                    .map(|frame| (Ok::<_, ClientError>(frame), receiver))
            }))),
        }
    }

    async fn mark_read(&self, request: MarkReadRequest) -> Result<MarkReadResponse, ClientError> {
        self.mark_requests.lock().unwrap().push(request.clone());
        if self.fail_mark_read.load(Ordering::SeqCst) {
            return Err(ClientError::MarkReadFailed("store unavailable".into()));
        }
        let updated = request.notification_ids.len() as u64;
        Ok(MarkReadResponse {
            success: true,
            updated,
        })
    }
}
