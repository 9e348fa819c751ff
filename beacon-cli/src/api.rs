use std::{pin::Pin, sync::Arc};

use async_trait::async_trait;
use futures_util::{Stream, StreamExt, stream};
use reqwest::{Client, StatusCode, header::ACCEPT};
use shared::models::{MarkReadRequest, MarkReadResponse, SnapshotResponse, StreamFrame};
use tracing::debug;
use url::Url;
use uuid::Uuid;

use crate::{error::ClientError, sse::SseDecoder};

/// Header the server reads the calling principal from.
pub const PRINCIPAL_HEADER: &str = "x-principal-id";

/// Decoded push-channel frames. Undecodable messages surface as [`ClientError::Decode`] items
/// without ending the stream.
pub type FrameStream = Pin<Box<dyn Stream<Item = Result<StreamFrame, ClientError>> + Send>>;

pub type SharedApi = Arc<dyn NotificationApi>;

/// The server surfaces the consumer and the reconciler talk to.
#[async_trait]
pub trait NotificationApi: Send + Sync {
    /// Recent notifications plus the authoritative unread count.
    async fn snapshot(&self, limit: usize, unread_only: bool) -> Result<SnapshotResponse, ClientError>;

    /// Opens the push channel. Resolves once the response headers arrived.
    async fn open_stream(&self) -> Result<FrameStream, ClientError>;

    async fn mark_read(&self, request: MarkReadRequest) -> Result<MarkReadResponse, ClientError>;
}

/// [`NotificationApi`] over HTTP.
#[derive(Debug, Clone)]
pub struct HttpApi {
    client: Client,
    base: Url,
    principal_id: Uuid,
}

impl HttpApi {
    /// # Errors
    /// Returns [`ClientError::Http`] when the HTTP client cannot be built.
    pub fn new(base: Url, principal_id: Uuid) -> Result<Self, ClientError> {
        let client = Client::builder().build()?;
        Ok(Self {
            client,
            base,
            principal_id,
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, String> {
        self.base
            .join(path)
            .map_err(|err| format!("invalid endpoint {path}: {err}"))
    }

    fn rejected(status: StatusCode, what: &str) -> String {
        format!("{what} rejected with {status}")
    }
}

#[async_trait]
impl NotificationApi for HttpApi {
    async fn snapshot(&self, limit: usize, unread_only: bool) -> Result<SnapshotResponse, ClientError> {
        let mut url = self.endpoint("api/notifications").map_err(ClientError::Snapshot)?;
        url.query_pairs_mut()
            .append_pair("limit", &limit.to_string())
            .append_pair("unreadOnly", &unread_only.to_string());

        let response = self
            .client
            .get(url)
            .header(PRINCIPAL_HEADER, self.principal_id.to_string())
            .send()
            .await
            .map_err(|err| ClientError::Snapshot(err.to_string()))?;
        if !response.status().is_success() {
            return Err(ClientError::Snapshot(Self::rejected(response.status(), "snapshot")));
        }

        Ok(response.json::<SnapshotResponse>().await?)
    }

    async fn open_stream(&self) -> Result<FrameStream, ClientError> {
        let url = self
            .endpoint("api/notifications/stream")
            .map_err(ClientError::Channel)?;
        debug!(%url, "opening notification stream");

        let response = self
            .client
            .get(url)
            .header(PRINCIPAL_HEADER, self.principal_id.to_string())
            .header(ACCEPT, "text/event-stream")
            .send()
            .await
            .map_err(|err| ClientError::Channel(err.to_string()))?;
        if !response.status().is_success() {
            return Err(ClientError::Channel(Self::rejected(response.status(), "stream")));
        }

        let mut decoder = SseDecoder::new();
        let frames = response.bytes_stream().flat_map(move |chunk| {
            let items: Vec<Result<StreamFrame, ClientError>> = match chunk {
                Ok(bytes) => decoder
                    .feed(&bytes)
                    .iter()
                    .map(|message| message.frame().map_err(ClientError::from))
                    .collect(),
                Err(err) => vec![Err(ClientError::Channel(err.to_string()))],
            };
            stream::iter(items)
        });

        Ok(Box::pin(frames))
    }

    async fn mark_read(&self, request: MarkReadRequest) -> Result<MarkReadResponse, ClientError> {
        let url = self
            .endpoint("api/notifications/mark-read")
            .map_err(ClientError::MarkReadFailed)?;

        let response = self
            .client
            .post(url)
            .header(PRINCIPAL_HEADER, self.principal_id.to_string())
            .json(&request)
            .send()
            .await
            .map_err(|err| ClientError::MarkReadFailed(err.to_string()))?;
        if !response.status().is_success() {
            return Err(ClientError::MarkReadFailed(Self::rejected(
                response.status(),
                "mark-read",
            )));
        }

        response
            .json::<MarkReadResponse>()
            .await
            .map_err(|err| ClientError::MarkReadFailed(err.to_string()))
    }
}
