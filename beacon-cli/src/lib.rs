#![cfg_attr(not(test), forbid(unsafe_code))]
#![warn(clippy::pedantic)]
#![allow(clippy::multiple_crate_versions)]

//! Client side of the Beacon push channel: SSE decoding, the reconnecting stream consumer, the
//! local notification cache, and optimistic read-state reconciliation.

pub mod api;
pub mod backoff;
pub mod cache;
pub mod consumer;
pub mod error;
pub mod reconciler;
pub mod sse;

#[cfg(test)]
pub(crate) mod testing;

pub use api::{HttpApi, NotificationApi, SharedApi};
pub use backoff::ReconnectPolicy;
pub use cache::{NotificationCache, SharedCache};
pub use consumer::{ConsumerEvent, ConsumerHandle, ConsumerOptions, ConsumerState, StreamConsumer};
pub use error::ClientError;
pub use reconciler::ReadStateReconciler;
