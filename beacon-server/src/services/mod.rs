//! Notification delivery services: store access, connection registry and per-connection polling.
pub mod memory_store;
pub mod notification_store;
pub mod stream_controller;
pub mod stream_registry;

pub use memory_store::MemoryNotificationStore;
pub use notification_store::{NotificationStore, PgNotificationStore, SharedNotificationStore};
pub use stream_controller::{FrameStream, StreamController};
pub use stream_registry::{ConnectionSession, DeliveryCursor, SharedStreamRegistry, StreamRegistry};
