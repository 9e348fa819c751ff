pub mod errors;
pub mod notification;
pub mod stream;
pub mod timestamp;

pub use errors::{StoreError, StoreResult};
pub use notification::{
    CreateNotificationRequest, CreateNotificationResponse, MarkReadAction, MarkReadRequest,
    MarkReadResponse, Notification, NotificationType, RelatedEntityType, SnapshotResponse,
};
pub use stream::{FrameKind, StreamFrame};
pub use timestamp::Timestamp;
