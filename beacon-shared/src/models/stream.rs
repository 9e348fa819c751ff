use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::{notification::Notification, timestamp::Timestamp};

/// One message on the push channel. Serialized as a JSON object tagged by `type`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamFrame {
    /// First frame of every connection.
    Connected { timestamp: Timestamp },
    /// Rows the connection has not delivered yet, newest first, with the authoritative count.
    Notification {
        notifications: Vec<Notification>,
        #[serde(rename = "unreadCount")]
        unread_count: u64,
        timestamp: Timestamp,
    },
    /// Emitted on ticks with nothing new; carries the count so a dead channel is detectable.
    Heartbeat {
        #[serde(rename = "unreadCount")]
        unread_count: u64,
        timestamp: Timestamp,
    },
}

/// Frame discriminant, used for SSE `event:` names and metric labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameKind {
    Connected,
    Notification,
    Heartbeat,
}

impl FrameKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Connected => "connected",
            Self::Notification => "notification",
            Self::Heartbeat => "heartbeat",
        }
    }
}

impl StreamFrame {
    #[must_use]
    pub fn connected() -> Self {
        Self::Connected {
            timestamp: Timestamp::now(),
        }
    }

    #[must_use]
    pub fn notification(notifications: Vec<Notification>, unread_count: u64) -> Self {
        Self::Notification {
            notifications,
            unread_count,
            timestamp: Timestamp::now(),
        }
    }

    #[must_use]
    pub fn heartbeat(unread_count: u64) -> Self {
        Self::Heartbeat {
            unread_count,
            timestamp: Timestamp::now(),
        }
    }

    #[must_use]
    pub const fn kind(&self) -> FrameKind {
        match self {
            Self::Connected { .. } => FrameKind::Connected,
            Self::Notification { .. } => FrameKind::Notification,
            Self::Heartbeat { .. } => FrameKind::Heartbeat,
        }
    }

    /// Server-confirmed unread count, absent only on the `connected` frame.
    #[must_use]
    pub const fn unread_count(&self) -> Option<u64> {
        match self {
            Self::Connected { .. } => None,
            Self::Notification { unread_count, .. } | Self::Heartbeat { unread_count, .. } => {
                Some(*unread_count)
            }
        }
    }
}
