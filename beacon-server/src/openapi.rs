#![allow(clippy::needless_for_each)] // Derive macro emits a for_each internally

use shared::models::{
    CreateNotificationRequest, CreateNotificationResponse, MarkReadRequest, MarkReadResponse,
    Notification, NotificationType, RelatedEntityType, SnapshotResponse, StreamFrame, Timestamp,
};
use std::{path::Path, sync::OnceLock};

use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Beacon API",
        version = "1.0.0",
        description = "Real-time notification delivery: snapshot, read-state write-back and the SSE push channel"
    ),
    paths(
        crate::handlers::notifications::list_notifications,
        crate::handlers::notifications::create_notification,
        crate::handlers::notifications::mark_read,
        crate::handlers::streaming::stream_notifications,
    ),
    components(
        schemas(
            Notification,
            NotificationType,
            RelatedEntityType,
            Timestamp,
            SnapshotResponse,
            CreateNotificationRequest,
            CreateNotificationResponse,
            MarkReadRequest,
            MarkReadResponse,
            StreamFrame,
        )
    ),
    tags(
        (name = "Notifications", description = "Notification snapshot, write-back and push channel")
    )
)]
pub struct ApiDoc;

/// The generated document, built on first use.
pub fn document() -> &'static utoipa::openapi::OpenApi {
    static DOCUMENT: OnceLock<utoipa::openapi::OpenApi> = OnceLock::new();
    DOCUMENT.get_or_init(ApiDoc::openapi)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DocFormat {
    Json,
    Yaml,
}

impl DocFormat {
    /// `.json` files get JSON; anything else gets YAML.
    pub fn for_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => Self::Json,
            _ => Self::Yaml,
        }
    }

    pub const fn content_type(self) -> &'static str {
        match self {
            Self::Json => "application/json",
            Self::Yaml => "application/yaml",
        }
    }

    /// Renders [`document`] in this format.
    ///
    /// # Errors
    /// Returns an error if the serializer rejects the document.
    pub fn render(self) -> anyhow::Result<String> {
        Ok(match self {
            Self::Json => document().to_pretty_json()?,
            Self::Yaml => document().to_yaml()?,
        })
    }
}
