use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::timestamp::Timestamp;

/// Closed set of events that produce a notification.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum NotificationType {
    QuoteSubmitted,
    QuoteApproved,
    QuoteRejected,
    InvoiceSubmitted,
    InvoicePaid,
    CampaignAssigned,
    BrandAssigned,
    ContentSubmitted,
    ContentReviewed,
    PaymentProcessed,
    System,
}

impl NotificationType {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::QuoteSubmitted => "quote_submitted",
            Self::QuoteApproved => "quote_approved",
            Self::QuoteRejected => "quote_rejected",
            Self::InvoiceSubmitted => "invoice_submitted",
            Self::InvoicePaid => "invoice_paid",
            Self::CampaignAssigned => "campaign_assigned",
            Self::BrandAssigned => "brand_assigned",
            Self::ContentSubmitted => "content_submitted",
            Self::ContentReviewed => "content_reviewed",
            Self::PaymentProcessed => "payment_processed",
            Self::System => "system",
        }
    }
}

impl TryFrom<&str> for NotificationType {
    type Error = &'static str;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "quote_submitted" => Ok(Self::QuoteSubmitted),
            "quote_approved" => Ok(Self::QuoteApproved),
            "quote_rejected" => Ok(Self::QuoteRejected),
            "invoice_submitted" => Ok(Self::InvoiceSubmitted),
            "invoice_paid" => Ok(Self::InvoicePaid),
            "campaign_assigned" => Ok(Self::CampaignAssigned),
            "brand_assigned" => Ok(Self::BrandAssigned),
            "content_submitted" => Ok(Self::ContentSubmitted),
            "content_reviewed" => Ok(Self::ContentReviewed),
            "payment_processed" => Ok(Self::PaymentProcessed),
            "system" => Ok(Self::System),
            _ => Err("invalid notification type"),
        }
    }
}

/// Kind of business entity a notification points back to. Lookup only: deleting the entity does
/// not touch the notification.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum RelatedEntityType {
    Quote,
    Invoice,
    Campaign,
    Brand,
    Content,
    Payment,
}

impl RelatedEntityType {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Quote => "quote",
            Self::Invoice => "invoice",
            Self::Campaign => "campaign",
            Self::Brand => "brand",
            Self::Content => "content",
            Self::Payment => "payment",
        }
    }
}

impl TryFrom<&str> for RelatedEntityType {
    type Error = &'static str;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "quote" => Ok(Self::Quote),
            "invoice" => Ok(Self::Invoice),
            "campaign" => Ok(Self::Campaign),
            "brand" => Ok(Self::Brand),
            "content" => Ok(Self::Content),
            "payment" => Ok(Self::Payment),
            _ => Err("invalid related entity type"),
        }
    }
}

/// A durable notification row as seen by the push channel and REST surfaces.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: Uuid,
    pub recipient_id: Uuid,
    #[serde(rename = "type")]
    pub notification_type: NotificationType,
    pub title: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub related_type: Option<RelatedEntityType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub related_id: Option<Uuid>,
    pub is_read: bool,
    /// Ordering key and polling cursor value.
    pub created_at: Timestamp,
}

/// Body producers send to create a notification.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateNotificationRequest {
    pub recipient_id: Uuid,
    #[serde(rename = "type")]
    pub notification_type: NotificationType,
    pub title: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub related_type: Option<RelatedEntityType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub related_id: Option<Uuid>,
}

impl CreateNotificationRequest {
    /// Checks the display strings are present.
    ///
    /// # Errors
    /// Returns a message naming the first empty field.
    pub fn validate(&self) -> Result<(), String> {
        if self.title.trim().is_empty() {
            return Err("title must not be empty".to_string());
        }
        if self.message.trim().is_empty() {
            return Err("message must not be empty".to_string());
        }
        if self.related_id.is_some() && self.related_type.is_none() {
            return Err("relatedId requires relatedType".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
pub struct CreateNotificationResponse {
    pub success: bool,
    pub data: Notification,
}

/// Snapshot returned to a consumer before it starts reading frames.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotResponse {
    pub success: bool,
    pub data: Vec<Notification>,
    pub unread_count: u64,
}

/// Write-back body: either an explicit id set or a mark-all sweep.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MarkReadRequest {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub notification_ids: Vec<Uuid>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub mark_all_as_read: bool,
}

/// Interpreted form of [`MarkReadRequest`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarkReadAction {
    Ids(Vec<Uuid>),
    All,
}

impl MarkReadRequest {
    #[must_use]
    pub fn ids(ids: Vec<Uuid>) -> Self {
        Self {
            notification_ids: ids,
            mark_all_as_read: false,
        }
    }

    #[must_use]
    pub fn all() -> Self {
        Self {
            notification_ids: Vec::new(),
            mark_all_as_read: true,
        }
    }

    /// Resolves the request into a single action. `markAllAsRead` wins when both are present.
    ///
    /// # Errors
    /// Returns an error when neither ids nor the mark-all flag are supplied.
    pub fn action(self) -> Result<MarkReadAction, &'static str> {
        if self.mark_all_as_read {
            Ok(MarkReadAction::All)
        } else if self.notification_ids.is_empty() {
            Err("either notificationIds or markAllAsRead is required")
        } else {
            Ok(MarkReadAction::Ids(self.notification_ids))
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
pub struct MarkReadResponse {
    pub success: bool,
    /// Rows whose read flag actually flipped.
    #[serde(default)]
    pub updated: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use serde_json::{Value, json};

    fn sample() -> Notification {
        Notification {
            id: Uuid::nil(),
            recipient_id: Uuid::nil(),
            notification_type: NotificationType::QuoteSubmitted,
            title: "New quote".into(),
            message: "Creator submitted a quote".into(),
            related_type: Some(RelatedEntityType::Quote),
            related_id: Some(Uuid::nil()),
            is_read: false,
            created_at: Timestamp(Utc.with_ymd_and_hms(2025, 1, 2, 3, 4, 5).unwrap()),
        }
    }

    #[test]
    fn notification_uses_camel_case_wire_names() {
        let value = serde_json::to_value(sample()).unwrap();

        assert_eq!(value["type"], "quote_submitted");
        assert_eq!(value["recipientId"], Uuid::nil().to_string());
        assert_eq!(value["relatedType"], "quote");
        assert_eq!(value["isRead"], false);
        assert_eq!(value["createdAt"], "2025-01-02T03:04:05Z");
    }

    #[test]
    fn notification_omits_missing_related_entity() {
        let mut notification = sample();
        notification.related_type = None;
        notification.related_id = None;

        let value = serde_json::to_value(notification).unwrap();
        assert!(value.get("relatedType").is_none());
        assert!(value.get("relatedId").is_none());
    }

    #[test]
    fn notification_type_strings_match_serde() {
        for kind in [
            NotificationType::QuoteSubmitted,
            NotificationType::InvoiceSubmitted,
            NotificationType::CampaignAssigned,
            NotificationType::BrandAssigned,
            NotificationType::System,
        ] {
            let serialized = serde_json::to_value(kind).unwrap();
            assert_eq!(serialized, Value::from(kind.as_str()));
            assert_eq!(NotificationType::try_from(kind.as_str()), Ok(kind));
        }
        assert!(NotificationType::try_from("unknown").is_err());
    }

    #[test]
    fn mark_read_request_parses_ids() {
        let id = Uuid::new_v4();
        let request: MarkReadRequest =
            serde_json::from_value(json!({ "notificationIds": [id] })).unwrap();

        assert_eq!(request.action(), Ok(MarkReadAction::Ids(vec![id])));
    }

    #[test]
    fn mark_read_request_parses_mark_all() {
        let request: MarkReadRequest =
            serde_json::from_value(json!({ "markAllAsRead": true })).unwrap();

        assert_eq!(request.action(), Ok(MarkReadAction::All));
    }

    #[test]
    fn mark_read_request_requires_a_target() {
        let request: MarkReadRequest = serde_json::from_value(json!({})).unwrap();
        assert!(request.action().is_err());
    }

    #[test]
    fn create_request_validation() {
        let mut request = CreateNotificationRequest {
            recipient_id: Uuid::new_v4(),
            notification_type: NotificationType::InvoiceSubmitted,
            title: "Invoice".into(),
            message: "An invoice was submitted".into(),
            related_type: None,
            related_id: None,
        };
        assert!(request.validate().is_ok());

        request.title = "  ".into();
        assert_eq!(request.validate().unwrap_err(), "title must not be empty");

        request.title = "Invoice".into();
        request.related_id = Some(Uuid::new_v4());
        assert!(request.validate().is_err());
    }

    #[test]
    fn snapshot_response_wire_shape() {
        let response = SnapshotResponse {
            success: true,
            data: vec![sample()],
            unread_count: 1,
        };
        let value = serde_json::to_value(response).unwrap();

        assert_eq!(value["success"], true);
        assert_eq!(value["unreadCount"], 1);
        assert_eq!(value["data"].as_array().map(Vec::len), Some(1));
    }
}
