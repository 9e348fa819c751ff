use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// UTC instant serialized as ISO-8601. Ordering follows the wrapped instant, which is what the
/// polling cursor relies on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema)]
pub struct Timestamp(pub DateTime<Utc>);

impl Timestamp {
    #[must_use]
    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// Returns the instant `window` before this one, saturating at the minimum representable time.
    #[must_use]
    pub fn minus(self, window: std::time::Duration) -> Self {
        let window = Duration::from_std(window).unwrap_or(Duration::MAX);
        Self(self.0.checked_sub_signed(window).unwrap_or(DateTime::<Utc>::MIN_UTC))
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(value: DateTime<Utc>) -> Self {
        Self(value)
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.to_rfc3339())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_timestamp_serialization() {
        let dt = Utc.with_ymd_and_hms(2025, 3, 8, 14, 30, 0).unwrap();
        let serialized = serde_json::to_string(&Timestamp(dt)).unwrap();

        assert_eq!(serialized, "\"2025-03-08T14:30:00Z\"");
    }

    #[test]
    fn test_timestamp_deserialization() {
        let deserialized: Timestamp = serde_json::from_str("\"2025-03-08T14:30:00Z\"").unwrap();

        let expected = Utc.with_ymd_and_hms(2025, 3, 8, 14, 30, 0).unwrap();
        assert_eq!(deserialized.0, expected);
    }

    #[test]
    fn test_timestamp_ordering() {
        let earlier = Timestamp(Utc.with_ymd_and_hms(2025, 3, 8, 14, 30, 0).unwrap());
        let later = Timestamp(Utc.with_ymd_and_hms(2025, 3, 8, 14, 30, 1).unwrap());

        assert!(earlier < later);
        assert_eq!(earlier.max(later), later);
    }

    #[test]
    fn minus_subtracts_window() {
        let now = Timestamp(Utc.with_ymd_and_hms(2025, 3, 8, 14, 31, 0).unwrap());
        let back = now.minus(std::time::Duration::from_secs(60));

        assert_eq!(back.0, Utc.with_ymd_and_hms(2025, 3, 8, 14, 30, 0).unwrap());
    }
}
