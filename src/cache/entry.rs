//! The unit of storage: a response body snapshot plus its creation time.

use std::time::Duration;

use bytes::Bytes;
use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

/// A cached response body and the instant it was written.
///
/// Entries are immutable: a new write replaces the entry for its key wholesale.
/// The timestamp is stamped by the store at write time, never by the caller.
///
/// Networked stores persist entries as JSON records of the form
/// `{"data": "<base64 payload>", "created_on": "<RFC 3339 timestamp>"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedEntry {
    #[serde(rename = "data", with = "payload_base64")]
    payload: Bytes,
    #[serde(rename = "created_on")]
    created_at: DateTime<Utc>,
}

impl CachedEntry {
    /// Wraps `payload`, stamping the current time.
    pub fn new(payload: Bytes) -> Self {
        Self {
            payload,
            created_at: Utc::now(),
        }
    }

    #[cfg(test)]
    pub(crate) fn stamped(payload: Bytes, created_at: DateTime<Utc>) -> Self {
        Self {
            payload,
            created_at,
        }
    }

    pub fn payload(&self) -> &Bytes {
        &self.payload
    }

    pub fn into_payload(self) -> Bytes {
        self.payload
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// End of the freshness window, or `None` when `ttl` reaches past the
    /// representable range (the entry never goes stale).
    pub fn expires_at(&self, ttl: Duration) -> Option<DateTime<Utc>> {
        TimeDelta::from_std(ttl)
            .ok()
            .and_then(|ttl| self.created_at.checked_add_signed(ttl))
    }

    /// Returns `true` while `now < created_at + ttl`.
    pub fn is_fresh(&self, ttl: Duration) -> bool {
        self.is_fresh_at(Utc::now(), ttl)
    }

    /// [`is_fresh`](Self::is_fresh) evaluated at an explicit instant.
    pub fn is_fresh_at(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        self.expires_at(ttl).is_none_or(|expires_at| now < expires_at)
    }
}

mod payload_base64 {
    use base64::{Engine as _, engine::general_purpose::STANDARD};
    use bytes::Bytes;
    use serde::{Deserialize, Deserializer, Serializer, de};

    pub fn serialize<S>(payload: &Bytes, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&STANDARD.encode(payload))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Bytes, D::Error>
    where
        D: Deserializer<'de>,
    {
        let encoded = String::deserialize(deserializer)?;
        STANDARD
            .decode(encoded.as_bytes())
            .map(Bytes::from)
            .map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn freshness_window_is_half_open() {
        let created = Utc::now();
        let entry = CachedEntry::stamped(Bytes::from_static(b"{}"), created);
        let ttl = Duration::from_secs(60);

        assert!(entry.is_fresh_at(created, ttl));
        assert!(entry.is_fresh_at(created + TimeDelta::seconds(59), ttl));
        assert!(!entry.is_fresh_at(created + TimeDelta::seconds(60), ttl));
        assert!(!entry.is_fresh_at(created + TimeDelta::seconds(61), ttl));
    }

    #[test]
    fn zero_ttl_is_never_fresh() {
        let entry = CachedEntry::new(Bytes::from_static(b"x"));
        assert!(!entry.is_fresh(Duration::ZERO));
    }

    #[test]
    fn unrepresentable_ttl_never_goes_stale() {
        let entry = CachedEntry::new(Bytes::from_static(b"x"));
        assert_eq!(entry.expires_at(Duration::MAX), None);
        assert!(entry.is_fresh(Duration::MAX));
    }

    #[test]
    fn record_uses_data_and_created_on_fields() {
        let created = DateTime::parse_from_rfc3339("2024-05-01T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let entry = CachedEntry::stamped(Bytes::from_static(br#"{"name":"test"}"#), created);

        let record: serde_json::Value = serde_json::to_value(&entry).unwrap();
        assert_eq!(record["data"], "eyJuYW1lIjoidGVzdCJ9");
        assert_eq!(record["created_on"], "2024-05-01T12:00:00Z");

        let decoded: CachedEntry = serde_json::from_value(record).unwrap();
        assert_eq!(decoded, entry);
    }

    #[test]
    fn malformed_payload_is_rejected() {
        let record = r#"{"data":"not base64!","created_on":"2024-05-01T12:00:00Z"}"#;
        assert!(serde_json::from_str::<CachedEntry>(record).is_err());
    }
}
