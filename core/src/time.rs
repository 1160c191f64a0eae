//! Lenient timestamp decoding
//!
//! The backend mixes RFC 3339 strings, naive ISO-8601 strings (no offset)
//! and epoch milliseconds. All of them normalise to UTC here.

use std::fmt;

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

const NAIVE_FORMATS: [&str; 3] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y/%m/%d %H:%M:%S",
];

/// A point in time received from the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(pub DateTime<Utc>);

impl Timestamp {
    /// Current wall-clock time
    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// Inner UTC value
    pub fn as_utc(&self) -> &DateTime<Utc> {
        &self.0
    }

    /// Parse any of the accepted string forms
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
            return Some(Self(parsed.with_timezone(&Utc)));
        }
        NAIVE_FORMATS
            .iter()
            .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
            .map(|naive| Self(Utc.from_utc_datetime(&naive)))
    }

    /// Build from epoch milliseconds
    pub fn from_millis(millis: i64) -> Option<Self> {
        Utc.timestamp_millis_opt(millis).single().map(Self)
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(value: DateTime<Utc>) -> Self {
        Self(value)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.to_rfc3339())
    }
}

impl Serialize for Timestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0.to_rfc3339())
    }
}

impl<'de> Deserialize<'de> for Timestamp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct TimestampVisitor;

        impl<'de> Visitor<'de> for TimestampVisitor {
            type Value = Timestamp;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("an ISO-8601 timestamp or epoch milliseconds")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
                Timestamp::parse(v).ok_or_else(|| E::custom(format!("invalid timestamp: {v}")))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
                Timestamp::from_millis(v).ok_or_else(|| E::custom(format!("timestamp out of range: {v}")))
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
                let millis = i64::try_from(v).map_err(E::custom)?;
                self.visit_i64(millis)
            }

            fn visit_f64<E: de::Error>(self, v: f64) -> Result<Self::Value, E> {
                self.visit_i64(v as i64)
            }
        }

        deserializer.deserialize_any(TimestampVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    #[test]
    fn test_rfc3339_with_offset() {
        let ts: Timestamp = serde_json::from_str("\"2024-03-01T10:00:00+08:00\"").unwrap();
        assert_eq!(ts.0.hour(), 2);
    }

    #[test]
    fn test_naive_iso_is_utc() {
        let ts: Timestamp = serde_json::from_str("\"2024-03-01T10:15:30.123456\"").unwrap();
        assert_eq!(ts.0.hour(), 10);
        assert_eq!(ts.0.minute(), 15);
    }

    #[test]
    fn test_epoch_millis() {
        let ts: Timestamp = serde_json::from_str("1700000000000").unwrap();
        assert_eq!(ts.0.timestamp(), 1_700_000_000);
    }

    #[test]
    fn test_garbage_rejected() {
        assert!(serde_json::from_str::<Timestamp>("\"yesterday\"").is_err());
    }
}
