//! Record shapes delivered by the reading and annotation feeds.
//!
//! Upstream producers are not trusted to fill every field, so every field is
//! optional on the wire. `validate()` turns a raw record into its domain type
//! or returns `None` for records the dashboard ignores.

use crate::core::device::{Annotation, DeviceId, Reading};
use crate::feed::FeedError;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};

/// Timestamp as written by the upstream store.
///
/// Firestore exports write `{ "seconds": .., "nanoseconds": .. }` (the admin
/// SDK uses `_seconds` / `_nanoseconds`); other producers send RFC 3339 text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FeedTimestamp {
    Parts {
        #[serde(alias = "_seconds")]
        seconds: i64,
        #[serde(default, alias = "_nanoseconds")]
        nanoseconds: u32,
    },
    Text(String),
}

impl FeedTimestamp {
    /// Resolve to an instant, or `None` if the value is out of range or unparsable.
    pub fn to_utc(&self) -> Option<DateTime<Utc>> {
        match self {
            FeedTimestamp::Parts {
                seconds,
                nanoseconds,
            } => {
                if *nanoseconds >= 1_000_000_000 {
                    return None;
                }
                DateTime::from_timestamp(*seconds, *nanoseconds)
            }
            FeedTimestamp::Text(text) => DateTime::parse_from_rfc3339(text)
                .ok()
                .map(|dt| dt.with_timezone(&Utc)),
        }
    }
}

impl From<DateTime<Utc>> for FeedTimestamp {
    fn from(dt: DateTime<Utc>) -> Self {
        FeedTimestamp::Parts {
            seconds: dt.timestamp(),
            nanoseconds: dt.timestamp_subsec_nanos(),
        }
    }
}

/// Decode an optional field, treating a value of the wrong type as absent.
fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| serde_json::from_value(v).ok()))
}

/// A reading record as delivered by the reading feed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawReading {
    #[serde(default)]
    pub device_id: Option<String>,
    #[serde(default)]
    pub timestamp: Option<FeedTimestamp>,
    #[serde(default, deserialize_with = "lenient")]
    pub temperature: Option<f64>,
    #[serde(default, deserialize_with = "lenient")]
    pub humidity: Option<f64>,
    #[serde(default, deserialize_with = "lenient")]
    pub status: Option<String>,
}

impl RawReading {
    /// Convenience constructor for producers that already hold typed values.
    pub fn new(
        device_id: impl Into<String>,
        timestamp: DateTime<Utc>,
        temperature: f64,
        humidity: f64,
    ) -> Self {
        Self {
            device_id: Some(device_id.into()),
            timestamp: Some(timestamp.into()),
            temperature: Some(temperature),
            humidity: Some(humidity),
            status: None,
        }
    }

    /// Validate into a [`Reading`]. Records without a device id or a
    /// well-formed timestamp yield `None`.
    pub fn validate(self) -> Option<Reading> {
        let device_id = DeviceId::new(self.device_id?)?;
        let timestamp = self.timestamp?.to_utc()?;
        Some(Reading {
            device_id,
            timestamp,
            temperature: self.temperature,
            humidity: self.humidity,
            status: self.status,
        })
    }
}

/// An annotation record as delivered by the annotation feed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawAnnotation {
    #[serde(default)]
    pub device_id: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub risk: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub reason: Option<String>,
}

impl RawAnnotation {
    pub fn new(
        device_id: impl Into<String>,
        risk: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            device_id: Some(device_id.into()),
            risk: Some(risk.into()),
            reason: Some(reason.into()),
        }
    }

    /// Validate into an [`Annotation`]. Blank risk or reason text is treated
    /// as absent.
    pub fn validate(self) -> Option<Annotation> {
        let device_id = DeviceId::new(self.device_id?)?;
        Some(Annotation {
            device_id,
            risk: self.risk.filter(|s| !s.is_empty()),
            reason: self.reason.filter(|s| !s.is_empty()),
        })
    }
}

/// Decode a JSON array snapshot.
///
/// Elements are decoded one by one and any element that does not fit `T` is
/// skipped. Optional fields of the wrong type are read as absent rather than
/// failing their element. Only a payload that is not a JSON array at all is an error.
pub fn decode_snapshot<T: DeserializeOwned>(json: &str) -> Result<Vec<T>, FeedError> {
    let values: Vec<serde_json::Value> =
        serde_json::from_str(json).map_err(|e| FeedError::Decode(e.to_string()))?;

    Ok(values
        .into_iter()
        .filter_map(|value| serde_json::from_value(value).ok())
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_firestore_timestamp_parts() {
        let ts: FeedTimestamp =
            serde_json::from_str(r#"{"seconds": 1700000000, "nanoseconds": 500000000}"#).unwrap();
        let dt = ts.to_utc().unwrap();
        assert_eq!(dt.timestamp(), 1_700_000_000);
        assert_eq!(dt.timestamp_subsec_millis(), 500);

        let admin: FeedTimestamp = serde_json::from_str(r#"{"_seconds": 1700000000}"#).unwrap();
        assert_eq!(admin.to_utc().unwrap().timestamp(), 1_700_000_000);
    }

    #[test]
    fn test_rfc3339_timestamp() {
        let ts = FeedTimestamp::Text("2024-05-01T12:00:00+02:00".to_string());
        assert_eq!(
            ts.to_utc().unwrap(),
            Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap()
        );

        assert!(FeedTimestamp::Text("yesterday".to_string()).to_utc().is_none());
    }

    #[test]
    fn test_invalid_nanoseconds_rejected() {
        let ts = FeedTimestamp::Parts {
            seconds: 10,
            nanoseconds: 1_500_000_000,
        };
        assert!(ts.to_utc().is_none());
    }

    #[test]
    fn test_reading_validation() {
        let now = Utc::now();
        assert!(RawReading::new("A", now, 21.0, 40.0).validate().is_some());

        let missing_id = RawReading {
            device_id: None,
            ..RawReading::new("A", now, 21.0, 40.0)
        };
        assert!(missing_id.validate().is_none());

        let empty_id = RawReading::new("", now, 21.0, 40.0);
        assert!(empty_id.validate().is_none());

        let missing_ts = RawReading {
            timestamp: None,
            ..RawReading::new("A", now, 21.0, 40.0)
        };
        assert!(missing_ts.validate().is_none());
    }

    #[test]
    fn test_reading_without_measurements_is_kept() {
        let raw: RawReading =
            serde_json::from_str(r#"{"device_id": "A", "timestamp": "2024-05-01T10:00:00Z"}"#)
                .unwrap();
        let reading = raw.validate().unwrap();
        assert_eq!(reading.temperature, None);
        assert_eq!(reading.humidity, None);
    }

    #[test]
    fn test_annotation_blank_fields_become_absent() {
        let annotation = RawAnnotation::new("A", "", "").validate().unwrap();
        assert_eq!(annotation.risk, None);
        assert_eq!(annotation.reason, None);

        assert!(RawAnnotation::default().validate().is_none());
    }

    #[test]
    fn test_decode_snapshot_skips_bad_elements() {
        let json = r#"[
            {"device_id": "A", "timestamp": {"seconds": 1700000000}, "temperature": 21.5},
            {"device_id": "B", "timestamp": 42},
            "not an object",
            {"device_id": "C", "temperature": "hot"}
        ]"#;
        let records: Vec<RawReading> = decode_snapshot(json).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].device_id.as_deref(), Some("A"));

        // C decodes but has no timestamp.
        assert_eq!(records[1].temperature, None);
        let valid: Vec<_> = records.into_iter().filter_map(RawReading::validate).collect();
        assert_eq!(valid.len(), 1);
    }

    #[test]
    fn test_mistyped_optional_fields_read_as_absent() {
        let json = r#"[
            {"device_id": "A", "timestamp": "2024-05-01T10:00:00Z",
             "temperature": 21.0, "status": 1},
            {"device_id": "B", "timestamp": "2024-05-01T10:00:00Z",
             "temperature": "21.0", "humidity": 40.0}
        ]"#;
        let records: Vec<RawReading> = decode_snapshot(json).unwrap();
        let valid: Vec<Reading> = records.into_iter().filter_map(RawReading::validate).collect();
        assert_eq!(valid.len(), 2);

        assert_eq!(valid[0].status, None);
        assert_eq!(valid[0].temperature, Some(21.0));
        assert_eq!(valid[1].temperature, None);
        assert_eq!(valid[1].humidity, Some(40.0));

        let annotations: Vec<RawAnnotation> =
            decode_snapshot(r#"[{"device_id": "A", "risk": ["HIGH"], "reason": "Rising"}]"#)
                .unwrap();
        let annotation = annotations[0].clone().validate().unwrap();
        assert_eq!(annotation.risk, None);
        assert_eq!(annotation.reason.as_deref(), Some("Rising"));
    }

    #[test]
    fn test_decode_snapshot_requires_array() {
        let result: Result<Vec<RawReading>, _> = decode_snapshot(r#"{"device_id": "A"}"#);
        assert!(matches!(result, Err(FeedError::Decode(_))));

        let empty: Vec<RawAnnotation> = decode_snapshot("[]").unwrap();
        assert!(empty.is_empty());
    }
}
