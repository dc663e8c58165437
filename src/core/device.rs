//! Validated device, reading and annotation types.
//!
//! Values of these types only exist for records that passed validation:
//! a reading always has a non-empty device id and a real instant, an
//! annotation always has a non-empty device id.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::borrow::Borrow;
use std::fmt;

/// Stable identifier of a sensor unit.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct DeviceId(String);

impl DeviceId {
    /// Create a device id, rejecting empty identifiers.
    pub fn new(id: impl Into<String>) -> Option<Self> {
        let id = id.into();
        if id.is_empty() {
            None
        } else {
            Some(Self(id))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for DeviceId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// A single environmental reading from one device.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Reading {
    pub device_id: DeviceId,
    /// When the device took the reading
    pub timestamp: DateTime<Utc>,
    /// Temperature in °C
    pub temperature: Option<f64>,
    /// Relative humidity in %
    pub humidity: Option<f64>,
    /// Device-reported status, passed through unchanged
    pub status: Option<String>,
}

/// The AI risk assessment currently attached to a device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Annotation {
    pub device_id: DeviceId,
    /// Risk label, e.g. `HIGH_TEMP_ALERT`. `None` when the producer left it blank.
    pub risk: Option<String>,
    /// Free-form explanation of the label
    pub reason: Option<String>,
}
