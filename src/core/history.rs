//! Per-device chart history.
//!
//! History is rebuilt from each reading snapshot; it never accumulates across
//! snapshots, so its depth is bounded by the snapshot window.

use crate::core::device::{DeviceId, Reading};
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::Serialize;
use std::collections::BTreeMap;

/// Fewest points worth drawing a line for.
pub const MIN_CHART_POINTS: usize = 2;

/// One chart sample.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryPoint {
    pub timestamp: DateTime<Utc>,
    /// Wall-clock label, `HH:MM:SS` in the display timezone
    pub display_time: String,
    pub temperature: Option<f64>,
    pub humidity: Option<f64>,
}

/// Chronologically ascending samples of one device.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct HistoryBuffer {
    points: Vec<HistoryPoint>,
}

impl HistoryBuffer {
    pub fn points(&self) -> &[HistoryPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Whether there are enough points to draw a chart.
    pub fn is_chartable(&self) -> bool {
        self.points.len() >= MIN_CHART_POINTS
    }

    pub fn temperatures(&self) -> impl Iterator<Item = Option<f64>> + '_ {
        self.points.iter().map(|p| p.temperature)
    }
}

/// Builds history buffers from reading snapshots.
#[derive(Debug, Clone)]
pub struct HistoryBuilder {
    timezone: Tz,
}

impl HistoryBuilder {
    pub fn new(timezone: Tz) -> Self {
        Self { timezone }
    }

    /// Group every reading of the snapshot by device, oldest first.
    ///
    /// Points are collected in input order and reversed, which already gives
    /// ascending order for a newest-first feed. The stable sort afterwards
    /// makes the result ascending for any input order.
    pub fn build(&self, readings: &[Reading]) -> BTreeMap<DeviceId, HistoryBuffer> {
        let mut history: BTreeMap<DeviceId, HistoryBuffer> = BTreeMap::new();

        for reading in readings {
            history
                .entry(reading.device_id.clone())
                .or_default()
                .points
                .push(self.point(reading));
        }

        for buffer in history.values_mut() {
            buffer.points.reverse();
            buffer.points.sort_by_key(|p| p.timestamp);
        }

        history
    }

    fn point(&self, reading: &Reading) -> HistoryPoint {
        HistoryPoint {
            timestamp: reading.timestamp,
            display_time: reading
                .timestamp
                .with_timezone(&self.timezone)
                .format("%H:%M:%S")
                .to_string(),
            temperature: reading.temperature,
            humidity: reading.humidity,
        }
    }
}

impl Default for HistoryBuilder {
    fn default() -> Self {
        Self::new(Tz::UTC)
    }
}
