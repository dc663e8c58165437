//! Latest-reading aggregation with liveness classification.
//!
//! Each snapshot is reduced from scratch into one [`DeviceLatestState`] per
//! device. The stored reading is always the one with the greatest timestamp
//! for that device, whatever order the snapshot arrives in.

use crate::core::device::{DeviceId, Reading};
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

/// Maximum reading age for a device to count as online.
pub const DEFAULT_ONLINE_THRESHOLD_SECS: u64 = 30;

/// Most recent reading of a device, classified at processing time.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeviceLatestState {
    pub reading: Reading,
    /// Whether the reading is no older than the online threshold
    pub online: bool,
    /// Whole seconds between the reading and processing time
    pub age_secs: i64,
}

impl DeviceLatestState {
    /// Classify `reading` as seen at `now`.
    pub fn evaluate(reading: Reading, now: DateTime<Utc>, online_threshold: Duration) -> Self {
        let elapsed = now - reading.timestamp;
        Self {
            online: elapsed <= online_threshold,
            age_secs: round_secs(elapsed),
            reading,
        }
    }
}

/// Round a duration to whole seconds, halves towards positive infinity.
fn round_secs(elapsed: Duration) -> i64 {
    let millis = elapsed.num_milliseconds() as f64;
    (millis / 1000.0 + 0.5).floor() as i64
}

/// Reduces reading snapshots to per-device latest state.
#[derive(Debug, Clone)]
pub struct ReadingAggregator {
    online_threshold: Duration,
}

impl ReadingAggregator {
    pub fn new(online_threshold: Duration) -> Self {
        Self { online_threshold }
    }

    /// Build the latest-state map for one snapshot of validated readings.
    ///
    /// A candidate replaces the stored reading only when its timestamp is
    /// strictly newer, so on ties the first one seen is kept.
    pub fn aggregate(
        &self,
        readings: &[Reading],
        now: DateTime<Utc>,
    ) -> BTreeMap<DeviceId, DeviceLatestState> {
        let mut newest: BTreeMap<DeviceId, &Reading> = BTreeMap::new();

        for reading in readings {
            match newest.entry(reading.device_id.clone()) {
                Entry::Vacant(slot) => {
                    slot.insert(reading);
                }
                Entry::Occupied(mut slot) => {
                    if reading.timestamp > slot.get().timestamp {
                        slot.insert(reading);
                    }
                }
            }
        }

        newest
            .into_iter()
            .map(|(id, reading)| {
                let state =
                    DeviceLatestState::evaluate(reading.clone(), now, self.online_threshold);
                (id, state)
            })
            .collect()
    }
}

impl Default for ReadingAggregator {
    fn default() -> Self {
        Self::new(Duration::seconds(DEFAULT_ONLINE_THRESHOLD_SECS as i64))
    }
}

/// Cap a snapshot at the `window` most recent readings.
///
/// Snapshots within the window are returned untouched. Oversized ones are
/// stably sorted newest first and truncated.
pub fn bound_to_window(mut readings: Vec<Reading>, window: usize) -> Vec<Reading> {
    if readings.len() > window {
        readings.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        readings.truncate(window);
    }
    readings
}
