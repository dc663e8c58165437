//! Ingest statistics.
//!
//! Counts what the dashboard applied and composed. Dropped malformed records
//! are not counted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Counters for one dashboard session.
#[derive(Debug)]
pub struct IngestStats {
    /// Number of reading snapshots applied
    reading_snapshots: AtomicU64,
    /// Number of annotation snapshots applied
    annotation_snapshots: AtomicU64,
    /// Valid readings across all applied snapshots
    readings_accepted: AtomicU64,
    /// Valid annotations across all applied snapshots
    annotations_accepted: AtomicU64,
    /// Number of views composed
    views_composed: AtomicU64,
    /// Session start time
    session_start: DateTime<Utc>,
}

impl IngestStats {
    pub fn new() -> Self {
        Self {
            reading_snapshots: AtomicU64::new(0),
            annotation_snapshots: AtomicU64::new(0),
            readings_accepted: AtomicU64::new(0),
            annotations_accepted: AtomicU64::new(0),
            views_composed: AtomicU64::new(0),
            session_start: Utc::now(),
        }
    }

    /// Record an applied reading snapshot holding `accepted` valid readings.
    pub fn record_reading_snapshot(&self, accepted: u64) {
        self.reading_snapshots.fetch_add(1, Ordering::Relaxed);
        self.readings_accepted.fetch_add(accepted, Ordering::Relaxed);
    }

    /// Record an applied annotation snapshot holding `accepted` valid annotations.
    pub fn record_annotation_snapshot(&self, accepted: u64) {
        self.annotation_snapshots.fetch_add(1, Ordering::Relaxed);
        self.annotations_accepted.fetch_add(accepted, Ordering::Relaxed);
    }

    pub fn record_view_composed(&self) {
        self.views_composed.fetch_add(1, Ordering::Relaxed);
    }

    /// Get the current statistics.
    pub fn snapshot(&self) -> IngestStatsSnapshot {
        IngestStatsSnapshot {
            reading_snapshots: self.reading_snapshots.load(Ordering::Relaxed),
            annotation_snapshots: self.annotation_snapshots.load(Ordering::Relaxed),
            readings_accepted: self.readings_accepted.load(Ordering::Relaxed),
            annotations_accepted: self.annotations_accepted.load(Ordering::Relaxed),
            views_composed: self.views_composed.load(Ordering::Relaxed),
            session_start: self.session_start,
            session_duration_secs: (Utc::now() - self.session_start).num_seconds().max(0) as u64,
        }
    }

    /// Get a summary string for display.
    pub fn summary(&self) -> String {
        let stats = self.snapshot();
        format!(
            "Session Statistics:\n\
             - Reading snapshots applied: {}\n\
             - Annotation snapshots applied: {}\n\
             - Readings accepted: {}\n\
             - Annotations accepted: {}\n\
             - Views composed: {}\n\
             - Session duration: {} seconds",
            stats.reading_snapshots,
            stats.annotation_snapshots,
            stats.readings_accepted,
            stats.annotations_accepted,
            stats.views_composed,
            stats.session_duration_secs
        )
    }
}

impl Default for IngestStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time copy of [`IngestStats`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestStatsSnapshot {
    pub reading_snapshots: u64,
    pub annotation_snapshots: u64,
    pub readings_accepted: u64,
    pub annotations_accepted: u64,
    pub views_composed: u64,
    pub session_start: DateTime<Utc>,
    pub session_duration_secs: u64,
}

/// Thread-safe shared statistics.
pub type SharedIngestStats = Arc<IngestStats>;
