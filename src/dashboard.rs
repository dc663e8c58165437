//! Live dashboard state.
//!
//! Reading state and annotation state live in two independent cells. Each
//! cell has a single writer (its snapshot handler) that builds a complete
//! replacement and swaps it in, so readers never observe a half-applied
//! snapshot. Views are composed on demand from whatever both cells hold;
//! the two sides may lag each other.

use crate::config::{Config, ConfigError};
use crate::core::{
    bound_to_window, compose, AnnotationTable, DashboardView, DeviceId, DeviceLatestState,
    HistoryBuffer, HistoryBuilder, Reading, ReadingAggregator,
};
use crate::feed::{FeedError, FeedReceiver, RawAnnotation, RawReading, Subscription};
use crate::stats::{IngestStats, SharedIngestStats};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::watch;

/// Everything derived from one reading snapshot.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReadingState {
    /// When the snapshot was processed; `None` before the first one
    pub processed_at: Option<DateTime<Utc>>,
    pub latest: BTreeMap<DeviceId, DeviceLatestState>,
    pub history: BTreeMap<DeviceId, HistoryBuffer>,
}

/// Everything derived from one annotation snapshot.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnnotationState {
    /// When the snapshot was processed; `None` before the first one
    pub processed_at: Option<DateTime<Utc>>,
    pub table: AnnotationTable,
}

fn compose_view(readings: &ReadingState, annotations: &AnnotationState) -> DashboardView {
    DashboardView {
        records: compose(&readings.latest, &readings.history, &annotations.table),
        readings_processed_at: readings.processed_at,
        annotations_processed_at: annotations.processed_at,
    }
}

/// The two state cells plus the reducers that fill them.
pub struct Dashboard {
    aggregator: ReadingAggregator,
    history: HistoryBuilder,
    history_window: usize,
    feed_capacity: usize,
    readings: watch::Sender<Arc<ReadingState>>,
    annotations: watch::Sender<Arc<AnnotationState>>,
    stats: SharedIngestStats,
}

impl Dashboard {
    /// Create an empty dashboard from validated configuration.
    pub fn new(config: &Config) -> Result<Self, ConfigError> {
        config.validate()?;

        let (readings, _) = watch::channel(Arc::new(ReadingState::default()));
        let (annotations, _) = watch::channel(Arc::new(AnnotationState::default()));

        Ok(Self {
            aggregator: ReadingAggregator::new(config.online_threshold()?),
            history: HistoryBuilder::new(config.timezone()?),
            history_window: config.history_window,
            feed_capacity: config.feed_capacity,
            readings,
            annotations,
            stats: Arc::new(IngestStats::new()),
        })
    }

    /// Snapshot capacity feeds for this dashboard should be created with.
    pub fn feed_capacity(&self) -> usize {
        self.feed_capacity
    }

    /// Apply a reading snapshot, classifying liveness against the current time.
    pub fn apply_readings(&self, snapshot: Vec<RawReading>) {
        self.apply_readings_at(snapshot, Utc::now());
    }

    /// Apply a reading snapshot as processed at `now`.
    ///
    /// Latest state and history are rebuilt from this snapshot alone and
    /// replace the previous reading state as a whole.
    pub fn apply_readings_at(&self, snapshot: Vec<RawReading>, now: DateTime<Utc>) {
        let readings: Vec<Reading> = snapshot
            .into_iter()
            .filter_map(RawReading::validate)
            .collect();
        let readings = bound_to_window(readings, self.history_window);

        let state = ReadingState {
            processed_at: Some(now),
            latest: self.aggregator.aggregate(&readings, now),
            history: self.history.build(&readings),
        };

        tracing::debug!(
            readings = readings.len(),
            devices = state.latest.len(),
            online = state.latest.values().filter(|s| s.online).count(),
            "Applied reading snapshot"
        );

        self.stats.record_reading_snapshot(readings.len() as u64);
        self.readings.send_replace(Arc::new(state));
    }

    /// Apply an annotation snapshot.
    pub fn apply_annotations(&self, snapshot: Vec<RawAnnotation>) {
        self.apply_annotations_at(snapshot, Utc::now());
    }

    /// Apply an annotation snapshot as processed at `now`, replacing the
    /// previous table entirely.
    pub fn apply_annotations_at(&self, snapshot: Vec<RawAnnotation>, now: DateTime<Utc>) {
        let valid = snapshot.into_iter().filter_map(RawAnnotation::validate);
        let table = AnnotationTable::from_snapshot(valid);

        tracing::debug!(devices = table.len(), "Applied annotation snapshot");

        self.stats.record_annotation_snapshot(table.len() as u64);
        self.annotations.send_replace(Arc::new(AnnotationState {
            processed_at: Some(now),
            table,
        }));
    }

    /// Current reading state.
    pub fn reading_state(&self) -> Arc<ReadingState> {
        self.readings.borrow().clone()
    }

    /// Current annotation state.
    pub fn annotation_state(&self) -> Arc<AnnotationState> {
        self.annotations.borrow().clone()
    }

    /// Compose the view from the current state of both cells.
    pub fn view(&self) -> DashboardView {
        let readings = self.reading_state();
        let annotations = self.annotation_state();
        self.stats.record_view_composed();
        compose_view(&readings, &annotations)
    }

    /// Watch for changes on either side.
    pub fn watch(&self) -> ViewWatcher {
        ViewWatcher {
            readings: self.readings.subscribe(),
            annotations: self.annotations.subscribe(),
            stats: self.stats.clone(),
        }
    }

    pub fn stats(&self) -> &SharedIngestStats {
        &self.stats
    }

    /// Apply every snapshot delivered on `feed` until the subscription is released.
    pub fn subscribe_readings(
        self: &Arc<Self>,
        feed: FeedReceiver<RawReading>,
    ) -> Result<Subscription, FeedError> {
        let dashboard = Arc::clone(self);
        Subscription::spawn("readings", feed, move |snapshot| {
            dashboard.apply_readings(snapshot)
        })
    }

    /// Apply every annotation snapshot delivered on `feed` until the
    /// subscription is released.
    pub fn subscribe_annotations(
        self: &Arc<Self>,
        feed: FeedReceiver<RawAnnotation>,
    ) -> Result<Subscription, FeedError> {
        let dashboard = Arc::clone(self);
        Subscription::spawn("annotations", feed, move |snapshot| {
            dashboard.apply_annotations(snapshot)
        })
    }
}

/// Recomposes the view whenever either state cell is swapped.
pub struct ViewWatcher {
    readings: watch::Receiver<Arc<ReadingState>>,
    annotations: watch::Receiver<Arc<AnnotationState>>,
    stats: SharedIngestStats,
}

impl ViewWatcher {
    /// Wait until either side changes and return the new view.
    ///
    /// Returns `None` once the dashboard has been dropped.
    pub async fn changed(&mut self) -> Option<DashboardView> {
        tokio::select! {
            result = self.readings.changed() => result.ok()?,
            result = self.annotations.changed() => result.ok()?,
        }
        Some(self.current())
    }

    /// Compose the view from the latest values, marking both as seen.
    pub fn current(&mut self) -> DashboardView {
        let readings = self.readings.borrow_and_update().clone();
        let annotations = self.annotations.borrow_and_update().clone();
        self.stats.record_view_composed();
        compose_view(&readings, &annotations)
    }
}
