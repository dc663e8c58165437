//! Core aggregation for the environmental dashboard.
//!
//! This module contains:
//! - Device identity and validated record types
//! - Latest-reading aggregation with online/offline classification
//! - Per-device chart history
//! - The annotation table
//! - Display record composition

pub mod annotations;
pub mod device;
pub mod history;
pub mod readings;
pub mod view;

// Re-export commonly used types
pub use annotations::AnnotationTable;
pub use device::{Annotation, DeviceId, Reading};
pub use history::{HistoryBuffer, HistoryBuilder, HistoryPoint, MIN_CHART_POINTS};
pub use readings::{
    bound_to_window, DeviceLatestState, ReadingAggregator, DEFAULT_ONLINE_THRESHOLD_SECS,
};
pub use view::{
    compose, is_high_risk, DashboardView, DisplayRecord, AWAITING_ANALYSIS, HIGH_RISK_MARKERS,
    PENDING_RISK,
};
