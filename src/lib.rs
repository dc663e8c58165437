//! Envmon Dashboard - live per-device views over environmental sensor feeds.
//!
//! This library folds two independent snapshot feeds into display-ready
//! per-device state:
//!
//! - **Readings**: a bounded window of the most recent temperature/humidity
//!   readings across all devices, reduced to the latest reading per device
//!   (with online/offline classification) and a chart history per device.
//! - **Annotations**: the full set of AI risk assessments, one per device.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     Envmon Dashboard                         │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ┌─────────────┐   ┌─────────────┐   ┌─────────────┐       │
//! │  │ Reading     │──▶│ Aggregator  │──▶│ ReadingState│──┐    │
//! │  │ feed        │   │ + History   │   │   (cell)    │  │    │
//! │  └─────────────┘   └─────────────┘   └─────────────┘  ▼    │
//! │                                                 ┌─────────┐│
//! │                                                 │  View   ││
//! │                                                 │Composer ││
//! │  ┌─────────────┐   ┌─────────────┐   ┌────────┐ └─────────┘│
//! │  │ Annotation  │──▶│ Annotation  │──▶│ cell   │──────▲     │
//! │  │ feed        │   │ Table       │   │        │            │
//! │  └─────────────┘   └─────────────┘   └────────┘            │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use envmon_dashboard::{feed, Config, Dashboard};
//!
//! let dashboard = Arc::new(Dashboard::new(&Config::default()).unwrap());
//!
//! let (publisher, receiver) = feed::snapshot_feed(dashboard.feed_capacity());
//! let subscription = dashboard.subscribe_readings(receiver).unwrap();
//!
//! let reading = feed::RawReading::new("sensor-1", chrono::Utc::now(), 21.5, 40.0);
//! publisher.publish(vec![reading]).unwrap();
//!
//! println!("{}", dashboard.view());
//! subscription.unsubscribe();
//! ```

pub mod config;
pub mod core;
pub mod dashboard;
pub mod feed;
pub mod stats;

// Re-export key types at crate root for convenience
pub use config::{Config, ConfigError};
pub use crate::core::{
    AnnotationTable, DashboardView, DeviceId, DeviceLatestState, DisplayRecord, HistoryBuffer,
    HistoryPoint,
};
pub use dashboard::{AnnotationState, Dashboard, ReadingState, ViewWatcher};
pub use feed::{FeedError, RawAnnotation, RawReading, Subscription};
pub use stats::{IngestStats, IngestStatsSnapshot, SharedIngestStats};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
