//! Snapshot feeds for the environmental dashboard.
//!
//! A feed delivers whole snapshots: the reading feed a bounded window of the
//! most recent readings, the annotation feed the full annotation set. Each
//! delivery supersedes the previous one from the same feed.

pub mod subscription;
pub mod types;

// Re-export commonly used types
pub use subscription::{snapshot_feed, FeedPublisher, FeedReceiver, Subscription};
pub use types::{decode_snapshot, FeedTimestamp, RawAnnotation, RawReading};

/// Errors that can occur while delivering or decoding snapshots.
#[derive(Debug)]
pub enum FeedError {
    /// Every receiver of the feed is gone
    Closed,
    /// The feed queue is full and the snapshot was not queued
    Full,
    /// A snapshot payload was not a JSON array
    Decode(String),
    /// The subscription thread could not be started
    Spawn(String),
}

impl std::fmt::Display for FeedError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FeedError::Closed => write!(f, "Feed is closed"),
            FeedError::Full => write!(f, "Feed queue is full"),
            FeedError::Decode(e) => write!(f, "Decode error: {e}"),
            FeedError::Spawn(e) => write!(f, "Could not start subscription: {e}"),
        }
    }
}

impl std::error::Error for FeedError {}
