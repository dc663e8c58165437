//! Snapshot delivery and subscription handles.
//!
//! A [`Subscription`] owns a pump thread that hands every delivered snapshot
//! to its handler. Dropping or unsubscribing stops the pump and joins the
//! thread, so delivery ends on every exit path.

use crate::feed::FeedError;
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender, TrySendError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// How often an idle pump checks whether it has been released.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Create a feed with room for `capacity` undelivered snapshots.
pub fn snapshot_feed<T>(capacity: usize) -> (FeedPublisher<T>, FeedReceiver<T>) {
    let (sender, receiver) = bounded(capacity);
    (FeedPublisher { sender }, FeedReceiver { receiver })
}

/// Producer side of a feed.
#[derive(Debug)]
pub struct FeedPublisher<T> {
    sender: Sender<Vec<T>>,
}

impl<T> Clone for FeedPublisher<T> {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
        }
    }
}

impl<T> FeedPublisher<T> {
    /// Deliver a snapshot, waiting for queue space if the subscriber is behind.
    pub fn publish(&self, snapshot: Vec<T>) -> Result<(), FeedError> {
        self.sender.send(snapshot).map_err(|_| FeedError::Closed)
    }

    /// Deliver a snapshot without waiting.
    pub fn try_publish(&self, snapshot: Vec<T>) -> Result<(), FeedError> {
        self.sender.try_send(snapshot).map_err(|e| match e {
            TrySendError::Full(_) => FeedError::Full,
            TrySendError::Disconnected(_) => FeedError::Closed,
        })
    }
}

/// Consumer side of a feed, turned into a [`Subscription`] to start delivery.
#[derive(Debug)]
pub struct FeedReceiver<T> {
    receiver: Receiver<Vec<T>>,
}

impl<T> FeedReceiver<T> {
    /// Take the next snapshot if one is queued, skipping any it supersedes.
    fn try_latest(&self) -> Option<Vec<T>> {
        self.receiver.try_iter().last()
    }
}

/// A live subscription to one feed.
pub struct Subscription {
    name: String,
    running: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl Subscription {
    /// Start delivering snapshots from `feed` to `handler` on a dedicated thread.
    pub fn spawn<T, F>(
        name: impl Into<String>,
        feed: FeedReceiver<T>,
        mut handler: F,
    ) -> Result<Self, FeedError>
    where
        T: Send + 'static,
        F: FnMut(Vec<T>) + Send + 'static,
    {
        let name = name.into();
        let running = Arc::new(AtomicBool::new(true));

        let flag = running.clone();
        let pump_name = name.clone();
        let handle = thread::Builder::new()
            .name(format!("feed-{name}"))
            .spawn(move || pump(&pump_name, &feed, &flag, &mut handler))
            .map_err(|e| FeedError::Spawn(e.to_string()))?;

        tracing::info!(feed = %name, "Subscribed");

        Ok(Self {
            name,
            running,
            handle: Some(handle),
        })
    }

    /// Whether snapshots are still being delivered.
    pub fn is_active(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Stop delivery and wait for the pump to finish.
    pub fn unsubscribe(mut self) {
        self.release();
    }

    fn release(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                tracing::error!(feed = %self.name, "Snapshot handler panicked");
            }
            tracing::info!(feed = %self.name, "Unsubscribed");
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release();
    }
}

fn pump<T, F>(name: &str, feed: &FeedReceiver<T>, running: &AtomicBool, handler: &mut F)
where
    F: FnMut(Vec<T>),
{
    while running.load(Ordering::SeqCst) {
        match feed.receiver.recv_timeout(POLL_INTERVAL) {
            Ok(snapshot) => {
                // Queued snapshots are superseded by newer ones.
                let latest = feed.try_latest().unwrap_or(snapshot);
                handler(latest);
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => {
                tracing::warn!(feed = %name, "Feed disconnected, stopping delivery");
                break;
            }
        }
    }
    running.store(false, Ordering::SeqCst);
}
