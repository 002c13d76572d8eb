use crate::types::{Episode, Result};
use async_trait::async_trait;

/// Source of raw feed-entry titles, polled once per cycle.
#[async_trait]
pub trait FeedSource: Send + Sync {
    /// Human-readable name for logs
    fn source_name(&self) -> String;

    /// Fetch the current batch of entry titles, in feed order.
    async fn fetch_entries(&mut self) -> Result<Vec<String>>;
}

/// Delivers a "just released" digest to one subscriber.
///
/// Single attempt: the engine logs a failure and moves on, it never retries.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    fn sink_name(&self) -> String;

    async fn notify(&self, subscriber: &str, episodes: &[Episode]) -> Result<()>;
}
