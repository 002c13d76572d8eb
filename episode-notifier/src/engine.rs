//! Polling loop: fetch, extract, advance the watchlist, fan out to
//! subscribers, persist.
//!
//! The engine alternates between two states. While *scanning* a cycle runs to
//! completion, persist included, regardless of shutdown requests. While
//! *idle* it sleeps for the poll interval and returns as soon as the
//! cancellation token fires.

use crate::extractor::extract_episode;
use crate::subscribers::SubscriberRegistry;
use crate::traits::{FeedSource, NotificationSink};
use crate::types::{Episode, Result};
use crate::watchlist::WatchlistStore;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone)]
pub struct EngineOptions {
    pub poll_interval: Duration,
    /// When false the watchlist is never written (dry run).
    pub persist: bool,
}

/// What one cycle did.
#[derive(Debug, Clone, Default)]
pub struct CycleReport {
    pub entries: usize,
    pub extracted: usize,
    pub new_episodes: Vec<Episode>,
    pub notified: Vec<String>,
    pub failed_notifications: usize,
    pub persisted: bool,
}

/// Episodes that advanced during one cycle, one per show, in the order their
/// show was first encountered in the feed.
#[derive(Debug, Default)]
struct NewEpisodes {
    episodes: Vec<Episode>,
    positions: HashMap<String, usize>,
}

impl NewEpisodes {
    fn insert(&mut self, episode: Episode) {
        match self.positions.get(episode.identity_key()) {
            Some(&index) => self.episodes[index] = episode,
            None => {
                self.positions
                    .insert(episode.identity_key().to_string(), self.episodes.len());
                self.episodes.push(episode);
            }
        }
    }

    fn is_empty(&self) -> bool {
        self.episodes.is_empty()
    }

    fn matching<'a>(&'a self, wanted: impl Fn(&str) -> bool + 'a) -> impl Iterator<Item = &'a Episode> + 'a {
        self.episodes.iter().filter(move |e| wanted(e.identity_key()))
    }

    fn into_vec(self) -> Vec<Episode> {
        self.episodes
    }
}

pub struct Engine {
    source: Box<dyn FeedSource>,
    sink: Box<dyn NotificationSink>,
    store: WatchlistStore,
    subscribers: Arc<SubscriberRegistry>,
    options: EngineOptions,
    // A previous persist failed; retry on the next cycle even without changes.
    dirty: bool,
    cycles: u64,
}

impl Engine {
    pub fn new(
        source: Box<dyn FeedSource>,
        sink: Box<dyn NotificationSink>,
        store: WatchlistStore,
        subscribers: Arc<SubscriberRegistry>,
        options: EngineOptions,
    ) -> Self {
        Self {
            source,
            sink,
            store,
            subscribers,
            options,
            dirty: false,
            cycles: 0,
        }
    }

    pub fn store(&self) -> &WatchlistStore {
        &self.store
    }

    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    /// Runs cycles until `shutdown` is cancelled.
    ///
    /// The token is only looked at between cycles, so a cycle in progress
    /// always finishes and persists first.
    pub async fn run(&mut self, shutdown: CancellationToken) -> Result<()> {
        info!(
            "Scanner started on {} (every {:?})",
            self.source.source_name(),
            self.options.poll_interval
        );

        while !shutdown.is_cancelled() {
            self.run_cycle().await?;

            if shutdown.is_cancelled() {
                break;
            }

            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = tokio::time::sleep(self.options.poll_interval) => {}
            }
        }

        info!("Scanner stopped after {} cycles", self.cycles);
        Ok(())
    }

    pub async fn run_cycle(&mut self) -> Result<CycleReport> {
        self.cycles += 1;
        let mut report = CycleReport::default();

        let entries = match self.source.fetch_entries().await {
            Ok(entries) => entries,
            Err(e) => {
                warn!("Fetching {} failed, treating as empty batch: {}", self.source.source_name(), e);
                Vec::new()
            }
        };
        report.entries = entries.len();

        let mut new_episodes = NewEpisodes::default();
        for raw_title in &entries {
            let Some(candidate) = extract_episode(raw_title) else {
                debug!("Skipping unrecognized entry: {}", raw_title);
                continue;
            };
            report.extracted += 1;

            if self.store.advance_if_newer(&candidate)? {
                debug!("New episode {}", candidate);
                new_episodes.insert(candidate);
            }
        }

        if !new_episodes.is_empty() {
            self.dispatch(&new_episodes, &mut report).await;
        }

        if !new_episodes.is_empty() || self.dirty {
            report.persisted = self.save();
        }

        report.new_episodes = new_episodes.into_vec();
        debug!(
            cycle = self.cycles,
            entries = report.entries,
            extracted = report.extracted,
            new = report.new_episodes.len(),
            "Cycle finished"
        );
        Ok(report)
    }

    async fn dispatch(&self, new_episodes: &NewEpisodes, report: &mut CycleReport) {
        for (subscriber, wishlist) in self.subscribers.iter() {
            let matched: Vec<Episode> = new_episodes
                .matching(|title| wishlist.contains(title))
                .cloned()
                .collect();
            if matched.is_empty() {
                continue;
            }

            info!("Notifying {}: {}", subscriber, format_episodes(&matched));
            match self.sink.notify(subscriber, &matched).await {
                Ok(()) => report.notified.push(subscriber.to_string()),
                Err(e) => {
                    error!("Failed to notify {} via {}: {}", subscriber, self.sink.sink_name(), e);
                    report.failed_notifications += 1;
                }
            }
        }
    }

    fn save(&mut self) -> bool {
        if !self.options.persist {
            debug!("Dry run, not saving watchlist");
            return false;
        }

        match self.store.persist() {
            Ok(()) => {
                self.dirty = false;
                true
            }
            Err(e) => {
                error!("Failed to save watchlist, retrying next cycle: {}", e);
                self.dirty = true;
                false
            }
        }
    }
}

/// Builds the startup watchlist: seed from wishlists, merge what is on disk
/// and write it back only when that changed the persisted content.
pub fn bootstrap_watchlist(path: &Path, subscribers: &SubscriberRegistry, write_back: bool) -> Result<WatchlistStore> {
    let mut store = WatchlistStore::new(path);
    store.seed(subscribers.wishlists());

    let persisted = store.load()?;
    let report = store.reconcile(persisted.iter().cloned());
    debug!(
        adopted = report.adopted,
        dropped = report.dropped.len(),
        "Reconciled watchlist with {}",
        path.display()
    );

    if store.differs_from(&persisted) {
        if write_back {
            store.persist()?;
            info!("Rewrote watchlist {}", path.display());
        } else {
            debug!("Dry run, not rewriting watchlist");
        }
    }

    Ok(store)
}

pub fn format_episodes(episodes: &[Episode]) -> String {
    episodes
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
