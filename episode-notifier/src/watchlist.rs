//! The watchlist: latest released episode per tracked show.
//!
//! Lifecycle: [`WatchlistStore::seed`] from the subscribers' wishlists,
//! [`WatchlistStore::reconcile`] against what [`WatchlistStore::load`] read
//! from disk, then [`WatchlistStore::advance_if_newer`] and
//! [`WatchlistStore::persist`] once per polling cycle.

use crate::types::{Episode, IncomparableError, NotifierError, Result, WatchRecord, Wishlist};
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Outcome of merging persisted memory into the seeded store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub adopted: usize,
    /// Titles found on disk that no subscriber follows anymore.
    pub dropped: Vec<String>,
}

pub struct WatchlistStore {
    path: PathBuf,
    // One entry per show: keyed by `Episode::identity_key`.
    entries: BTreeMap<String, Episode>,
}

impl WatchlistStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            entries: BTreeMap::new(),
        }
    }

    /// Adds a placeholder for every wished show not tracked yet.
    pub fn seed<'a, I>(&mut self, wishlists: I)
    where
        I: IntoIterator<Item = &'a Wishlist>,
    {
        for wishlist in wishlists {
            for wish in wishlist.episodes() {
                self.entries
                    .entry(wish.identity_key().to_string())
                    .or_insert_with(|| wish.clone());
            }
        }
    }

    /// Adopts persisted positions for tracked shows and drops the rest.
    pub fn reconcile<I>(&mut self, persisted: I) -> ReconcileReport
    where
        I: IntoIterator<Item = WatchRecord>,
    {
        let mut report = ReconcileReport::default();

        for record in persisted {
            let remembered = Episode::from(record);
            match self.entries.get_mut(remembered.identity_key()) {
                Some(entry) => {
                    *entry = remembered;
                    report.adopted += 1;
                }
                None => {
                    warn!("Removing show from watchlist: {}", remembered);
                    report.dropped.push(remembered.identity_key().to_string());
                }
            }
        }

        report
    }

    /// Replaces the stored episode of `candidate`'s show when `candidate` is
    /// strictly newer. Untracked shows are ignored.
    pub fn advance_if_newer(&mut self, candidate: &Episode) -> std::result::Result<bool, IncomparableError> {
        let Some(stored) = self.entries.get_mut(candidate.identity_key()) else {
            return Ok(false);
        };

        if candidate.is_newer_than(stored)? {
            debug!("Advancing {} to {}", stored, candidate);
            *stored = candidate.clone();
            return Ok(true);
        }

        Ok(false)
    }

    pub fn get(&self, title: &str) -> Option<&Episode> {
        self.entries.get(title)
    }

    pub fn contains(&self, title: &str) -> bool {
        self.entries.contains_key(title)
    }

    pub fn episodes(&self) -> impl Iterator<Item = &Episode> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Records sorted by title, the on-disk order.
    pub fn records(&self) -> Vec<WatchRecord> {
        self.entries.values().map(Episode::to_record).collect()
    }

    /// True when the in-memory content differs from `loaded`, ignoring order.
    pub fn differs_from(&self, loaded: &[WatchRecord]) -> bool {
        let mut loaded = loaded.to_vec();
        loaded.sort();
        loaded.dedup();
        loaded != self.records()
    }

    /// Reads the persisted records, creating an empty store file when absent.
    pub fn load(&self) -> Result<Vec<WatchRecord>> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                warn!("Watchlist file {} not found, creating it", self.path.display());
                write_atomic(&self.path, b"[]")?;
                return Ok(Vec::new());
            }
            Err(e) => return Err(NotifierError::storage(&self.path, e)),
        };

        serde_json::from_str(&content).map_err(|e| NotifierError::CorruptWatchlist {
            path: self.path.clone(),
            reason: e.to_string(),
        })
    }

    /// Writes the whole store to disk through a temp file and a rename.
    pub fn persist(&self) -> Result<()> {
        let json = serde_json::to_vec_pretty(&self.records())?;
        write_atomic(&self.path, &json)?;
        debug!("Saved {} watchlist entries to {}", self.entries.len(), self.path.display());
        Ok(())
    }
}

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .ok_or_else(|| NotifierError::Config(format!("watchlist path has no file name: {}", path.display())))?;
    let tmp_path = path.with_file_name(format!(".{}.tmp", file_name));

    let written = File::create(&tmp_path)
        .and_then(|mut file| {
            file.write_all(bytes)?;
            file.sync_all()
        })
        .map_err(|e| NotifierError::storage(&tmp_path, e))
        .and_then(|()| fs::rename(&tmp_path, path).map_err(|e| NotifierError::storage(path, e)));

    if written.is_err() {
        let _ = fs::remove_file(&tmp_path);
    }
    written
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(title: &str, season: u32, episode: u32) -> WatchRecord {
        WatchRecord {
            title: title.to_string(),
            season,
            episode,
        }
    }

    fn seeded(titles: &[&str]) -> WatchlistStore {
        let wishlist: Wishlist = titles.iter().copied().collect();
        let mut store = WatchlistStore::new("unused.json");
        store.seed([&wishlist]);
        store
    }

    #[test]
    fn seed_unions_by_title() {
        let a: Wishlist = ["example show", "other show"].into_iter().collect();
        let b: Wishlist = ["Example Show", "third show"].into_iter().collect();
        let mut store = WatchlistStore::new("unused.json");
        store.seed([&a, &b]);

        assert_eq!(store.len(), 3);
        assert!(store.episodes().all(|e| (e.season(), e.episode()) == (0, 0)));
    }

    #[test]
    fn seed_keeps_existing_positions() {
        let mut store = seeded(&["example show"]);
        store.advance_if_newer(&Episode::new("example show", 1, 3)).unwrap();
        let again: Wishlist = ["example show"].into_iter().collect();
        store.seed([&again]);
        assert_eq!(store.get("example show"), Some(&Episode::new("example show", 1, 3)));
    }

    #[test]
    fn reconcile_adopts_tracked_and_drops_stale() {
        let mut store = seeded(&["example show", "other show"]);
        let report = store.reconcile(vec![record("example show", 2, 5), record("cancelled show", 4, 1)]);

        assert_eq!(report.adopted, 1);
        assert_eq!(report.dropped, vec!["cancelled show".to_string()]);
        assert_eq!(store.get("example show"), Some(&Episode::new("example show", 2, 5)));
        assert_eq!(store.get("other show"), Some(&Episode::placeholder("other show")));
        assert!(!store.contains("cancelled show"));
    }

    #[test]
    fn advance_only_moves_forward() {
        let mut store = seeded(&["example show"]);
        let newer = Episode::new("example show", 2, 5);

        assert_eq!(store.advance_if_newer(&newer), Ok(true));
        assert_eq!(store.advance_if_newer(&newer), Ok(false));
        assert_eq!(store.advance_if_newer(&Episode::new("example show", 2, 4)), Ok(false));
        assert_eq!(store.advance_if_newer(&Episode::new("example show", 1, 9)), Ok(false));
        assert_eq!(store.get("example show"), Some(&newer));

        assert_eq!(store.advance_if_newer(&Episode::new("example show", 3, 0)), Ok(true));
    }

    #[test]
    fn advance_ignores_untracked_shows() {
        let mut store = seeded(&["example show"]);
        assert_eq!(store.advance_if_newer(&Episode::new("unrelated show", 9, 9)), Ok(false));
        assert_eq!(store.len(), 1);
        assert!(!store.contains("unrelated show"));
    }

    #[test]
    fn persist_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("watchlist.json");

        let wishlist: Wishlist = ["example show", "other show"].into_iter().collect();
        let mut store = WatchlistStore::new(&path);
        store.seed([&wishlist]);
        store.advance_if_newer(&Episode::new("other show", 1, 4)).unwrap();
        store.persist().unwrap();

        let loaded = WatchlistStore::new(&path).load().unwrap();
        assert!(!store.differs_from(&loaded));
        assert!(loaded.contains(&record("other show", 1, 4)));
        assert!(loaded.contains(&record("example show", 0, 0)));
        assert!(!dir.path().join(".watchlist.json.tmp").exists());
    }

    #[test]
    fn failed_persist_removes_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("watchlist.json");
        // A non-empty directory in the way makes the final rename fail.
        fs::create_dir(&path).unwrap();
        fs::write(path.join("keep"), "x").unwrap();

        let store = seeded(&["example show"]);
        let store = WatchlistStore { path: path.clone(), ..store };
        assert!(matches!(store.persist(), Err(NotifierError::Storage { .. })));
        assert!(!dir.path().join(".watchlist.json.tmp").exists());
    }

    #[test]
    fn load_creates_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("watchlist.json");

        let loaded = WatchlistStore::new(&path).load().unwrap();
        assert!(loaded.is_empty());
        assert_eq!(fs::read_to_string(&path).unwrap(), "[]");
    }

    #[test]
    fn load_rejects_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("watchlist.json");
        fs::write(&path, "[{\"title\": ").unwrap();

        let err = WatchlistStore::new(&path).load().unwrap_err();
        assert!(matches!(err, NotifierError::CorruptWatchlist { .. }));
    }

    #[test]
    fn differs_from_ignores_order() {
        let mut store = seeded(&["b show", "a show"]);
        store.reconcile(vec![record("b show", 1, 1)]);

        assert!(!store.differs_from(&[record("b show", 1, 1), record("a show", 0, 0)]));
        assert!(store.differs_from(&[record("b show", 1, 1)]));
        assert!(store.differs_from(&[record("b show", 1, 1), record("a show", 0, 0), record("gone", 1, 1)]));
    }
}
