use crate::types::{NotifierError, Result, Wishlist};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

/// Subscriber identity (the file name, usually an email address) to the shows
/// they follow. Loaded once at startup and read-only afterwards.
#[derive(Debug, Clone, Default)]
pub struct SubscriberRegistry {
    subscribers: BTreeMap<String, Wishlist>,
}

impl SubscriberRegistry {
    /// Reads one subscriber per regular file in `dir`.
    pub fn load(dir: &Path) -> Result<Self> {
        if !dir.exists() {
            return Err(NotifierError::SubscriberDirMissing { path: dir.to_path_buf() });
        }
        if !dir.is_dir() {
            return Err(NotifierError::SubscriberPathNotDirectory { path: dir.to_path_buf() });
        }

        let mut subscribers = BTreeMap::new();

        for entry in fs::read_dir(dir).map_err(|e| NotifierError::storage(dir, e))? {
            let entry = entry.map_err(|e| NotifierError::storage(dir, e))?;
            let path = entry.path();
            let identity = entry.file_name().to_string_lossy().into_owned();

            let is_file = fs::metadata(&path).map(|m| m.is_file()).unwrap_or(false);
            if !is_file {
                warn!("Non-file entry present in subscriber-directory: {}", identity);
                continue;
            }

            let content = fs::read_to_string(&path).map_err(|e| NotifierError::storage(&path, e))?;
            let wishlist = parse_wishlist(&identity, &content)?;
            debug!("Loaded {} wishes for {}", wishlist.len(), identity);
            subscribers.insert(identity, wishlist);
        }

        Ok(Self { subscribers })
    }

    pub fn from_entries<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (String, Wishlist)>,
    {
        Self {
            subscribers: entries.into_iter().collect(),
        }
    }

    /// Subscribers in identity order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Wishlist)> {
        self.subscribers.iter().map(|(id, wishlist)| (id.as_str(), wishlist))
    }

    pub fn wishlists(&self) -> impl Iterator<Item = &Wishlist> {
        self.subscribers.values()
    }

    pub fn get(&self, identity: &str) -> Option<&Wishlist> {
        self.subscribers.get(identity)
    }

    pub fn len(&self) -> usize {
        self.subscribers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }
}

/// Parses one subscriber file: a show title per line, `#` starts a comment
/// line. Titles are alphanumeric words separated by whitespace.
pub fn parse_wishlist(identity: &str, content: &str) -> Result<Wishlist> {
    let mut wishlist = Wishlist::new();

    for (index, raw) in content.lines().enumerate() {
        let row = raw.trim().to_lowercase();
        if row.is_empty() || row.starts_with('#') {
            continue;
        }

        if !row.chars().all(|c| c.is_alphanumeric() || c.is_whitespace()) {
            return Err(NotifierError::InvalidWish {
                file: identity.to_string(),
                line: index + 1,
                entry: row,
            });
        }

        let title = row.split_whitespace().collect::<Vec<_>>().join(" ");
        wishlist.insert(&title);
    }

    Ok(wishlist)
}
