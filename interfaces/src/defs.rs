use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

/// A show/season/episode triple.
///
/// The title is the identity key of a show: two episodes belong to the same
/// show iff their titles match, and they can only be ordered against each
/// other when they do. Ordering across shows is an explicit error instead of
/// an unchecked operator, see [`Episode::order_within_same_key`].
///
/// The derived `PartialEq` compares the full value (title, season and
/// episode); use [`Episode::same_show`] for identity. There is no `Hash`:
/// sets and maps of episodes are keyed by [`Episode::identity_key`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Episode {
    title: String,
    season: u32,
    episode: u32,
}

/// Raised when two episodes of different shows are compared.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("cannot order episodes of different shows: '{left}' vs '{right}'")]
pub struct IncomparableError {
    pub left: String,
    pub right: String,
}

impl Episode {
    pub fn new(title: &str, season: u32, episode: u32) -> Self {
        Self {
            title: normalize_title(title),
            season,
            episode,
        }
    }

    /// A title-only episode (season 0, episode 0), meaning "nothing seen yet".
    pub fn placeholder(title: &str) -> Self {
        Self::new(title, 0, 0)
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn season(&self) -> u32 {
        self.season
    }

    pub fn episode(&self) -> u32 {
        self.episode
    }

    /// Key used for every set/map of episodes.
    pub fn identity_key(&self) -> &str {
        &self.title
    }

    pub fn same_show(&self, other: &Episode) -> bool {
        self.identity_key() == other.identity_key()
    }

    /// Orders two episodes of the same show by `(season, episode)`.
    pub fn order_within_same_key(&self, other: &Episode) -> Result<Ordering, IncomparableError> {
        if !self.same_show(other) {
            return Err(IncomparableError {
                left: self.title.clone(),
                right: other.title.clone(),
            });
        }
        Ok((self.season, self.episode).cmp(&(other.season, other.episode)))
    }

    /// True when `self` was released strictly after `other`.
    pub fn is_newer_than(&self, other: &Episode) -> Result<bool, IncomparableError> {
        Ok(self.order_within_same_key(other)? == Ordering::Greater)
    }

    pub fn to_record(&self) -> WatchRecord {
        WatchRecord {
            title: self.title.clone(),
            season: self.season,
            episode: self.episode,
        }
    }
}

impl fmt::Display for Episode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut chars = self.title.chars();
        if let Some(first) = chars.next() {
            write!(f, "{}{}", first.to_uppercase(), chars.as_str())?;
        }
        write!(f, " S{:02}E{:02}", self.season, self.episode)
    }
}

impl From<WatchRecord> for Episode {
    fn from(record: WatchRecord) -> Self {
        Episode::new(&record.title, record.season, record.episode)
    }
}

fn normalize_title(title: &str) -> String {
    title.trim().to_lowercase()
}

/// Persisted shape of one watchlist entry.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct WatchRecord {
    pub title: String,
    pub season: u32,
    pub episode: u32,
}

/// The shows one subscriber wants to hear about, keyed by title.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Wishlist {
    shows: BTreeMap<String, Episode>,
}

impl Wishlist {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a show by title; a repeated title is a no-op.
    pub fn insert(&mut self, title: &str) {
        let wish = Episode::placeholder(title);
        self.shows
            .entry(wish.identity_key().to_string())
            .or_insert(wish);
    }

    pub fn contains(&self, title: &str) -> bool {
        self.shows.contains_key(title)
    }

    pub fn episodes(&self) -> impl Iterator<Item = &Episode> {
        self.shows.values()
    }

    pub fn titles(&self) -> impl Iterator<Item = &str> {
        self.shows.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.shows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shows.is_empty()
    }
}

impl<'a> FromIterator<&'a str> for Wishlist {
    fn from_iter<I: IntoIterator<Item = &'a str>>(iter: I) -> Self {
        let mut wishlist = Wishlist::new();
        for title in iter {
            wishlist.insert(title);
        }
        wishlist
    }
}
