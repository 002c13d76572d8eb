use crate::parser::FeedParser;
use crate::traits::FeedSource;
use crate::types::{NotifierError, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::path::PathBuf;
use tracing::info;

/// Static feed read from a local file on every poll.
///
/// The file is either an RSS/Atom document or a JSON dump of the form
/// `{"entries": [{"title": "..."}, ...]}`.
pub struct FixtureFeedSource {
    path: PathBuf,
    parser: FeedParser,
}

#[derive(Debug, Deserialize)]
struct JsonFeed {
    entries: Vec<JsonEntry>,
}

#[derive(Debug, Deserialize)]
struct JsonEntry {
    title: Option<String>,
}

impl FixtureFeedSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            parser: FeedParser::new(),
        }
    }

    fn parse(&self, content: &str) -> Result<Vec<String>> {
        if content.trim_start().starts_with('{') {
            let feed: JsonFeed = serde_json::from_str(content)?;
            return Ok(feed.entries.into_iter().filter_map(|entry| entry.title).collect());
        }
        Ok(self.parser.parse_feed(content.as_bytes())?.entry_titles())
    }
}

#[async_trait]
impl FeedSource for FixtureFeedSource {
    fn source_name(&self) -> String {
        format!("Fixture ({})", self.path.display())
    }

    async fn fetch_entries(&mut self) -> Result<Vec<String>> {
        let content = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| NotifierError::storage(&self.path, e))?;
        let titles = self.parse(&content)?;
        info!("Read {} entries from {}", titles.len(), self.path.display());
        Ok(titles)
    }
}
