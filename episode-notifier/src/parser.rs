use crate::types::{NotifierError, Result};
use feed_rs::parser;
use tracing::debug;

#[derive(Debug)]
pub struct ParsedFeed {
    pub title: Option<String>,
    pub entries: Vec<ParsedEntry>,
}

#[derive(Debug)]
pub struct ParsedEntry {
    pub guid: Option<String>,
    pub title: String,
}

impl ParsedFeed {
    /// Entry titles in document order.
    pub fn entry_titles(&self) -> Vec<String> {
        self.entries.iter().map(|entry| entry.title.clone()).collect()
    }
}

#[derive(Debug, Default)]
pub struct FeedParser;

impl FeedParser {
    pub fn new() -> Self {
        Self
    }

    /// Parses an RSS or Atom document. Entries without a title are skipped.
    pub fn parse_feed(&self, content: &[u8]) -> Result<ParsedFeed> {
        debug!("Parsing feed content ({} bytes)", content.len());

        let feed = parser::parse(content)
            .map_err(|e| NotifierError::Parse(format!("Failed to parse feed: {}", e)))?;

        let title = feed.title.map(|t| t.content);

        let entries: Vec<ParsedEntry> = feed
            .entries
            .into_iter()
            .filter_map(|entry| {
                let title = entry.title?.content;
                if title.trim().is_empty() {
                    return None;
                }
                Some(ParsedEntry {
                    guid: (!entry.id.is_empty()).then_some(entry.id),
                    title,
                })
            })
            .collect();

        debug!("Parsed feed with {} titled entries", entries.len());

        Ok(ParsedFeed { title, entries })
    }
}
