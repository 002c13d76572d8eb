use crate::fetcher::Fetcher;
use crate::parser::FeedParser;
use crate::traits::FeedSource;
use crate::types::{FetchConfig, NotifierError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::{debug, info};

/// Live RSS/Atom feed fetched over HTTP.
pub struct RssFeedSource {
    pub url: String,
    pub title: Option<String>,
    fetcher: Fetcher,
    parser: FeedParser,
    last_fetch: Option<DateTime<Utc>>,
    last_etag: Option<String>,
    last_modified: Option<String>,
}

impl RssFeedSource {
    pub fn new(url: String, fetch_config: FetchConfig) -> Result<Self> {
        Ok(Self {
            url,
            title: None,
            fetcher: Fetcher::new(fetch_config)?,
            parser: FeedParser::new(),
            last_fetch: None,
            last_etag: None,
            last_modified: None,
        })
    }

    pub fn last_fetch(&self) -> Option<DateTime<Utc>> {
        self.last_fetch
    }
}

#[async_trait]
impl FeedSource for RssFeedSource {
    fn source_name(&self) -> String {
        self.title.clone().unwrap_or_else(|| {
            if let Ok(parsed) = url::Url::parse(&self.url) {
                if let Some(domain) = parsed.domain() {
                    return format!("RSS Feed ({})", domain);
                }
            }
            "RSS Feed".to_string()
        })
    }

    async fn fetch_entries(&mut self) -> Result<Vec<String>> {
        info!("Pulling RSS feed: {}", self.url);

        let fetch_result = self
            .fetcher
            .fetch_feed(&self.url, self.last_etag.as_deref(), self.last_modified.as_deref())
            .await?;

        if !fetch_result.success {
            let error_msg = fetch_result.error.unwrap_or_else(|| "Fetch failed".to_string());
            return Err(NotifierError::General(error_msg));
        }

        debug!(
            "Feed {} answered HTTP {:?} in {}ms",
            self.url, fetch_result.http_status, fetch_result.response_time_ms
        );
        self.last_fetch = Some(fetch_result.fetch_time);
        self.last_etag = fetch_result.etag;
        self.last_modified = fetch_result.last_modified;

        let content = match fetch_result.content {
            Some(content) => content,
            None => {
                debug!("Feed {} not modified since last fetch", self.url);
                return Ok(Vec::new());
            }
        };

        let parsed_feed = self.parser.parse_feed(content.as_bytes())?;
        if self.title.is_none() {
            self.title = parsed_feed.title.clone();
        }

        let titles = parsed_feed.entry_titles();
        info!("Pulled {} entries from RSS feed {}", titles.len(), self.url);
        Ok(titles)
    }
}
