use chrono::{DateTime, Utc};
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

pub use interfaces::defs::{Episode, IncomparableError, WatchRecord, Wishlist};

pub const DEFAULT_FEED_URL: &str = "https://torrentgalaxy.to/rss.php?cat=5,9,11,28,41";
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/58.0.3029.110 Safari/537.36";
pub const DEFAULT_WATCHLIST_FILE: &str = "./watchlist.json";
pub const DEFAULT_SUBSCRIBER_DIR: &str = "./subscribers";
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 120;
pub const DEFAULT_SENDMAIL_COMMAND: &str = "/usr/bin/msmtp";
pub const DEFAULT_MAIL_FROM: &str = "episode-notifier@localhost";

#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub user_agent: String,
    pub timeout_seconds: u64,
    pub max_retries: u32,
    pub retry_delay_seconds: u64,
    pub max_feed_size_mb: usize,
    pub max_redirects: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout_seconds: 30,
            max_retries: 2,
            retry_delay_seconds: 5,
            max_feed_size_mb: 10,
            max_redirects: 5,
        }
    }
}

#[derive(Debug, Clone)]
pub struct FetchResult {
    pub success: bool,
    pub error: Option<String>,
    pub fetch_time: DateTime<Utc>,
    pub response_time_ms: u64,
    pub http_status: Option<u16>,
    pub etag: Option<String>,
    pub last_modified: Option<String>,
    pub content: Option<String>, // RSS/XML body, None on 304
}

/// Where the engine gets its feed entries from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedLocation {
    Url(String),
    File(PathBuf),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MailTransportConfig {
    /// A sendmail-compatible command such as msmtp.
    Sendmail { command: PathBuf },
    Smtp {
        host: String,
        port: u16,
        username: Option<String>,
        password: Option<String>,
    },
}

#[derive(Debug, Clone)]
pub struct MailConfig {
    pub from: String,
    pub subject: String,
    pub transport: MailTransportConfig,
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            from: DEFAULT_MAIL_FROM.to_string(),
            subject: "FTJ! FTJ!".to_string(),
            transport: MailTransportConfig::Sendmail {
                command: PathBuf::from(DEFAULT_SENDMAIL_COMMAND),
            },
        }
    }
}

#[derive(Debug, Clone)]
pub struct NotifierConfig {
    pub feed: FeedLocation,
    pub watchlist_path: PathBuf,
    pub subscriber_dir: PathBuf,
    pub poll_interval: Duration,
    /// Log notifications instead of mailing them and never write the watchlist.
    pub dry_run: bool,
    pub run_once: bool,
    pub fetch: FetchConfig,
    pub mail: MailConfig,
}

impl Default for NotifierConfig {
    fn default() -> Self {
        Self {
            feed: FeedLocation::Url(DEFAULT_FEED_URL.to_string()),
            watchlist_path: PathBuf::from(DEFAULT_WATCHLIST_FILE),
            subscriber_dir: PathBuf::from(DEFAULT_SUBSCRIBER_DIR),
            poll_interval: Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
            dry_run: false,
            run_once: false,
            fetch: FetchConfig::default(),
            mail: MailConfig::default(),
        }
    }
}

impl NotifierConfig {
    pub fn validate(&self) -> Result<()> {
        if self.poll_interval.is_zero() {
            return Err(NotifierError::Config("poll interval must be greater than zero".to_string()));
        }

        if let FeedLocation::Url(url) = &self.feed {
            let parsed = Url::parse(url)?;
            if !matches!(parsed.scheme(), "http" | "https") {
                return Err(NotifierError::Config(format!("feed URL must be http(s): {}", url)));
            }
            if parsed.host().is_none() {
                return Err(NotifierError::Config(format!("feed URL has no host: {}", url)));
            }
        }

        if self.fetch.timeout_seconds == 0 {
            return Err(NotifierError::Config("fetch timeout must be greater than zero".to_string()));
        }

        if let MailTransportConfig::Smtp { host, .. } = &self.mail.transport {
            if host.trim().is_empty() {
                return Err(NotifierError::Config("SMTP host must not be empty".to_string()));
            }
        }

        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum NotifierError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Feed parse error: {0}")]
    Parse(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Feed size {size_bytes} bytes exceeds limit of {limit_mb}MB")]
    FeedTooLarge { size_bytes: u64, limit_mb: usize },

    #[error("Subscriber directory '{}' does not exist", path.display())]
    SubscriberDirMissing { path: PathBuf },

    #[error("Subscriber path '{}' is not a directory", path.display())]
    SubscriberPathNotDirectory { path: PathBuf },

    #[error("File {file} contains invalid entry on line {line}: {entry}")]
    InvalidWish { file: String, line: usize, entry: String },

    #[error("Could not load watchlist file {}: {reason}", path.display())]
    CorruptWatchlist { path: PathBuf, reason: String },

    #[error("Storage error on {}: {source}", path.display())]
    Storage {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Incomparable(#[from] IncomparableError),

    #[error("Mail error: {0}")]
    Mail(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("General error: {0}")]
    General(String),
}

impl NotifierError {
    pub(crate) fn storage(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        NotifierError::Storage {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, NotifierError>;
