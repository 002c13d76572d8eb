pub mod types;
pub mod traits;
pub mod extractor;
pub mod parser;
pub mod fetcher;
pub mod sources;
pub mod watchlist;
pub mod subscribers;
pub mod digest;
pub mod notifier;
pub mod engine;

pub use types::*;
pub use traits::{FeedSource, NotificationSink};
pub use extractor::extract_episode;
pub use parser::FeedParser;
pub use fetcher::Fetcher;
pub use sources::{FixtureFeedSource, RssFeedSource};
pub use watchlist::{ReconcileReport, WatchlistStore};
pub use subscribers::SubscriberRegistry;
pub use notifier::{LogNotifier, MailNotifier};
pub use engine::{bootstrap_watchlist, CycleReport, Engine, EngineOptions};
