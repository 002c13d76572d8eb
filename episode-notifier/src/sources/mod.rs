pub mod fixture_feed;
pub mod rss_feed;

pub use fixture_feed::FixtureFeedSource;
pub use rss_feed::RssFeedSource;
