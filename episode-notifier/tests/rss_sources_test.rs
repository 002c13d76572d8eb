use episode_notifier::{FeedSource, FetchConfig, FixtureFeedSource, RssFeedSource};
use std::sync::Once;
use tracing::info;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

static INIT: Once = Once::new();

fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::INFO)
            .try_init()
            .ok();
    });
}

const SAMPLE_RSS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title>Test Torrents</title>
    <link>https://torrents.example.com</link>
    <description>Latest uploads</description>
    <item>
      <title>Example.Show.S02E05.1080p.WEB.h264</title>
      <guid>1</guid>
    </item>
    <item>
      <title>Other Show S01E03 720p HDTV</title>
      <guid>2</guid>
    </item>
  </channel>
</rss>"#;

fn test_config(max_retries: u32) -> FetchConfig {
    FetchConfig {
        user_agent: "episode-notifier-test/1.0".to_string(),
        timeout_seconds: 5,
        max_retries,
        retry_delay_seconds: 1,
        ..FetchConfig::default()
    }
}

#[tokio::test]
async fn test_rss_feed_source_pulls_titles() {
    init_tracing();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rss"))
        .respond_with(ResponseTemplate::new(200).set_body_string(SAMPLE_RSS))
        .mount(&server)
        .await;

    let mut source = RssFeedSource::new(format!("{}/rss", server.uri()), test_config(0)).unwrap();
    assert_eq!(source.source_name(), "RSS Feed");

    let titles = source.fetch_entries().await.unwrap();
    info!("Pulled titles: {:?}", titles);

    assert_eq!(
        titles,
        vec!["Example.Show.S02E05.1080p.WEB.h264", "Other Show S01E03 720p HDTV"]
    );
    assert_eq!(source.source_name(), "Test Torrents");
    assert!(source.last_fetch().is_some());
}

#[tokio::test]
async fn test_rss_feed_source_honours_etag() {
    init_tracing();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rss"))
        .and(header("If-None-Match", "\"v1\""))
        .respond_with(ResponseTemplate::new(304))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rss"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("ETag", "\"v1\"")
                .set_body_string(SAMPLE_RSS),
        )
        .mount(&server)
        .await;

    let mut source = RssFeedSource::new(format!("{}/rss", server.uri()), test_config(0)).unwrap();

    let first = source.fetch_entries().await.unwrap();
    assert_eq!(first.len(), 2);

    let second = source.fetch_entries().await.unwrap();
    assert!(second.is_empty());
}

#[tokio::test]
async fn test_rss_feed_source_reports_http_failure() {
    init_tracing();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rss"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    let mut source = RssFeedSource::new(format!("{}/rss", server.uri()), test_config(0)).unwrap();
    assert!(source.fetch_entries().await.is_err());
}

#[tokio::test]
async fn test_rss_feed_source_retries_transient_errors() {
    init_tracing();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rss"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rss"))
        .respond_with(ResponseTemplate::new(200).set_body_string(SAMPLE_RSS))
        .mount(&server)
        .await;

    let mut source = RssFeedSource::new(format!("{}/rss", server.uri()), test_config(1)).unwrap();
    let titles = source.fetch_entries().await.unwrap();
    assert_eq!(titles.len(), 2);
}

fn oversized_feed(min_bytes: usize) -> String {
    let item = "<item><title>Example.Show.S01E01.1080p.WEB</title><guid>x</guid></item>\n";
    let mut body = String::from(r#"<?xml version="1.0"?><rss version="2.0"><channel><title>Big</title>"#);
    while body.len() < min_bytes {
        body.push_str(item);
    }
    body.push_str("</channel></rss>");
    body
}

#[tokio::test]
async fn test_rss_feed_source_rejects_oversized_feed() {
    init_tracing();
    let server = MockServer::start().await;
    // Just under 2 MiB against a 1 MB cap.
    Mock::given(method("GET"))
        .and(path("/rss"))
        .respond_with(ResponseTemplate::new(200).set_body_string(oversized_feed(1_970_000)))
        .mount(&server)
        .await;

    let config = FetchConfig {
        max_feed_size_mb: 1,
        ..test_config(0)
    };
    let mut source = RssFeedSource::new(format!("{}/rss", server.uri()), config).unwrap();

    let err = source.fetch_entries().await.unwrap_err();
    assert!(err.to_string().contains("exceeds limit of 1MB"), "unexpected error: {}", err);
}

#[tokio::test]
async fn test_rss_feed_source_accepts_feed_under_cap() {
    init_tracing();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rss"))
        .respond_with(ResponseTemplate::new(200).set_body_string(oversized_feed(500_000)))
        .mount(&server)
        .await;

    let config = FetchConfig {
        max_feed_size_mb: 1,
        ..test_config(0)
    };
    let mut source = RssFeedSource::new(format!("{}/rss", server.uri()), config).unwrap();
    assert!(!source.fetch_entries().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_rss_feed_source_rejects_garbage() {
    init_tracing();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rss"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
        .mount(&server)
        .await;

    let mut source = RssFeedSource::new(format!("{}/rss", server.uri()), test_config(0)).unwrap();
    assert!(source.fetch_entries().await.is_err());
}

#[tokio::test]
async fn test_fixture_feed_source_reads_rss_file() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("feed.xml");
    std::fs::write(&path, SAMPLE_RSS).unwrap();

    let mut source = FixtureFeedSource::new(path.clone());
    let titles = source.fetch_entries().await.unwrap();
    assert_eq!(titles[0], "Example.Show.S02E05.1080p.WEB.h264");
}
