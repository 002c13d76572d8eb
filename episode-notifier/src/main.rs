use anyhow::Context;
use clap::Parser;
use episode_notifier::engine::format_episodes;
use episode_notifier::{
    bootstrap_watchlist, Engine, EngineOptions, FeedLocation, FeedSource, FetchConfig, FixtureFeedSource, LogNotifier,
    MailConfig, MailNotifier, MailTransportConfig, NotificationSink, NotifierConfig, RssFeedSource, SubscriberRegistry,
    DEFAULT_FEED_URL, DEFAULT_MAIL_FROM, DEFAULT_POLL_INTERVAL_SECS, DEFAULT_SENDMAIL_COMMAND, DEFAULT_SUBSCRIBER_DIR,
    DEFAULT_WATCHLIST_FILE,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Polls a torrent RSS feed and mails subscribers about new episodes of the
/// shows they follow.
#[derive(Debug, Parser)]
#[command(name = "episode-notifier", version)]
struct Cli {
    /// RSS feed to poll
    #[arg(long, env = "EPISODE_NOTIFIER_FEED_URL", default_value = DEFAULT_FEED_URL)]
    feed_url: String,

    /// Read entries from a local RSS or JSON file instead of the feed URL
    #[arg(long, env = "EPISODE_NOTIFIER_FEED_FILE")]
    feed_file: Option<PathBuf>,

    #[arg(long, env = "EPISODE_NOTIFIER_WATCHLIST", default_value = DEFAULT_WATCHLIST_FILE)]
    watchlist: PathBuf,

    /// Directory with one file per subscriber, one show per line
    #[arg(long, env = "EPISODE_NOTIFIER_SUBSCRIBERS", default_value = DEFAULT_SUBSCRIBER_DIR)]
    subscribers: PathBuf,

    #[arg(long, env = "EPISODE_NOTIFIER_INTERVAL_SECS", default_value_t = DEFAULT_POLL_INTERVAL_SECS)]
    interval_secs: u64,

    /// Log notifications instead of sending them and never write the watchlist
    #[arg(long)]
    dry_run: bool,

    /// Run a single cycle and exit
    #[arg(long)]
    once: bool,

    /// Sendmail-compatible command used when no SMTP host is given
    #[arg(long, env = "EPISODE_NOTIFIER_SENDMAIL", default_value = DEFAULT_SENDMAIL_COMMAND)]
    sendmail: PathBuf,

    #[arg(long, env = "EPISODE_NOTIFIER_SMTP_HOST")]
    smtp_host: Option<String>,

    #[arg(long, env = "EPISODE_NOTIFIER_SMTP_PORT", default_value_t = 587)]
    smtp_port: u16,

    #[arg(long, env = "EPISODE_NOTIFIER_SMTP_USER")]
    smtp_user: Option<String>,

    #[arg(long, env = "EPISODE_NOTIFIER_SMTP_PASSWORD", hide_env_values = true)]
    smtp_password: Option<String>,

    #[arg(long, env = "EPISODE_NOTIFIER_MAIL_FROM", default_value = DEFAULT_MAIL_FROM)]
    mail_from: String,

    /// HTTP timeout for one feed request
    #[arg(long, env = "EPISODE_NOTIFIER_TIMEOUT_SECS", default_value_t = 30)]
    timeout_secs: u64,

    #[arg(long, env = "EPISODE_NOTIFIER_MAX_RETRIES", default_value_t = 2)]
    max_retries: u32,

    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn into_config(self) -> NotifierConfig {
        let feed = match self.feed_file {
            Some(path) => FeedLocation::File(path),
            None => FeedLocation::Url(self.feed_url),
        };

        let transport = match self.smtp_host {
            Some(host) => MailTransportConfig::Smtp {
                host,
                port: self.smtp_port,
                username: self.smtp_user,
                password: self.smtp_password,
            },
            None => MailTransportConfig::Sendmail { command: self.sendmail },
        };

        NotifierConfig {
            feed,
            watchlist_path: self.watchlist,
            subscriber_dir: self.subscribers,
            poll_interval: Duration::from_secs(self.interval_secs),
            dry_run: self.dry_run,
            run_once: self.once,
            fetch: FetchConfig {
                timeout_seconds: self.timeout_secs,
                max_retries: self.max_retries,
                ..FetchConfig::default()
            },
            mail: MailConfig {
                from: self.mail_from,
                transport,
                ..MailConfig::default()
            },
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "episode_notifier=debug,info" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)))
        .init();

    let config = cli.into_config();
    config.validate().context("invalid configuration")?;

    let shutdown = CancellationToken::new();
    tokio::spawn(wait_for_shutdown(shutdown.clone()));

    let subscribers = Arc::new(
        SubscriberRegistry::load(&config.subscriber_dir).context("could not load subscribers")?,
    );
    let store = bootstrap_watchlist(&config.watchlist_path, &subscribers, !config.dry_run)
        .context("could not load watchlist")?;

    if subscribers.is_empty() {
        warn!("No subscribers in {}, nobody will be notified", config.subscriber_dir.display());
    }
    for (subscriber, wishlist) in subscribers.iter() {
        info!("Added subscriber {}: {}", subscriber, wishlist.titles().collect::<Vec<_>>().join(", "));
    }
    info!("Compiled watchlist: {}", format_episodes(&store.episodes().cloned().collect::<Vec<_>>()));

    let source: Box<dyn FeedSource> = match &config.feed {
        FeedLocation::Url(url) => Box::new(RssFeedSource::new(url.clone(), config.fetch.clone())?),
        FeedLocation::File(path) => Box::new(FixtureFeedSource::new(path.clone())),
    };

    let sink: Box<dyn NotificationSink> = if config.dry_run {
        Box::new(LogNotifier::new(config.mail.subject.clone()))
    } else {
        Box::new(MailNotifier::new(&config.mail)?)
    };

    let options = EngineOptions {
        poll_interval: config.poll_interval,
        persist: !config.dry_run,
    };
    let mut engine = Engine::new(source, sink, store, subscribers, options);

    if config.run_once {
        let report = engine.run_cycle().await?;
        info!(
            "Single cycle done: {} entries, {} new episodes, {} subscribers notified",
            report.entries,
            report.new_episodes.len(),
            report.notified.len()
        );
    } else {
        engine.run(shutdown).await?;
    }

    Ok(())
}

/// Cancels `token` on SIGINT/SIGTERM. The engine finishes a running cycle
/// before it notices.
async fn wait_for_shutdown(token: CancellationToken) {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let (mut sigint, mut sigterm) = match (signal(SignalKind::interrupt()), signal(SignalKind::terminate())) {
            (Ok(sigint), Ok(sigterm)) => (sigint, sigterm),
            _ => {
                warn!("Could not install signal handlers, shutdown signals are ignored");
                return;
            }
        };

        tokio::select! {
            _ = sigint.recv() => info!("SIGINT received, shutting down"),
            _ = sigterm.recv() => info!("SIGTERM received, shutting down"),
        }
    }

    #[cfg(not(unix))]
    {
        if tokio::signal::ctrl_c().await.is_err() {
            warn!("Could not listen for Ctrl+C, shutdown signals are ignored");
            return;
        }
        info!("Ctrl+C received, shutting down");
    }

    token.cancel();
}
