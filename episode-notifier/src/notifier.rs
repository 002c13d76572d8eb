use crate::digest::{render_digest, Digest};
use crate::traits::NotificationSink;
use crate::types::{Episode, MailConfig, MailTransportConfig, NotifierError, Result};
use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSendmailTransport, AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::info;

enum MailTransport {
    Sendmail(AsyncSendmailTransport<Tokio1Executor>),
    Smtp(AsyncSmtpTransport<Tokio1Executor>),
}

/// Mails the digest to the subscriber, whose identity is their address.
pub struct MailNotifier {
    from: Mailbox,
    subject: String,
    transport: MailTransport,
}

impl MailNotifier {
    pub fn new(config: &MailConfig) -> Result<Self> {
        let from = config
            .from
            .parse::<Mailbox>()
            .map_err(|e| NotifierError::Config(format!("invalid sender address '{}': {}", config.from, e)))?;

        let transport = match &config.transport {
            MailTransportConfig::Sendmail { command } => {
                MailTransport::Sendmail(AsyncSendmailTransport::<Tokio1Executor>::new_with_command(command.as_os_str()))
            }
            MailTransportConfig::Smtp {
                host,
                port,
                username,
                password,
            } => {
                let mut builder = AsyncSmtpTransport::<Tokio1Executor>::relay(host)
                    .map_err(|e| NotifierError::Config(format!("invalid SMTP relay '{}': {}", host, e)))?
                    .port(*port);
                if let Some(username) = username {
                    let password = password.clone().unwrap_or_default();
                    builder = builder.credentials(Credentials::new(username.clone(), password));
                }
                MailTransport::Smtp(builder.build())
            }
        };

        Ok(Self {
            from,
            subject: config.subject.clone(),
            transport,
        })
    }

    pub fn build_message(&self, subscriber: &str, digest: Digest) -> Result<Message> {
        let to = subscriber
            .parse::<Mailbox>()
            .map_err(|e| NotifierError::Mail(format!("invalid subscriber address '{}': {}", subscriber, e)))?;

        Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(digest.subject)
            .header(ContentType::TEXT_PLAIN)
            .body(digest.body)
            .map_err(|e| NotifierError::Mail(e.to_string()))
    }
}

#[async_trait]
impl NotificationSink for MailNotifier {
    fn sink_name(&self) -> String {
        match self.transport {
            MailTransport::Sendmail(_) => "sendmail".to_string(),
            MailTransport::Smtp(_) => "smtp".to_string(),
        }
    }

    async fn notify(&self, subscriber: &str, episodes: &[Episode]) -> Result<()> {
        let message = self.build_message(subscriber, render_digest(&self.subject, episodes))?;

        match &self.transport {
            MailTransport::Sendmail(transport) => transport
                .send(message)
                .await
                .map(|_| ())
                .map_err(|e| NotifierError::Mail(e.to_string())),
            MailTransport::Smtp(transport) => transport
                .send(message)
                .await
                .map(|_| ())
                .map_err(|e| NotifierError::Mail(e.to_string())),
        }
    }
}

/// Dry-run sink: logs the digest instead of delivering it.
pub struct LogNotifier {
    subject: String,
}

impl LogNotifier {
    pub fn new(subject: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
        }
    }
}

#[async_trait]
impl NotificationSink for LogNotifier {
    fn sink_name(&self) -> String {
        "log".to_string()
    }

    async fn notify(&self, subscriber: &str, episodes: &[Episode]) -> Result<()> {
        let digest = render_digest(&self.subject, episodes);
        info!(subscriber = %subscriber, subject = %digest.subject, "Would notify:\n{}", digest.body);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sendmail_notifier() -> MailNotifier {
        MailNotifier::new(&MailConfig::default()).unwrap()
    }

    #[test]
    fn message_carries_subject_and_recipient() {
        let notifier = sendmail_notifier();
        let digest = render_digest("FTJ! FTJ!", &[Episode::new("example show", 2, 5)]);
        let message = notifier.build_message("a@example.com", digest).unwrap();

        let formatted = String::from_utf8(message.formatted()).unwrap();
        assert!(formatted.contains("Subject: FTJ! FTJ!"));
        assert!(formatted.contains("To: a@example.com"));
        assert!(formatted.contains("Example show S02E05"));
    }

    #[test]
    fn invalid_subscriber_address_is_a_mail_error() {
        let notifier = sendmail_notifier();
        let digest = render_digest("FTJ! FTJ!", &[Episode::new("example show", 2, 5)]);
        assert!(matches!(
            notifier.build_message("not an address", digest),
            Err(NotifierError::Mail(_))
        ));
    }

    #[test]
    fn invalid_sender_is_a_config_error() {
        let config = MailConfig {
            from: "nobody".to_string(),
            ..Default::default()
        };
        assert!(matches!(MailNotifier::new(&config), Err(NotifierError::Config(_))));
    }

    #[tokio::test]
    async fn smtp_relay_with_credentials_builds() {
        let config = MailConfig {
            transport: MailTransportConfig::Smtp {
                host: "smtp.example.com".to_string(),
                port: 2525,
                username: Some("notifier".to_string()),
                password: Some("secret".to_string()),
            },
            ..Default::default()
        };

        let notifier = MailNotifier::new(&config).unwrap();
        assert_eq!(notifier.sink_name(), "smtp");
        assert_eq!(sendmail_notifier().sink_name(), "sendmail");
    }

    #[tokio::test]
    async fn log_notifier_always_succeeds() {
        let sink = LogNotifier::new("FTJ! FTJ!");
        assert!(sink.notify("a@example.com", &[Episode::new("show", 1, 1)]).await.is_ok());
        assert_eq!(sink.sink_name(), "log");
    }
}
