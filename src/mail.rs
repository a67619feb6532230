//! Outgoing email over authenticated SMTP.

use anyhow::{Context, Result};
use async_trait::async_trait;
use lettre::message::{header::ContentType, Mailbox, Message};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{SmtpTransport, Transport};
use serde::Serialize;

use crate::config::MailConfig;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutgoingEmail {
    pub to: String,
    pub subject: String,
    pub body: String,
}

#[async_trait]
pub trait MailSender: Send + Sync {
    async fn send(&self, email: OutgoingEmail) -> Result<()>;
}

pub struct SmtpMailer {
    transport: Option<SmtpTransport>,
    from: Option<String>,
}

impl SmtpMailer {
    pub fn new(config: &MailConfig) -> Result<Self> {
        let transport = match (&config.username, &config.password) {
            (Some(user), Some(pass)) => {
                let builder = if config.starttls {
                    SmtpTransport::starttls_relay(&config.smtp_host)
                } else {
                    SmtpTransport::relay(&config.smtp_host)
                }
                .with_context(|| format!("invalid SMTP relay host: {}", config.smtp_host))?;
                Some(
                    builder
                        .port(config.smtp_port)
                        .credentials(Credentials::new(user.clone(), pass.clone()))
                        .build(),
                )
            }
            _ => None,
        };

        Ok(Self {
            transport,
            from: config.from.clone().or_else(|| config.username.clone()),
        })
    }

    pub fn is_configured(&self) -> bool {
        self.transport.is_some()
    }
}

#[async_trait]
impl MailSender for SmtpMailer {
    async fn send(&self, email: OutgoingEmail) -> Result<()> {
        let transport = self
            .transport
            .clone()
            .context("SMTP credentials are not configured (GMAIL_USER, GMAIL_APP_PASS)")?;
        let from = self.from.as_deref().context("no sender address configured")?;
        let message = build_message(from, &email)?;

        tokio::task::spawn_blocking(move || transport.send(&message))
            .await
            .context("mail task failed")?
            .context("SMTP send failed")?;

        tracing::info!(to = %email.to, subject = %email.subject, "email sent");
        Ok(())
    }
}

/// Build a plain-text message. Fails on unparseable addresses.
pub fn build_message(from: &str, email: &OutgoingEmail) -> Result<Message> {
    let from: Mailbox = from
        .parse()
        .with_context(|| format!("invalid sender address: {from}"))?;
    let to: Mailbox = email
        .to
        .parse()
        .with_context(|| format!("invalid recipient address: {}", email.to))?;

    Message::builder()
        .from(from)
        .to(to)
        .subject(email.subject.as_str())
        .header(ContentType::TEXT_PLAIN)
        .body(email.body.clone())
        .context("failed to build email message")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn email(to: &str) -> OutgoingEmail {
        OutgoingEmail {
            to: to.into(),
            subject: "Liam's GPT Email Delivery".into(),
            body: "hello there".into(),
        }
    }

    #[test]
    fn builds_plain_text_message() {
        let message = build_message("liam@example.com", &email("ada@example.com")).unwrap();
        let raw = String::from_utf8(message.formatted()).unwrap();
        assert!(raw.contains("To: ada@example.com"));
        assert!(raw.contains("From: liam@example.com"));
        assert!(raw.contains("Content-Type: text/plain"));
    }

    #[test]
    fn rejects_bad_recipient() {
        let err = build_message("liam@example.com", &email("not an address")).unwrap_err();
        assert!(err.to_string().contains("invalid recipient address"));
    }

    #[tokio::test]
    async fn unconfigured_mailer_refuses_to_send() {
        let mailer = SmtpMailer::new(&MailConfig::default()).unwrap();
        assert!(!mailer.is_configured());
        let err = mailer.send(email("ada@example.com")).await.unwrap_err();
        assert!(err.to_string().contains("GMAIL_APP_PASS"));
    }
}
