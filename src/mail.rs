use anyhow::Context;
use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::config::SmtpConfig;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMail {
    pub to: String,
    pub subject: String,
    pub html: String,
}

/// Mail with the link that confirms `to` owns the address.
pub fn verification_mail(to: &str, link: &str) -> OutgoingMail {
    OutgoingMail {
        to: to.to_string(),
        subject: "Verify your email".to_string(),
        html: format!(
            r#"<p>Confirm your email address to finish signing up.</p><a target="_blank" href="{link}">Click to verify email</a>"#
        ),
    }
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, mail: OutgoingMail) -> anyhow::Result<()>;
}

pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    pub fn new(cfg: &SmtpConfig) -> anyhow::Result<Self> {
        // 587 speaks STARTTLS; anything else is treated as implicit TLS.
        let builder = if cfg.port == 587 {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&cfg.host)
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&cfg.host)
        };
        let transport = builder
            .with_context(|| format!("smtp relay {}", cfg.host))?
            .credentials(Credentials::new(cfg.username.clone(), cfg.password.clone()))
            .port(cfg.port)
            .timeout(Some(std::time::Duration::from_secs(10)))
            .build();
        let from = cfg
            .from
            .parse::<Mailbox>()
            .with_context(|| format!("invalid MAIL_FROM {}", cfg.from))?;
        Ok(Self { transport, from })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, mail: OutgoingMail) -> anyhow::Result<()> {
        let to = mail
            .to
            .parse::<Mailbox>()
            .with_context(|| format!("invalid recipient {}", mail.to))?;
        let message = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(mail.subject)
            .header(ContentType::TEXT_HTML)
            .body(mail.html)
            .context("build message")?;
        self.transport.send(message).await.context("smtp send")?;
        debug!(to = %mail.to, "mail sent");
        Ok(())
    }
}

/// Used when no SMTP server is configured; the mail only goes to the log.
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, mail: OutgoingMail) -> anyhow::Result<()> {
        info!(to = %mail.to, subject = %mail.subject, body = %mail.html, "mail not sent, SMTP disabled");
        Ok(())
    }
}

/// Keeps every mail in memory so tests can read the links back.
#[derive(Default)]
pub struct MemoryMailer {
    sent: Mutex<Vec<OutgoingMail>>,
}

impl MemoryMailer {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn sent(&self) -> Vec<OutgoingMail> {
        self.sent.lock().await.clone()
    }

    pub async fn last_to(&self, to: &str) -> Option<OutgoingMail> {
        self.sent
            .lock()
            .await
            .iter()
            .rev()
            .find(|m| m.to == to)
            .cloned()
    }
}

#[async_trait]
impl Mailer for MemoryMailer {
    async fn send(&self, mail: OutgoingMail) -> anyhow::Result<()> {
        self.sent.lock().await.push(mail);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verification_mail_embeds_link() {
        let mail = verification_mail("a@x.com", "http://localhost:3000/api/users/verify/abc");
        assert_eq!(mail.to, "a@x.com");
        assert!(mail
            .html
            .contains(r#"href="http://localhost:3000/api/users/verify/abc""#));
    }

    #[tokio::test]
    async fn memory_mailer_records_in_order() {
        let mailer = MemoryMailer::new();
        mailer.send(verification_mail("a@x.com", "l1")).await.unwrap();
        mailer.send(verification_mail("b@x.com", "l2")).await.unwrap();
        mailer.send(verification_mail("a@x.com", "l3")).await.unwrap();

        assert_eq!(mailer.sent().await.len(), 3);
        let last = mailer.last_to("a@x.com").await.unwrap();
        assert!(last.html.contains("l3"));
    }

    #[tokio::test]
    async fn smtp_mailer_rejects_bad_sender() {
        let cfg = SmtpConfig {
            host: "smtp.example.com".into(),
            port: 465,
            username: "user".into(),
            password: "pass".into(),
            from: "not an address".into(),
        };
        assert!(SmtpMailer::new(&cfg).is_err());
    }
}
