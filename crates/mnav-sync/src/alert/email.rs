//! Email alerts over authenticated SMTP.

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use super::{Alert, AlertError, AlertTransport};

const DEFAULT_SMTP_PORT: u16 = 587;
/// Port that speaks TLS from the first byte rather than upgrading with STARTTLS.
const IMPLICIT_TLS_PORT: u16 = 465;

/// SMTP relay and addressing for alert mail.
#[derive(Clone)]
pub struct SmtpSettings {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub from: String,
    pub to: String,
}

impl std::fmt::Debug for SmtpSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpSettings")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("from", &self.from)
            .field("to", &self.to)
            .finish()
    }
}

impl SmtpSettings {
    /// Read `SMTP_*` and `ALERT_EMAIL_*` variables. Returns the first missing name.
    pub fn from_env() -> Result<Self, &'static str> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, &'static str> {
        let get = |name: &'static str| {
            lookup(name)
                .filter(|v| !v.trim().is_empty())
                .ok_or(name)
        };
        let port = lookup("SMTP_PORT")
            .and_then(|p| p.trim().parse().ok())
            .unwrap_or(DEFAULT_SMTP_PORT);

        Ok(Self {
            host: get("SMTP_HOST")?,
            port,
            username: get("SMTP_USERNAME")?,
            password: get("SMTP_PASSWORD")?,
            from: get("ALERT_EMAIL_FROM")?,
            to: get("ALERT_EMAIL_TO")?,
        })
    }
}

/// Sends alerts as plain-text mail to a fixed recipient.
pub struct EmailTransport {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    to: Mailbox,
}

impl EmailTransport {
    pub fn new(settings: SmtpSettings) -> Result<Self, AlertError> {
        let from: Mailbox = settings.from.parse()?;
        let to: Mailbox = settings.to.parse()?;

        let builder = if settings.port == IMPLICIT_TLS_PORT {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&settings.host)?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&settings.host)?
        };
        let mailer = builder
            .port(settings.port)
            .credentials(Credentials::new(settings.username, settings.password))
            .build();

        Ok(Self { mailer, from, to })
    }

    fn build_message(&self, alert: &Alert) -> Result<Message, AlertError> {
        let message = Message::builder()
            .from(self.from.clone())
            .to(self.to.clone())
            .subject(alert.subject.clone())
            .header(ContentType::TEXT_PLAIN)
            .body(alert.body.clone())?;
        Ok(message)
    }
}

#[async_trait]
impl AlertTransport for EmailTransport {
    fn name(&self) -> &'static str {
        "email"
    }

    async fn send(&self, alert: &Alert) -> Result<(), AlertError> {
        let message = self.build_message(alert)?;
        self.mailer.send(message).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    fn full_env() -> Vec<(&'static str, &'static str)> {
        vec![
            ("SMTP_HOST", "smtp.example.com"),
            ("SMTP_USERNAME", "bot"),
            ("SMTP_PASSWORD", "hunter2"),
            ("ALERT_EMAIL_FROM", "mnav bot <bot@example.com>"),
            ("ALERT_EMAIL_TO", "ops@example.com"),
        ]
    }

    #[test]
    fn test_settings_report_first_missing_variable() {
        let err = SmtpSettings::from_lookup(env(&[("SMTP_HOST", "h")])).unwrap_err();
        assert_eq!(err, "SMTP_USERNAME");

        let err = SmtpSettings::from_lookup(env(&[("SMTP_HOST", "  ")])).unwrap_err();
        assert_eq!(err, "SMTP_HOST");
    }

    #[test]
    fn test_settings_default_port() {
        let settings = SmtpSettings::from_lookup(env(&full_env())).unwrap();
        assert_eq!(settings.port, 587);
        assert!(!format!("{settings:?}").contains("hunter2"));

        let mut vars = full_env();
        vars.push(("SMTP_PORT", "465"));
        assert_eq!(SmtpSettings::from_lookup(env(&vars)).unwrap().port, 465);
    }

    #[tokio::test]
    async fn test_message_carries_subject_and_body() {
        let settings = SmtpSettings::from_lookup(env(&full_env())).unwrap();
        let transport = EmailTransport::new(settings).unwrap();
        let alert = Alert::new("[mnav-sync] data shortfall", "insufficient valid data (8/9 fields)");

        let formatted = String::from_utf8(transport.build_message(&alert).unwrap().formatted()).unwrap();
        assert!(formatted.contains("Subject: [mnav-sync] data shortfall"));
        assert!(formatted.contains("To: ops@example.com"));
        assert!(formatted.contains("8/9"));
    }

    #[test]
    fn test_invalid_address_is_rejected() {
        let mut settings = SmtpSettings::from_lookup(env(&full_env())).unwrap();
        settings.to = "not-an-address".into();
        assert!(matches!(EmailTransport::new(settings), Err(AlertError::Address(_))));
    }
}
