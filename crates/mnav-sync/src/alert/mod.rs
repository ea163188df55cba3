//! Operator alerts for rejected or failed runs.
//!
//! Every alert goes to the local log. Configured transports (email,
//! Telegram) are then tried one by one; a transport failure is logged and
//! swallowed so it can never mask the failure being reported.

pub mod email;
pub mod telegram;

use async_trait::async_trait;
use mnav_core::FailureReport;

pub use email::{EmailTransport, SmtpSettings};
pub use telegram::{TelegramSettings, TelegramTransport};

/// Prefix on every alert subject.
pub const SUBJECT_PREFIX: &str = "[mnav-sync]";

/// Errors raised by an alert transport.
#[derive(thiserror::Error, Debug)]
pub enum AlertError {
    #[error("invalid email address: {0}")]
    Address(#[from] lettre::address::AddressError),

    #[error("failed to build email: {0}")]
    Message(#[from] lettre::error::Error),

    #[error("SMTP delivery failed: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{service} rejected the alert: {status} {body}")]
    Rejected {
        service: &'static str,
        status: u16,
        body: String,
    },
}

/// A formatted notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alert {
    pub subject: String,
    pub body: String,
}

impl Alert {
    pub fn new(subject: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            body: body.into(),
        }
    }

    /// Alert describing a failure report.
    pub fn from_report(report: &FailureReport) -> Self {
        Self::new(
            format!("{SUBJECT_PREFIX} {}", report.kind.subject()),
            report.body(),
        )
    }
}

/// A channel that can deliver an alert to the operator.
#[async_trait]
pub trait AlertTransport: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;
    async fn send(&self, alert: &Alert) -> Result<(), AlertError>;
}

/// Result of one dispatch, for callers that want to inspect delivery.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchSummary {
    pub delivered: Vec<&'static str>,
    pub failed: Vec<&'static str>,
}

/// Fans an alert out to the log channel and every configured transport.
#[derive(Default)]
pub struct AlertDispatcher {
    transports: Vec<Box<dyn AlertTransport>>,
}

impl AlertDispatcher {
    /// Dispatcher with only the local log channel.
    pub fn log_only() -> Self {
        Self::default()
    }

    pub fn with_transport(mut self, transport: Box<dyn AlertTransport>) -> Self {
        self.transports.push(transport);
        self
    }

    /// Build transports from whichever credentials the environment supplies.
    pub fn from_env() -> Self {
        let mut dispatcher = Self::log_only();
        match SmtpSettings::from_env() {
            Ok(settings) => match EmailTransport::new(settings) {
                Ok(t) => dispatcher = dispatcher.with_transport(Box::new(t)),
                Err(e) => tracing::warn!("email alerts disabled: {e}"),
            },
            Err(missing) => tracing::info!("email alerts not configured: {missing} is unset"),
        }
        match TelegramSettings::from_env() {
            Ok(settings) => match TelegramTransport::new(settings) {
                Ok(t) => dispatcher = dispatcher.with_transport(Box::new(t)),
                Err(e) => tracing::warn!("telegram alerts disabled: {e}"),
            },
            Err(missing) => tracing::info!("telegram alerts not configured: {missing} is unset"),
        }
        dispatcher
    }

    pub fn transport_names(&self) -> Vec<&'static str> {
        self.transports.iter().map(|t| t.name()).collect()
    }

    /// Report a failure. Never fails.
    pub async fn dispatch(&self, report: &FailureReport) -> DispatchSummary {
        let alert = Alert::from_report(report);
        self.send(&alert).await
    }

    /// Deliver an alert. Never fails.
    pub async fn send(&self, alert: &Alert) -> DispatchSummary {
        tracing::warn!(subject = %alert.subject, "ALERT: {}", alert.body);

        let mut summary = DispatchSummary::default();
        for transport in &self.transports {
            match transport.send(alert).await {
                Ok(()) => {
                    tracing::info!(transport = transport.name(), "alert delivered");
                    summary.delivered.push(transport.name());
                }
                Err(e) => {
                    tracing::error!(
                        transport = transport.name(),
                        subject = %alert.subject,
                        "alert delivery failed: {e}"
                    );
                    summary.failed.push(transport.name());
                }
            }
        }
        summary
    }
}
