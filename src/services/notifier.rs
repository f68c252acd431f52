//! Fire-and-forget delivery of credential notices.
//!
//! Requests only enqueue; a single worker task drains the queue, so a slow or
//! failing transport never touches the request path.

use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::config::MailConfig;

pub const DEFAULT_QUEUE_CAPACITY: usize = 256;

const SUBJECT: &str = "Your SmartAsset account credentials";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    AccountCreated,
    PasswordReset,
}

#[derive(Clone, PartialEq, Eq)]
pub struct CredentialNotice {
    pub kind: NoticeKind,
    pub to: String,
    pub name: String,
    pub temp_password: String,
}

impl std::fmt::Debug for CredentialNotice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialNotice")
            .field("kind", &self.kind)
            .field("to", &self.to)
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl CredentialNotice {
    #[must_use]
    pub fn body(&self) -> String {
        let opening = match self.kind {
            NoticeKind::AccountCreated => "Your SmartAsset account is ready.",
            NoticeKind::PasswordReset => "Your SmartAsset password has been reset.",
        };
        format!(
            "Hi {},\n\n{opening}\n\nTemporary password: {}\n\n\
             Login and you will be asked to set a new password on first sign-in.\n\n\
             Regards,\nSmartAsset Admin\n",
            self.name, self.temp_password
        )
    }
}

#[async_trait]
pub trait MailTransport: Send + Sync {
    async fn deliver(&self, notice: &CredentialNotice) -> Result<()>;
}

/// Records deliveries in the log. Message bodies, and so passwords, are never logged.
pub struct LogTransport {
    config: MailConfig,
}

impl LogTransport {
    #[must_use]
    pub const fn new(config: MailConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl MailTransport for LogTransport {
    async fn deliver(&self, notice: &CredentialNotice) -> Result<()> {
        if !self.config.is_configured() {
            debug!(to = %notice.to, "Mail transport not configured, skipping credential notice");
            return Ok(());
        }

        info!(
            event = "credential_notice_recorded",
            to = %notice.to,
            from = self.config.sender().unwrap_or_default(),
            subject = SUBJECT,
            kind = ?notice.kind,
            body_bytes = notice.body().len(),
            "Credential notice recorded (log-only transport)"
        );
        Ok(())
    }
}

#[derive(Clone)]
pub struct Notifier {
    tx: mpsc::Sender<CredentialNotice>,
}

impl Notifier {
    /// Spawns the delivery worker on the current runtime.
    #[must_use]
    pub fn spawn(transport: Arc<dyn MailTransport>, capacity: usize) -> Self {
        let (tx, mut rx) = mpsc::channel::<CredentialNotice>(capacity.max(1));

        tokio::spawn(async move {
            while let Some(notice) = rx.recv().await {
                if let Err(e) = transport.deliver(&notice).await {
                    error!(
                        event = "credential_notice_failed",
                        to = %notice.to,
                        error = %e,
                        "Failed to deliver credential notice"
                    );
                }
            }
            debug!("Credential notice worker stopped");
        });

        Self { tx }
    }

    #[must_use]
    pub fn with_mail_config(config: MailConfig) -> Self {
        Self::spawn(Arc::new(LogTransport::new(config)), DEFAULT_QUEUE_CAPACITY)
    }

    /// Queues notices without waiting. A full or closed queue drops the notice with a warning.
    pub fn enqueue(&self, notices: impl IntoIterator<Item = CredentialNotice>) {
        for notice in notices {
            if let Err(e) = self.tx.try_send(notice) {
                warn!(error = %e, "Credential notice dropped");
            }
        }
    }
}
