use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use secrecy::ExposeSecret;
use std::sync::Mutex;
use std::time::Duration;
use uuid::Uuid;

use crate::config::SmtpConfig;

/// Outbound messages emitted by the onboarding and login flows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    RequestReceived {
        email: String,
        full_name: String,
        family_name: String,
        request_id: Uuid,
    },
    RequestApproved {
        email: String,
        family_name: String,
    },
    RequestRejected {
        email: String,
        family_name: String,
        reason: String,
    },
    MagicLink {
        email: String,
        token: String,
        link: String,
    },
}

impl Notification {
    pub fn recipient(&self) -> &str {
        match self {
            Notification::RequestReceived { email, .. }
            | Notification::RequestApproved { email, .. }
            | Notification::RequestRejected { email, .. }
            | Notification::MagicLink { email, .. } => email,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Notification::RequestReceived { .. } => "request_received",
            Notification::RequestApproved { .. } => "request_approved",
            Notification::RequestRejected { .. } => "request_rejected",
            Notification::MagicLink { .. } => "magic_link",
        }
    }

    pub fn subject(&self) -> String {
        match self {
            Notification::RequestReceived { family_name, .. } => {
                format!("We received your request for the {} family", family_name)
            }
            Notification::RequestApproved { family_name, .. } => {
                format!("Your {} family is ready", family_name)
            }
            Notification::RequestRejected { family_name, .. } => {
                format!("Update on your request for the {} family", family_name)
            }
            Notification::MagicLink { .. } => "Your sign-in link".to_string(),
        }
    }

    pub fn body(&self) -> String {
        match self {
            Notification::RequestReceived {
                full_name,
                family_name,
                request_id,
                ..
            } => format!(
                "Hello {},\n\nYour request to administer the {} family has been received and is \
                 awaiting review.\n\nRequest id: {}\nYou can check its status at any time.",
                full_name, family_name, request_id
            ),
            Notification::RequestApproved { family_name, .. } => format!(
                "Your request was approved. You can now sign in as the administrator of the {} \
                 family with the password you registered.",
                family_name
            ),
            Notification::RequestRejected {
                family_name,
                reason,
                ..
            } => format!(
                "Your request to administer the {} family was not approved.\n\nReason: {}",
                family_name, reason
            ),
            Notification::MagicLink { link, .. } => format!(
                "Use the link below to sign in. It can be used once and expires shortly.\n\n{}",
                link
            ),
        }
    }
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, notification: &Notification) -> Result<(), anyhow::Error>;
}

/// Deliver `notification`, logging instead of failing. Notifications never
/// change the outcome of the operation that emitted them.
pub async fn notify_best_effort(notifier: &dyn Notifier, notification: Notification) {
    match notifier.notify(&notification).await {
        Ok(()) => crate::services::metrics::record_notification(notification.kind(), true),
        Err(e) => {
            crate::services::metrics::record_notification(notification.kind(), false);
            tracing::warn!(
                error = %e,
                kind = notification.kind(),
                "Failed to deliver notification"
            );
        }
    }
}

#[derive(Clone)]
pub struct SmtpNotifier {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpNotifier {
    pub fn new(config: &SmtpConfig) -> Result<Self, anyhow::Error> {
        let creds = Credentials::new(
            config.user.clone(),
            config.password.expose_secret().to_string(),
        );

        let mailer = AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)
            .map_err(|e| anyhow::anyhow!("Invalid SMTP relay {}: {}", config.host, e))?
            .credentials(creds)
            .timeout(Some(Duration::from_secs(10)))
            .build();

        let from = config
            .from
            .parse()
            .map_err(|e: lettre::address::AddressError| anyhow::anyhow!("Invalid SMTP_FROM: {}", e))?;

        tracing::info!(host = %config.host, "SMTP notifier initialized");

        Ok(Self { mailer, from })
    }
}

#[async_trait]
impl Notifier for SmtpNotifier {
    async fn notify(&self, notification: &Notification) -> Result<(), anyhow::Error> {
        let to: Mailbox = notification
            .recipient()
            .parse()
            .map_err(|e: lettre::address::AddressError| anyhow::anyhow!(e))?;

        let message = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(notification.subject())
            .header(ContentType::TEXT_PLAIN)
            .body(notification.body())?;

        self.mailer
            .send(message)
            .await
            .map_err(|e| anyhow::anyhow!("SMTP send failed: {}", e))?;

        tracing::info!(kind = notification.kind(), "Notification sent");
        Ok(())
    }
}

/// Writes notifications to the log. Magic-link tokens are not logged.
#[derive(Clone, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, notification: &Notification) -> Result<(), anyhow::Error> {
        tracing::info!(
            kind = notification.kind(),
            subject = %notification.subject(),
            "Notification (log only)"
        );
        Ok(())
    }
}

/// Records every notification; optionally fails each delivery.
#[derive(Default)]
pub struct MockNotifier {
    pub sent: Mutex<Vec<Notification>>,
    pub fail: bool,
}

impl MockNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn sent(&self) -> Vec<Notification> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }

    /// Raw token from the most recent magic link sent to `email`.
    pub fn last_magic_link_token(&self, email: &str) -> Option<String> {
        self.sent().into_iter().rev().find_map(|n| match n {
            Notification::MagicLink {
                email: to, token, ..
            } if to == email => Some(token),
            _ => None,
        })
    }
}

#[async_trait]
impl Notifier for MockNotifier {
    async fn notify(&self, notification: &Notification) -> Result<(), anyhow::Error> {
        self.sent
            .lock()
            .map_err(|e| anyhow::anyhow!("Mock notifier mutex poisoned: {}", e))?
            .push(notification.clone());
        if self.fail {
            return Err(anyhow::anyhow!("mock delivery failure"));
        }
        Ok(())
    }
}
