use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use ulid::Ulid;

use crate::model::{Appointment, Session, UserId};

/// Who a notification mail is addressed to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recipient {
    pub user: Option<UserId>,
    pub email: String,
}

impl Recipient {
    pub fn internal(user: UserId, email: impl Into<String>) -> Self {
        Self {
            user: Some(user),
            email: email.into(),
        }
    }

    pub fn external(email: impl Into<String>) -> Self {
        Self {
            user: None,
            email: email.into(),
        }
    }
}

/// A rendered notification mail, ready to hand to the sender.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mail {
    pub id: Ulid,
    pub recipient: Recipient,
    pub subject: String,
    pub body: String,
}

impl Mail {
    pub fn new(recipient: Recipient, subject: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            id: Ulid::new(),
            recipient,
            subject: subject.into(),
            body: body.into(),
        }
    }
}

#[derive(Debug)]
pub enum MailError {
    /// Composing the notification document failed (missing localization,
    /// malformed recipient data, ...).
    Compose(String),
    /// Handing the mail to the transport failed.
    Transport(String),
}

impl std::fmt::Display for MailError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MailError::Compose(e) => write!(f, "compose failed: {e}"),
            MailError::Transport(e) => write!(f, "transport failed: {e}"),
        }
    }
}

impl std::error::Error for MailError {}

/// Renders notification mails for one change. Implementations own recipient
/// computation, subject/body rendering and i18n — the pool never looks inside.
#[async_trait]
pub trait MailGenerator: Send {
    /// All recipients this change should notify.
    fn recipients(&self) -> Vec<Recipient>;

    /// Render a "new appointment" mail. `None` means this recipient gets
    /// nothing (e.g. the actor themselves).
    async fn create_mail_for(&self, recipient: &Recipient) -> Result<Option<Mail>, MailError>;

    /// Render a "changed appointment" mail. `None` means skip.
    async fn update_mail_for(&self, recipient: &Recipient) -> Result<Option<Mail>, MailError>;

    /// Merged-digest mode: no single actor caused this change, so the
    /// rendered mails must omit actor attribution.
    fn suppress_actor_attribution(&mut self);
}

/// Builds a [`MailGenerator`] for one (before, after) pair.
#[async_trait]
pub trait MailGeneratorFactory: Send + Sync {
    async fn create(
        &self,
        before: Option<&Appointment>,
        after: &Appointment,
        session: &Session,
        on_behalf_of: UserId,
    ) -> Result<Box<dyn MailGenerator>, MailError>;
}

/// Transport boundary. Fire-and-forget from the pool's perspective: failures
/// are logged and swallowed upstream.
#[async_trait]
pub trait MailSender: Send + Sync {
    async fn send_mail(&self, mail: Mail, session: &Session) -> Result<(), MailError>;
}
