//! HTML email dispatch over SMTP.

use std::sync::Arc;

use async_trait::async_trait;
use herald_core::error::CoreError;
use herald_core::notification::ChannelKind;
use herald_core::provider_config::{ProviderConfig, SmtpConfig};
use herald_core::types::DbId;
use herald_db::models::notification_log::{CreateNotificationLog, NotificationLog};
use herald_db::Datastore;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tokio_util::sync::CancellationToken;

use super::{finalize, load_provider, mark_failed, run_with_retry, RetryPolicy, SendError};
use crate::providers::ProviderService;

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

/// Error type for a single SMTP submission.
#[derive(Debug, thiserror::Error)]
pub enum EmailError {
    /// SMTP transport-level failure (authentication, connection, etc.).
    #[error("SMTP transport error: {0}")]
    Transport(#[from] lettre::transport::smtp::Error),

    /// The recipient or sender address could not be parsed.
    #[error("Email address parse error: {0}")]
    Address(#[from] lettre::address::AddressError),

    /// The MIME message could not be assembled.
    #[error("Email build error: {0}")]
    Build(String),
}

impl From<EmailError> for SendError {
    fn from(e: EmailError) -> Self {
        SendError::Failed(e.to_string())
    }
}

// ---------------------------------------------------------------------------
// Transport
// ---------------------------------------------------------------------------

/// One HTML message ready for submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingEmail {
    pub from: String,
    pub to: String,
    pub to_name: Option<String>,
    pub subject: String,
    pub html_body: String,
}

/// Submits a message to an SMTP relay described by a provider configuration.
#[async_trait]
pub trait EmailTransport: Send + Sync {
    async fn send(&self, config: &SmtpConfig, email: &OutgoingEmail) -> Result<(), SendError>;
}

/// [`EmailTransport`] backed by `lettre`'s async SMTP client.
///
/// A fresh connection is opened per submission.
#[derive(Debug, Default, Clone, Copy)]
pub struct LettreTransport;

impl LettreTransport {
    pub fn build_message(email: &OutgoingEmail) -> Result<Message, EmailError> {
        let to = Mailbox::new(email.to_name.clone(), email.to.parse()?);
        Message::builder()
            .from(email.from.parse()?)
            .to(to)
            .subject(email.subject.clone())
            .header(ContentType::TEXT_HTML)
            .body(email.html_body.clone())
            .map_err(|e| EmailError::Build(e.to_string()))
    }

    fn build_mailer(config: &SmtpConfig) -> Result<AsyncSmtpTransport<Tokio1Executor>, EmailError> {
        let host = config.host.as_deref().unwrap_or_default();
        let mut builder = if config.use_tls {
            AsyncSmtpTransport::<Tokio1Executor>::relay(host)?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)?
        };
        if let Some(port) = config.port {
            builder = builder.port(port);
        }
        if let (Some(user), Some(pass)) = (&config.username, &config.password) {
            builder = builder.credentials(Credentials::new(user.clone(), pass.clone()));
        }
        Ok(builder.build())
    }
}

#[async_trait]
impl EmailTransport for LettreTransport {
    async fn send(&self, config: &SmtpConfig, email: &OutgoingEmail) -> Result<(), SendError> {
        let message = Self::build_message(email)?;
        let mailer = Self::build_mailer(config)?;
        mailer.send(message).await.map_err(EmailError::from)?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Dispatcher
// ---------------------------------------------------------------------------

/// An email dispatch request.
#[derive(Debug, Clone)]
pub struct EmailRequest {
    pub recipient_email: String,
    pub recipient_name: Option<String>,
    pub subject: String,
    pub body: String,
}

/// Sends email through a member-chosen SMTP provider and records the outcome.
pub struct EmailDispatcher {
    store: Arc<dyn Datastore>,
    providers: Arc<ProviderService>,
    transport: Arc<dyn EmailTransport>,
    policy: RetryPolicy,
}

impl EmailDispatcher {
    pub fn new(
        store: Arc<dyn Datastore>,
        providers: Arc<ProviderService>,
        transport: Arc<dyn EmailTransport>,
    ) -> Self {
        Self {
            store,
            providers,
            transport,
            policy: RetryPolicy::SMTP,
        }
    }

    /// Send one HTML email and return its finalized log row.
    ///
    /// An incomplete SMTP configuration fails fast: the log row is written
    /// `FAILED` and no attempt is made.
    pub async fn send_email(
        &self,
        member_id: DbId,
        provider_id: DbId,
        request: &EmailRequest,
        cancel: &CancellationToken,
    ) -> Result<NotificationLog, CoreError> {
        if request.recipient_email.trim().is_empty() {
            return Err(CoreError::validation("recipient email must not be empty"));
        }

        let unsealed = load_provider(&self.providers, provider_id, ChannelKind::Smtp).await?;
        let ProviderConfig::Smtp(smtp) = &unsealed.config else {
            return Err(CoreError::configuration(format!(
                "provider {provider_id} does not carry an SMTP configuration"
            )));
        };

        let log = self
            .store
            .create_log(&CreateNotificationLog {
                member_id,
                provider_id,
                channel: ChannelKind::Smtp,
                recipient_email: Some(request.recipient_email.clone()),
                recipient_name: request.recipient_name.clone(),
                recipient_phone: None,
                device_token: None,
                subject: Some(request.subject.clone()),
                body: request.body.clone(),
            })
            .await?;

        if let Some(field) = unsealed.config.first_missing_field() {
            let message = format!("missing field: {field}");
            mark_failed(self.store.as_ref(), log.id, &message).await?;
            tracing::warn!(log_id = %log.id, %provider_id, field, "SMTP configuration incomplete");
            return Err(CoreError::validation(format!(
                "SMTP configuration incomplete, {message}"
            )));
        }

        let email = OutgoingEmail {
            from: smtp.from.clone().unwrap_or_default(),
            to: request.recipient_email.clone(),
            to_name: request.recipient_name.clone().filter(|n| !n.is_empty()),
            subject: request.subject.clone(),
            html_body: request.body.clone(),
        };
        let secrets = unsealed.config.secret_values();

        let transport = self.transport.as_ref();
        let (email, secrets) = (&email, &secrets);
        let outcome = run_with_retry(self.policy, cancel, move |_| async move {
            transport
                .send(smtp, email)
                .await
                .map_err(|e| e.scrubbed(secrets))
        })
        .await;

        finalize(self.store.as_ref(), log.id, outcome).await
    }
}
