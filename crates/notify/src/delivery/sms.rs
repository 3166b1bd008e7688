//! SMS dispatch through a pluggable gateway.

use std::sync::Arc;

use async_trait::async_trait;
use herald_core::error::CoreError;
use herald_core::notification::ChannelKind;
use herald_core::provider_config::{ProviderConfig, SmsConfig};
use herald_core::types::DbId;
use herald_core::validation::{validate_phone_number, validate_sms_body};
use herald_db::models::notification_log::{CreateNotificationLog, NotificationLog};
use herald_db::Datastore;
use tokio_util::sync::CancellationToken;

use super::{finalize, load_provider, run_with_retry, RetryPolicy, SendError};
use crate::providers::ProviderService;

/// Sends one text message through the gateway account described by
/// `account`.
#[async_trait]
pub trait SmsTransport: Send + Sync {
    async fn send(
        &self,
        account: &SmsConfig,
        from: &str,
        to: &str,
        body: &str,
    ) -> Result<(), SendError>;
}

/// Gateway that accepts every message and only traces it.
///
/// Stands in until a real gateway is wired for the configured `provider`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingSmsTransport;

#[async_trait]
impl SmsTransport for LoggingSmsTransport {
    async fn send(
        &self,
        account: &SmsConfig,
        from: &str,
        to: &str,
        body: &str,
    ) -> Result<(), SendError> {
        tracing::info!(
            gateway = account.provider.as_deref().unwrap_or("unset"),
            from,
            to,
            chars = body.chars().count(),
            "SMS accepted by logging gateway"
        );
        Ok(())
    }
}

/// An SMS dispatch request.
#[derive(Debug, Clone)]
pub struct SmsRequest {
    pub recipient_phone: String,
    pub body: String,
}

/// Sends SMS through a member-chosen provider and records the outcome.
pub struct SmsDispatcher {
    store: Arc<dyn Datastore>,
    providers: Arc<ProviderService>,
    transport: Arc<dyn SmsTransport>,
    policy: RetryPolicy,
}

impl SmsDispatcher {
    pub fn new(
        store: Arc<dyn Datastore>,
        providers: Arc<ProviderService>,
        transport: Arc<dyn SmsTransport>,
    ) -> Self {
        Self {
            store,
            providers,
            transport,
            policy: RetryPolicy::SMS,
        }
    }

    /// Send one SMS and return its finalized log row.
    ///
    /// The phone number and body are validated before the datastore is
    /// touched, so invalid input leaves no log row behind.
    pub async fn send_sms(
        &self,
        member_id: DbId,
        provider_id: DbId,
        request: &SmsRequest,
        cancel: &CancellationToken,
    ) -> Result<NotificationLog, CoreError> {
        validate_phone_number(&request.recipient_phone)?;
        validate_sms_body(&request.body)?;

        let unsealed = load_provider(&self.providers, provider_id, ChannelKind::Sms).await?;
        let ProviderConfig::Sms(account) = &unsealed.config else {
            return Err(CoreError::configuration(format!(
                "provider {provider_id} does not carry an SMS configuration"
            )));
        };

        let log = self
            .store
            .create_log(&CreateNotificationLog {
                member_id,
                provider_id,
                channel: ChannelKind::Sms,
                recipient_email: None,
                recipient_name: None,
                recipient_phone: Some(request.recipient_phone.clone()),
                device_token: None,
                subject: None,
                body: request.body.clone(),
            })
            .await?;

        let secrets = unsealed.config.secret_values();
        let from = account.from_phone.as_deref().unwrap_or_default();
        let transport = self.transport.as_ref();
        let secrets = &secrets;
        let outcome = run_with_retry(self.policy, cancel, move |_| async move {
            transport
                .send(account, from, &request.recipient_phone, &request.body)
                .await
                .map_err(|e| e.scrubbed(secrets))
        })
        .await;

        finalize(self.store.as_ref(), log.id, outcome).await
    }
}
