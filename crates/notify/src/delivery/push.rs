//! Push dispatch to member devices, with one long-lived client per tenant.
//!
//! Clients are created lazily from the tenant's newest active PUSH provider
//! and then reused until [`PushDispatcher::forget_tenant`] drops them, which
//! the provider endpoints do whenever a PUSH provider changes.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use herald_core::error::CoreError;
use herald_core::notification::ChannelKind;
use herald_core::provider_config::{ProviderConfig, PushConfig};
use herald_core::types::DbId;
use herald_core::validation::validate_device_token;
use herald_db::models::notification_log::{CreateNotificationLog, NotificationLog};
use herald_db::Datastore;
use serde::Serialize;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;

use super::{finalize, mark_failed, mark_sent, run_with_retry, RetryOutcome, RetryPolicy, SendError};
use crate::providers::ProviderService;

/// Error message returned when the push service rejects a device token.
pub const INVALID_TOKEN_MESSAGE: &str = "device token is invalid or unregistered";

// ---------------------------------------------------------------------------
// Client seam
// ---------------------------------------------------------------------------

/// Notification content shared by every target of one dispatch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PushMessage {
    pub title: String,
    pub body: String,
    pub data: HashMap<String, String>,
}

/// A connected push service client.
#[async_trait]
pub trait PushClient: Send + Sync {
    async fn send(&self, token: &str, message: &PushMessage) -> Result<(), SendError>;

    /// Send to every token, reporting one result per token in input order.
    async fn send_each(
        &self,
        tokens: &[String],
        message: &PushMessage,
    ) -> Vec<Result<(), SendError>> {
        futures::future::join_all(tokens.iter().map(|token| self.send(token, message))).await
    }
}

/// Builds a [`PushClient`] from decrypted provider settings.
#[async_trait]
pub trait PushConnector: Send + Sync {
    async fn connect(&self, config: &PushConfig) -> Result<Arc<dyn PushClient>, CoreError>;
}

#[derive(Clone)]
struct TenantClient {
    provider_id: DbId,
    client: Arc<dyn PushClient>,
    secrets: Arc<Vec<String>>,
}

// ---------------------------------------------------------------------------
// Fan-out report
// ---------------------------------------------------------------------------

/// Per-device outcome of a fan-out dispatch.
#[derive(Debug, Clone, Serialize)]
pub struct FanOutReport {
    pub logs: Vec<NotificationLog>,
    pub success_count: usize,
    pub failure_count: usize,
}

// ---------------------------------------------------------------------------
// Dispatcher
// ---------------------------------------------------------------------------

pub struct PushDispatcher {
    store: Arc<dyn Datastore>,
    providers: Arc<ProviderService>,
    connector: Arc<dyn PushConnector>,
    clients: RwLock<HashMap<DbId, TenantClient>>,
}

impl PushDispatcher {
    pub fn new(
        store: Arc<dyn Datastore>,
        providers: Arc<ProviderService>,
        connector: Arc<dyn PushConnector>,
    ) -> Self {
        Self {
            store,
            providers,
            connector,
            clients: RwLock::new(HashMap::new()),
        }
    }

    /// Send to one device token with a single attempt.
    ///
    /// A token the push service reports as invalid is deactivated for every
    /// member before the error is returned.
    pub async fn send_to_token(
        &self,
        member_id: DbId,
        tenant_id: DbId,
        token: &str,
        message: &PushMessage,
        cancel: &CancellationToken,
    ) -> Result<NotificationLog, CoreError> {
        validate_device_token(token)?;
        let tenant_client = self.client_for(tenant_id).await?;
        let log = self
            .create_log(member_id, tenant_client.provider_id, token, message)
            .await?;

        let client = tenant_client.client.as_ref();
        let secrets = tenant_client.secrets.as_slice();
        let outcome = run_with_retry(RetryPolicy::ONCE, cancel, move |_| async move {
            client
                .send(token, message)
                .await
                .map_err(|e| e.scrubbed(secrets))
        })
        .await;

        match outcome {
            RetryOutcome::Exhausted { last_error, .. } if last_error.is_invalid_token() => {
                self.deactivate(token).await;
                mark_failed(self.store.as_ref(), log.id, &last_error.to_string()).await?;
                Err(CoreError::validation(INVALID_TOKEN_MESSAGE))
            }
            outcome => {
                let delivered = matches!(outcome, RetryOutcome::Delivered { .. });
                let log = finalize(self.store.as_ref(), log.id, outcome).await?;
                if delivered {
                    self.touch(member_id, token).await;
                }
                Ok(log)
            }
        }
    }

    /// Send to every active device of a member.
    ///
    /// Each device gets its own log row finalized independently; per-device
    /// failures are reported, not returned as errors.
    pub async fn send_to_member(
        &self,
        member_id: DbId,
        tenant_id: DbId,
        message: &PushMessage,
        cancel: &CancellationToken,
    ) -> Result<FanOutReport, CoreError> {
        let devices = self.store.list_active_device_tokens(member_id).await?;
        if devices.is_empty() {
            return Err(CoreError::NoDevices(member_id));
        }

        let tenant_client = self.client_for(tenant_id).await?;
        let tokens: Vec<String> = devices.into_iter().map(|d| d.device_token).collect();

        let mut pending = Vec::with_capacity(tokens.len());
        for token in &tokens {
            pending.push(
                self.create_log(member_id, tenant_client.provider_id, token, message)
                    .await?,
            );
        }

        if cancel.is_cancelled() {
            return Err(CoreError::Cancelled(
                "fan-out cancelled before sending".to_string(),
            ));
        }

        let results = tenant_client.client.send_each(&tokens, message).await;

        let mut report = FanOutReport {
            logs: Vec::with_capacity(pending.len()),
            success_count: 0,
            failure_count: 0,
        };
        for ((log, token), result) in pending.into_iter().zip(&tokens).zip(results) {
            let finalized = match result {
                Ok(()) => {
                    report.success_count += 1;
                    self.touch(member_id, token).await;
                    mark_sent(self.store.as_ref(), log.id).await?
                }
                Err(e) => {
                    report.failure_count += 1;
                    let e = e.scrubbed(&tenant_client.secrets);
                    if e.is_invalid_token() {
                        self.deactivate(token).await;
                    }
                    mark_failed(self.store.as_ref(), log.id, &e.to_string()).await?
                }
            };
            report.logs.push(finalized);
        }

        tracing::info!(
            %member_id,
            %tenant_id,
            success = report.success_count,
            failure = report.failure_count,
            "Push fan-out finished"
        );
        Ok(report)
    }

    /// Drop the tenant's cached client so the next send reconnects from the
    /// current provider rows. Returns whether a client was held.
    pub async fn forget_tenant(&self, tenant_id: DbId) -> bool {
        let dropped = self.clients.write().await.remove(&tenant_id);
        if let Some(entry) = &dropped {
            tracing::info!(%tenant_id, provider_id = %entry.provider_id, "Push client dropped");
        }
        dropped.is_some()
    }

    /// The tenant's client, connecting on first use.
    async fn client_for(&self, tenant_id: DbId) -> Result<TenantClient, CoreError> {
        {
            let clients = self.clients.read().await;
            if let Some(existing) = clients.get(&tenant_id) {
                return Ok(existing.clone());
            }
        }

        let mut clients = self.clients.write().await;
        if let Some(existing) = clients.get(&tenant_id) {
            return Ok(existing.clone());
        }

        let unsealed = self
            .providers
            .active_for_kind(tenant_id, ChannelKind::Push)
            .await?
            .ok_or_else(|| {
                CoreError::configuration(format!("tenant {tenant_id} has no active PUSH provider"))
            })?;
        let ProviderConfig::Push(config) = &unsealed.config else {
            return Err(CoreError::configuration(format!(
                "provider {} does not carry a PUSH configuration",
                unsealed.provider.id
            )));
        };
        if let Some(field) = unsealed.config.first_missing_field() {
            return Err(CoreError::configuration(format!(
                "PUSH configuration incomplete, missing field: {field}"
            )));
        }

        let client = self.connector.connect(config).await?;
        let entry = TenantClient {
            provider_id: unsealed.provider.id,
            client,
            secrets: Arc::new(unsealed.config.secret_values()),
        };
        clients.insert(tenant_id, entry.clone());
        tracing::info!(%tenant_id, provider_id = %entry.provider_id, "Push client created");
        Ok(entry)
    }

    async fn create_log(
        &self,
        member_id: DbId,
        provider_id: DbId,
        token: &str,
        message: &PushMessage,
    ) -> Result<NotificationLog, CoreError> {
        Ok(self
            .store
            .create_log(&CreateNotificationLog {
                member_id,
                provider_id,
                channel: ChannelKind::Push,
                recipient_email: None,
                recipient_name: None,
                recipient_phone: None,
                device_token: Some(token.to_string()),
                subject: Some(message.title.clone()),
                body: message.body.clone(),
            })
            .await?)
    }

    async fn deactivate(&self, token: &str) {
        match self.store.deactivate_device_token(token).await {
            Ok(count) => tracing::info!(deactivated = count, "Invalid device token deactivated"),
            Err(e) => tracing::warn!(error = %e, "Failed to deactivate invalid device token"),
        }
    }

    async fn touch(&self, member_id: DbId, token: &str) {
        if let Err(e) = self.store.touch_device_token(member_id, token).await {
            tracing::warn!(%member_id, error = %e, "Failed to record device token use");
        }
    }
}
