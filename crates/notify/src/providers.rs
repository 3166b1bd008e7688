//! Tenant-scoped notification provider records.
//!
//! Secrets are sealed with the [`CredentialCipher`] before every write and
//! only opened into an [`UnsealedProvider`] for the caller about to deliver.

use std::sync::Arc;

use herald_core::crypto::CredentialCipher;
use herald_core::error::CoreError;
use herald_core::notification::ChannelKind;
use herald_core::provider_config::{ConfigCheck, ProviderConfig};
use herald_core::types::DbId;
use herald_db::models::provider::{CreateProvider, NotificationProvider, ReplaceProvider};
use herald_db::Datastore;

const ENTITY: &str = "NotificationProvider";

/// A provider with its configuration decrypted.
///
/// `provider.config` holds the decrypted document; `config` is the same data
/// typed. Neither is ever written back.
#[derive(Clone)]
pub struct UnsealedProvider {
    pub provider: NotificationProvider,
    pub config: ProviderConfig,
}

impl std::fmt::Debug for UnsealedProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UnsealedProvider")
            .field("id", &self.provider.id)
            .field("kind", &self.provider.kind)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// CRUD, soft-delete and configuration checks for providers.
pub struct ProviderService {
    store: Arc<dyn Datastore>,
    cipher: CredentialCipher,
}

impl ProviderService {
    pub fn new(store: Arc<dyn Datastore>, cipher: CredentialCipher) -> Self {
        Self { store, cipher }
    }

    /// Create an active provider from a plaintext configuration document.
    pub async fn create(
        &self,
        tenant_id: DbId,
        name: &str,
        kind: ChannelKind,
        config: &serde_json::Value,
        actor: DbId,
    ) -> Result<NotificationProvider, CoreError> {
        let sealed = self.seal(kind, config)?;
        let provider = self
            .store
            .create_provider(&CreateProvider {
                tenant_id,
                name: name.to_string(),
                kind,
                config: sealed,
                created_by: actor,
            })
            .await?;

        tracing::info!(provider_id = %provider.id, %tenant_id, %kind, "Notification provider created");
        Ok(provider)
    }

    /// The stored row, secrets still encrypted.
    pub async fn get(&self, id: DbId) -> Result<NotificationProvider, CoreError> {
        self.store
            .find_provider(id)
            .await?
            .ok_or(CoreError::NotFound { entity: ENTITY, id })
    }

    /// The stored row with its secrets decrypted in the returned copy.
    pub async fn get_decrypted(&self, id: DbId) -> Result<UnsealedProvider, CoreError> {
        let provider = self.get(id).await?;
        self.unseal(provider)
    }

    /// Non-deleted providers of a tenant, secrets still encrypted.
    pub async fn list_by_tenant(
        &self,
        tenant_id: DbId,
    ) -> Result<Vec<NotificationProvider>, CoreError> {
        Ok(self.store.list_providers_by_tenant(tenant_id).await?)
    }

    /// The tenant's newest active provider of `kind`, decrypted.
    pub async fn active_for_kind(
        &self,
        tenant_id: DbId,
        kind: ChannelKind,
    ) -> Result<Option<UnsealedProvider>, CoreError> {
        match self.store.find_active_provider_by_kind(tenant_id, kind).await? {
            Some(provider) => self.unseal(provider).map(Some),
            None => Ok(None),
        }
    }

    /// Overwrite every mutable field, re-encrypting the configuration.
    pub async fn update(
        &self,
        id: DbId,
        name: &str,
        kind: ChannelKind,
        config: &serde_json::Value,
        is_active: bool,
        actor: DbId,
    ) -> Result<NotificationProvider, CoreError> {
        let sealed = self.seal(kind, config)?;
        let provider = self
            .store
            .replace_provider(
                id,
                &ReplaceProvider {
                    name: name.to_string(),
                    kind,
                    config: sealed,
                    is_active,
                    updated_by: actor,
                },
            )
            .await?
            .ok_or(CoreError::NotFound { entity: ENTITY, id })?;

        tracing::info!(provider_id = %id, %kind, is_active, "Notification provider updated");
        Ok(provider)
    }

    /// Soft-delete a provider. Deleting it again is `NotFound`.
    pub async fn delete(&self, id: DbId, actor: DbId) -> Result<(), CoreError> {
        if !self.store.soft_delete_provider(id, actor).await? {
            return Err(CoreError::NotFound { entity: ENTITY, id });
        }
        tracing::info!(provider_id = %id, actor = %actor, "Notification provider deleted");
        Ok(())
    }

    /// Check that the stored configuration carries every required field.
    ///
    /// Only datastore and decryption failures are errors; an incomplete or
    /// malformed document is reported in the returned [`ConfigCheck`].
    pub async fn test_config(&self, id: DbId) -> Result<ConfigCheck, CoreError> {
        let provider = self.get(id).await?;
        let Ok(sealed) = ProviderConfig::parse(provider.kind, &provider.config) else {
            return Ok(ConfigCheck {
                valid: false,
                message: "invalid configuration format".to_string(),
            });
        };
        let opened = sealed.decrypt_secrets(&self.cipher)?;
        Ok(opened.check())
    }

    fn seal(
        &self,
        kind: ChannelKind,
        config: &serde_json::Value,
    ) -> Result<serde_json::Value, CoreError> {
        let parsed = ProviderConfig::parse(kind, config)?;
        Ok(parsed.encrypt_secrets(&self.cipher)?.to_document())
    }

    fn unseal(&self, mut provider: NotificationProvider) -> Result<UnsealedProvider, CoreError> {
        let sealed = ProviderConfig::parse(provider.kind, &provider.config).map_err(|_| {
            CoreError::Configuration(format!(
                "stored configuration of provider {} is unreadable",
                provider.id
            ))
        })?;
        let config = sealed.decrypt_secrets(&self.cipher)?;
        provider.config = config.to_document();
        Ok(UnsealedProvider { provider, config })
    }
}
