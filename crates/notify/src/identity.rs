//! API-key identity resolution with a read-through TTL cache.
//!
//! Entries are keyed by the SHA-256 hash of the presented key, so plaintext
//! keys are never held in memory beyond the request that carried them. An
//! entry is never returned once its expiry has passed; it is evicted by the
//! lookup that finds it stale.
//!
//! Revoking or regenerating a key does not touch the cache: a previously
//! resolved key keeps working until its entry expires. Deleting a member
//! evicts its entries through [`IdentityCache::evict_member`].

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use herald_core::api_keys::hash_api_key;
use herald_core::error::CoreError;
use herald_core::types::DbId;
use herald_db::models::member::Member;
use herald_db::models::tenant::Tenant;
use herald_db::Datastore;
use tokio::sync::RwLock;
use tokio::time::Instant;

/// Default time-to-live for a cached identity.
pub const DEFAULT_IDENTITY_TTL: Duration = Duration::from_secs(300);

/// A member resolved from an API key, with its tenant when it has one.
#[derive(Debug, Clone)]
pub struct ResolvedIdentity {
    pub member: Member,
    pub tenant: Option<Tenant>,
}

struct CachedIdentity {
    identity: ResolvedIdentity,
    expires_at: Instant,
}

/// Resolves API keys to identities, memoizing successful lookups.
pub struct IdentityCache {
    store: Arc<dyn Datastore>,
    ttl: Duration,
    entries: RwLock<HashMap<String, CachedIdentity>>,
}

impl IdentityCache {
    pub fn new(store: Arc<dyn Datastore>, ttl: Duration) -> Self {
        Self {
            store,
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Resolve an API key to its member and optional tenant.
    ///
    /// Concurrent misses for the same key may both reach the datastore; the
    /// last one to finish wins the cache slot.
    pub async fn resolve(&self, api_key: &str) -> Result<ResolvedIdentity, CoreError> {
        if api_key.is_empty() {
            return Err(CoreError::unauthorized("missing credential"));
        }

        let key_hash = hash_api_key(api_key);
        if let Some(identity) = self.lookup(&key_hash).await {
            return Ok(identity);
        }

        let member = self
            .store
            .find_active_member_by_api_key_hash(&key_hash)
            .await?
            .ok_or_else(|| CoreError::unauthorized("invalid credential"))?;

        let tenant = match member.tenant_id {
            Some(tenant_id) => {
                let tenant = self.store.find_tenant(tenant_id).await?;
                if tenant.is_none() {
                    tracing::debug!(member_id = %member.id, %tenant_id, "Member tenant not found");
                }
                tenant
            }
            None => None,
        };

        let identity = ResolvedIdentity { member, tenant };
        self.entries.write().await.insert(
            key_hash,
            CachedIdentity {
                identity: identity.clone(),
                expires_at: Instant::now() + self.ttl,
            },
        );
        Ok(identity)
    }

    /// Drop every entry resolved for the member. Returns how many were held.
    pub async fn evict_member(&self, member_id: DbId) -> usize {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| entry.identity.member.id != member_id);
        before - entries.len()
    }

    /// Number of entries currently held, live or stale.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    async fn lookup(&self, key_hash: &str) -> Option<ResolvedIdentity> {
        {
            let entries = self.entries.read().await;
            match entries.get(key_hash) {
                None => return None,
                Some(entry) if Instant::now() < entry.expires_at => {
                    return Some(entry.identity.clone());
                }
                Some(_) => {}
            }
        }

        // Stale: evict unless a concurrent resolve already refreshed it.
        let mut entries = self.entries.write().await;
        if entries
            .get(key_hash)
            .is_some_and(|entry| Instant::now() >= entry.expires_at)
        {
            entries.remove(key_hash);
        }
        None
    }
}
