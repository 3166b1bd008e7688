use std::sync::Arc;
use std::time::Duration;

use herald_core::crypto::CredentialCipher;
use herald_db::{Datastore, DbPool};
use herald_notify::{
    EmailDispatcher, EmailTransport, IdentityCache, ProviderService, PushConnector,
    PushDispatcher, SmsDispatcher, SmsTransport,
};
use tokio_util::sync::CancellationToken;

use crate::config::ServerConfig;

/// Outbound transports the dispatchers deliver through.
#[derive(Clone)]
pub struct Transports {
    pub email: Arc<dyn EmailTransport>,
    pub sms: Arc<dyn SmsTransport>,
    pub push: Arc<dyn PushConnector>,
}

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheap to clone; every service sits behind an `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// Datastore every service reads and writes through.
    pub store: Arc<dyn Datastore>,
    /// PostgreSQL pool, for health checks. `None` when running on an
    /// in-process store.
    pub pool: Option<DbPool>,
    pub config: Arc<ServerConfig>,
    pub identity: Arc<IdentityCache>,
    pub providers: Arc<ProviderService>,
    pub email: Arc<EmailDispatcher>,
    pub sms: Arc<SmsDispatcher>,
    pub push: Arc<PushDispatcher>,
    /// Cancelled on shutdown so in-flight retry loops stop between attempts.
    pub shutdown: CancellationToken,
}

impl AppState {
    /// Wire every service over one datastore.
    pub fn new(
        config: ServerConfig,
        store: Arc<dyn Datastore>,
        pool: Option<DbPool>,
        transports: Transports,
    ) -> Self {
        let cipher = CredentialCipher::from_secret(&config.encryption_key);
        let providers = Arc::new(ProviderService::new(store.clone(), cipher));
        let identity = Arc::new(IdentityCache::new(
            store.clone(),
            Duration::from_secs(config.api_key_cache_ttl_secs),
        ));

        Self {
            email: Arc::new(EmailDispatcher::new(
                store.clone(),
                providers.clone(),
                transports.email,
            )),
            sms: Arc::new(SmsDispatcher::new(
                store.clone(),
                providers.clone(),
                transports.sms,
            )),
            push: Arc::new(PushDispatcher::new(
                store.clone(),
                providers.clone(),
                transports.push,
            )),
            store,
            pool,
            config: Arc::new(config),
            identity,
            providers,
            shutdown: CancellationToken::new(),
        }
    }
}
