//! PostgreSQL-backed [`Datastore`](crate::store::Datastore).

use async_trait::async_trait;
use herald_core::notification::{ChannelKind, DeviceKind};
use herald_core::types::{DbId, Timestamp};

use crate::models::device_token::DeviceToken;
use crate::models::member::{CreateMember, Member};
use crate::models::notification_log::{
    CreateNotificationLog, LogCounts, LogFilter, NotificationLog,
};
use crate::models::provider::{CreateProvider, NotificationProvider, ReplaceProvider};
use crate::models::tenant::{CreateTenant, Tenant};
use crate::repositories::{
    DeviceTokenRepo, MemberRepo, NotificationLogRepo, ProviderRepo, TenantRepo,
};
use crate::store::{
    DeviceTokenStore, MemberStore, NotificationLogStore, ProviderStore, StoreResult, TenantStore,
};
use crate::DbPool;

/// Delegates every store method to the matching repository.
#[derive(Clone)]
pub struct PgStore {
    pool: DbPool,
}

impl PgStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }
}

#[async_trait]
impl TenantStore for PgStore {
    async fn create_tenant(&self, input: &CreateTenant) -> StoreResult<Tenant> {
        Ok(TenantRepo::create(&self.pool, input).await?)
    }

    async fn find_tenant(&self, id: DbId) -> StoreResult<Option<Tenant>> {
        Ok(TenantRepo::find_by_id(&self.pool, id).await?)
    }
}

#[async_trait]
impl MemberStore for PgStore {
    async fn create_member(&self, input: &CreateMember) -> StoreResult<Member> {
        Ok(MemberRepo::create(&self.pool, input).await?)
    }

    async fn find_member(&self, id: DbId) -> StoreResult<Option<Member>> {
        Ok(MemberRepo::find_by_id(&self.pool, id).await?)
    }

    async fn list_members_by_tenant(&self, tenant_id: DbId) -> StoreResult<Vec<Member>> {
        Ok(MemberRepo::list_by_tenant(&self.pool, tenant_id).await?)
    }

    async fn find_member_by_email(&self, email: &str) -> StoreResult<Option<Member>> {
        Ok(MemberRepo::find_by_email(&self.pool, email).await?)
    }

    async fn find_active_member_by_api_key_hash(
        &self,
        api_key_hash: &str,
    ) -> StoreResult<Option<Member>> {
        Ok(MemberRepo::find_active_by_api_key_hash(&self.pool, api_key_hash).await?)
    }

    async fn set_member_api_key_hash(
        &self,
        id: DbId,
        api_key_hash: &str,
    ) -> StoreResult<Option<Member>> {
        Ok(MemberRepo::set_api_key_hash(&self.pool, id, api_key_hash).await?)
    }

    async fn soft_delete_member(&self, id: DbId) -> StoreResult<bool> {
        Ok(MemberRepo::soft_delete(&self.pool, id).await?)
    }
}

#[async_trait]
impl ProviderStore for PgStore {
    async fn create_provider(&self, input: &CreateProvider) -> StoreResult<NotificationProvider> {
        Ok(ProviderRepo::create(&self.pool, input).await?)
    }

    async fn find_provider(&self, id: DbId) -> StoreResult<Option<NotificationProvider>> {
        Ok(ProviderRepo::find_by_id(&self.pool, id).await?)
    }

    async fn list_providers_by_tenant(
        &self,
        tenant_id: DbId,
    ) -> StoreResult<Vec<NotificationProvider>> {
        Ok(ProviderRepo::list_by_tenant(&self.pool, tenant_id).await?)
    }

    async fn find_active_provider_by_kind(
        &self,
        tenant_id: DbId,
        kind: ChannelKind,
    ) -> StoreResult<Option<NotificationProvider>> {
        Ok(ProviderRepo::find_active_by_kind(&self.pool, tenant_id, kind).await?)
    }

    async fn replace_provider(
        &self,
        id: DbId,
        input: &ReplaceProvider,
    ) -> StoreResult<Option<NotificationProvider>> {
        Ok(ProviderRepo::replace(&self.pool, id, input).await?)
    }

    async fn soft_delete_provider(&self, id: DbId, actor: DbId) -> StoreResult<bool> {
        Ok(ProviderRepo::soft_delete(&self.pool, id, actor).await?)
    }
}

#[async_trait]
impl NotificationLogStore for PgStore {
    async fn create_log(&self, input: &CreateNotificationLog) -> StoreResult<NotificationLog> {
        Ok(NotificationLogRepo::create(&self.pool, input).await?)
    }

    async fn mark_log_sent(
        &self,
        id: DbId,
        sent_at: Timestamp,
    ) -> StoreResult<Option<NotificationLog>> {
        Ok(NotificationLogRepo::mark_sent(&self.pool, id, sent_at).await?)
    }

    async fn mark_log_failed(
        &self,
        id: DbId,
        error_message: &str,
    ) -> StoreResult<Option<NotificationLog>> {
        Ok(NotificationLogRepo::mark_failed(&self.pool, id, error_message).await?)
    }

    async fn find_log(&self, id: DbId) -> StoreResult<Option<NotificationLog>> {
        Ok(NotificationLogRepo::find_by_id(&self.pool, id).await?)
    }

    async fn list_logs(
        &self,
        filter: &LogFilter,
        limit: i64,
        offset: i64,
    ) -> StoreResult<Vec<NotificationLog>> {
        Ok(NotificationLogRepo::list(&self.pool, filter, limit, offset).await?)
    }

    async fn count_logs(&self, filter: &LogFilter) -> StoreResult<i64> {
        Ok(NotificationLogRepo::count(&self.pool, filter).await?)
    }

    async fn log_counts(
        &self,
        member_id: DbId,
        start: Option<Timestamp>,
        end: Option<Timestamp>,
    ) -> StoreResult<LogCounts> {
        Ok(NotificationLogRepo::counts(&self.pool, member_id, start, end).await?)
    }
}

#[async_trait]
impl DeviceTokenStore for PgStore {
    async fn upsert_device_token(
        &self,
        member_id: DbId,
        device_token: &str,
        device_type: DeviceKind,
    ) -> StoreResult<DeviceToken> {
        Ok(DeviceTokenRepo::upsert(&self.pool, member_id, device_token, device_type).await?)
    }

    async fn list_device_tokens(&self, member_id: DbId) -> StoreResult<Vec<DeviceToken>> {
        Ok(DeviceTokenRepo::list_by_member(&self.pool, member_id).await?)
    }

    async fn list_active_device_tokens(&self, member_id: DbId) -> StoreResult<Vec<DeviceToken>> {
        Ok(DeviceTokenRepo::list_active_by_member(&self.pool, member_id).await?)
    }

    async fn deactivate_device_token(&self, device_token: &str) -> StoreResult<u64> {
        Ok(DeviceTokenRepo::deactivate_by_token(&self.pool, device_token).await?)
    }

    async fn touch_device_token(&self, member_id: DbId, device_token: &str) -> StoreResult<()> {
        Ok(DeviceTokenRepo::touch(&self.pool, member_id, device_token).await?)
    }

    async fn delete_device_token(&self, member_id: DbId, device_token: &str) -> StoreResult<bool> {
        Ok(DeviceTokenRepo::delete(&self.pool, member_id, device_token).await?)
    }
}
