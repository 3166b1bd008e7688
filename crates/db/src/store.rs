//! The narrow datastore interface the notification services consume.
//!
//! Every method maps to a single statement so implementations stay thin.
//! [`crate::pg::PgStore`] backs these traits with PostgreSQL and
//! [`crate::memory::MemoryStore`] with process memory.

use async_trait::async_trait;
use herald_core::notification::{ChannelKind, DeviceKind};
use herald_core::types::{DbId, Timestamp};

use crate::error::StoreError;
use crate::models::device_token::DeviceToken;
use crate::models::member::{CreateMember, Member};
use crate::models::notification_log::{
    CreateNotificationLog, LogCounts, LogFilter, NotificationLog,
};
use crate::models::provider::{CreateProvider, NotificationProvider, ReplaceProvider};
use crate::models::tenant::{CreateTenant, Tenant};

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait TenantStore: Send + Sync {
    async fn create_tenant(&self, input: &CreateTenant) -> StoreResult<Tenant>;
    async fn find_tenant(&self, id: DbId) -> StoreResult<Option<Tenant>>;
}

#[async_trait]
pub trait MemberStore: Send + Sync {
    async fn create_member(&self, input: &CreateMember) -> StoreResult<Member>;
    async fn find_member(&self, id: DbId) -> StoreResult<Option<Member>>;
    async fn list_members_by_tenant(&self, tenant_id: DbId) -> StoreResult<Vec<Member>>;
    async fn find_member_by_email(&self, email: &str) -> StoreResult<Option<Member>>;
    /// Active, non-deleted member holding the API key with this hash.
    async fn find_active_member_by_api_key_hash(
        &self,
        api_key_hash: &str,
    ) -> StoreResult<Option<Member>>;
    async fn set_member_api_key_hash(
        &self,
        id: DbId,
        api_key_hash: &str,
    ) -> StoreResult<Option<Member>>;
    /// Returns `false` when the row was absent or already deleted.
    async fn soft_delete_member(&self, id: DbId) -> StoreResult<bool>;
}

/// Provider rows. Soft-deleted rows are invisible to every method.
#[async_trait]
pub trait ProviderStore: Send + Sync {
    async fn create_provider(&self, input: &CreateProvider) -> StoreResult<NotificationProvider>;
    async fn find_provider(&self, id: DbId) -> StoreResult<Option<NotificationProvider>>;
    async fn list_providers_by_tenant(
        &self,
        tenant_id: DbId,
    ) -> StoreResult<Vec<NotificationProvider>>;
    async fn find_active_provider_by_kind(
        &self,
        tenant_id: DbId,
        kind: ChannelKind,
    ) -> StoreResult<Option<NotificationProvider>>;
    async fn replace_provider(
        &self,
        id: DbId,
        input: &ReplaceProvider,
    ) -> StoreResult<Option<NotificationProvider>>;
    /// Returns `false` when the row was absent or already deleted.
    async fn soft_delete_provider(&self, id: DbId, actor: DbId) -> StoreResult<bool>;
}

#[async_trait]
pub trait NotificationLogStore: Send + Sync {
    async fn create_log(&self, input: &CreateNotificationLog) -> StoreResult<NotificationLog>;
    async fn mark_log_sent(
        &self,
        id: DbId,
        sent_at: Timestamp,
    ) -> StoreResult<Option<NotificationLog>>;
    async fn mark_log_failed(
        &self,
        id: DbId,
        error_message: &str,
    ) -> StoreResult<Option<NotificationLog>>;
    async fn find_log(&self, id: DbId) -> StoreResult<Option<NotificationLog>>;
    async fn list_logs(
        &self,
        filter: &LogFilter,
        limit: i64,
        offset: i64,
    ) -> StoreResult<Vec<NotificationLog>>;
    async fn count_logs(&self, filter: &LogFilter) -> StoreResult<i64>;
    async fn log_counts(
        &self,
        member_id: DbId,
        start: Option<Timestamp>,
        end: Option<Timestamp>,
    ) -> StoreResult<LogCounts>;
}

#[async_trait]
pub trait DeviceTokenStore: Send + Sync {
    async fn upsert_device_token(
        &self,
        member_id: DbId,
        device_token: &str,
        device_type: DeviceKind,
    ) -> StoreResult<DeviceToken>;
    async fn list_device_tokens(&self, member_id: DbId) -> StoreResult<Vec<DeviceToken>>;
    async fn list_active_device_tokens(&self, member_id: DbId) -> StoreResult<Vec<DeviceToken>>;
    /// Deactivate every registration of the token string.
    async fn deactivate_device_token(&self, device_token: &str) -> StoreResult<u64>;
    async fn touch_device_token(&self, member_id: DbId, device_token: &str) -> StoreResult<()>;
    async fn delete_device_token(&self, member_id: DbId, device_token: &str) -> StoreResult<bool>;
}

/// Every store the services need, as one object-safe bound.
pub trait Datastore:
    TenantStore + MemberStore + ProviderStore + NotificationLogStore + DeviceTokenStore
{
}

impl<T> Datastore for T where
    T: TenantStore + MemberStore + ProviderStore + NotificationLogStore + DeviceTokenStore
{
}
