//! In-process [`Datastore`](crate::store::Datastore) for tests and local runs.
//!
//! Mirrors the PostgreSQL semantics the services rely on: soft-deleted rows
//! are invisible, `(member_id, device_token)` and member email are unique,
//! and listings are newest first. Every call is counted per operation name and
//! individual operations can be made to fail, which lets tests assert exact
//! datastore round trips and error propagation.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::Utc;
use herald_core::notification::{ChannelKind, DeliveryStatus, DeviceKind};
use herald_core::types::{new_id, DbId, Timestamp};

use crate::error::StoreError;
use crate::models::device_token::DeviceToken;
use crate::models::member::{CreateMember, Member};
use crate::models::notification_log::{
    CreateNotificationLog, GroupCount, LogCounts, LogFilter, NotificationLog,
};
use crate::models::provider::{CreateProvider, NotificationProvider, ReplaceProvider};
use crate::models::tenant::{CreateTenant, Tenant};
use crate::store::{
    DeviceTokenStore, MemberStore, NotificationLogStore, ProviderStore, StoreResult, TenantStore,
};

#[derive(Default)]
struct Tables {
    tenants: Vec<Tenant>,
    members: Vec<Member>,
    providers: Vec<NotificationProvider>,
    logs: Vec<NotificationLog>,
    device_tokens: Vec<DeviceToken>,
}

/// Mutex-guarded tables plus per-operation call counters.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
    calls: Mutex<HashMap<&'static str, usize>>,
    failing: Mutex<HashSet<String>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of times the store method named `operation` was called.
    pub fn call_count(&self, operation: &str) -> usize {
        lock(&self.calls).get(operation).copied().unwrap_or(0)
    }

    /// Make every subsequent call to `operation` fail with a database error.
    pub fn fail_operation(&self, operation: &str) {
        lock(&self.failing).insert(operation.to_string());
    }

    /// Undo [`MemoryStore::fail_operation`].
    pub fn restore_operation(&self, operation: &str) {
        lock(&self.failing).remove(operation);
    }

    /// Set a member's active flag directly.
    pub fn set_member_active(&self, id: DbId, active: bool) {
        if let Some(member) = lock(&self.tables).members.iter_mut().find(|m| m.id == id) {
            member.is_active = active;
        }
    }

    /// Snapshot of every log row in insertion order.
    pub fn all_logs(&self) -> Vec<NotificationLog> {
        lock(&self.tables).logs.clone()
    }

    /// Snapshot of every device token row in insertion order.
    pub fn all_device_tokens(&self) -> Vec<DeviceToken> {
        lock(&self.tables).device_tokens.clone()
    }

    fn enter(&self, operation: &'static str) -> StoreResult<MutexGuard<'_, Tables>> {
        *lock(&self.calls).entry(operation).or_insert(0) += 1;
        if lock(&self.failing).contains(operation) {
            return Err(StoreError::Database(sqlx::Error::PoolTimedOut));
        }
        Ok(lock(&self.tables))
    }
}

fn log_matches(log: &NotificationLog, filter: &LogFilter) -> bool {
    let contains = |field: &Option<String>, needle: &str| {
        field.as_deref().is_some_and(|value| value.contains(needle))
    };

    log.member_id == filter.member_id
        && filter.status.is_none_or(|s| log.status == s)
        && filter.channel.is_none_or(|c| log.channel == c)
        && filter.start.is_none_or(|start| log.created_at >= start)
        && filter.end.is_none_or(|end| log.created_at <= end)
        && filter.recipient.as_deref().is_none_or(|needle| {
            contains(&log.recipient_email, needle) || contains(&log.recipient_phone, needle)
        })
}

fn group_counts<'a>(keys: impl Iterator<Item = &'a str>) -> Vec<GroupCount> {
    let mut buckets: BTreeMap<&str, i64> = BTreeMap::new();
    for key in keys {
        *buckets.entry(key).or_insert(0) += 1;
    }
    buckets
        .into_iter()
        .map(|(key, count)| GroupCount {
            key: key.to_string(),
            count,
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Tenants and members
// ---------------------------------------------------------------------------

#[async_trait]
impl TenantStore for MemoryStore {
    async fn create_tenant(&self, input: &CreateTenant) -> StoreResult<Tenant> {
        let mut tables = self.enter("create_tenant")?;
        let now = Utc::now();
        let tenant = Tenant {
            id: new_id(),
            name: input.name.clone(),
            is_active: true,
            deleted_at: None,
            created_at: now,
            updated_at: now,
        };
        tables.tenants.push(tenant.clone());
        Ok(tenant)
    }

    async fn find_tenant(&self, id: DbId) -> StoreResult<Option<Tenant>> {
        let tables = self.enter("find_tenant")?;
        Ok(tables
            .tenants
            .iter()
            .find(|t| t.id == id && t.deleted_at.is_none())
            .cloned())
    }
}

#[async_trait]
impl MemberStore for MemoryStore {
    async fn create_member(&self, input: &CreateMember) -> StoreResult<Member> {
        let mut tables = self.enter("create_member")?;
        if tables
            .members
            .iter()
            .any(|m| m.deleted_at.is_none() && m.email.eq_ignore_ascii_case(&input.email))
        {
            return Err(StoreError::Conflict("uq_members_email".into()));
        }
        let now = Utc::now();
        let member = Member {
            id: new_id(),
            tenant_id: input.tenant_id,
            name: input.name.clone(),
            email: input.email.clone(),
            password_hash: input.password_hash.clone(),
            api_key_hash: Some(input.api_key_hash.clone()),
            is_active: true,
            deleted_at: None,
            created_at: now,
            updated_at: now,
        };
        tables.members.push(member.clone());
        Ok(member)
    }

    async fn find_member(&self, id: DbId) -> StoreResult<Option<Member>> {
        let tables = self.enter("find_member")?;
        Ok(tables
            .members
            .iter()
            .find(|m| m.id == id && m.deleted_at.is_none())
            .cloned())
    }

    async fn list_members_by_tenant(&self, tenant_id: DbId) -> StoreResult<Vec<Member>> {
        let tables = self.enter("list_members_by_tenant")?;
        Ok(tables
            .members
            .iter()
            .filter(|m| m.tenant_id == Some(tenant_id) && m.deleted_at.is_none())
            .cloned()
            .collect())
    }

    async fn find_member_by_email(&self, email: &str) -> StoreResult<Option<Member>> {
        let tables = self.enter("find_member_by_email")?;
        Ok(tables
            .members
            .iter()
            .find(|m| m.email.eq_ignore_ascii_case(email) && m.deleted_at.is_none())
            .cloned())
    }

    async fn find_active_member_by_api_key_hash(
        &self,
        api_key_hash: &str,
    ) -> StoreResult<Option<Member>> {
        let tables = self.enter("find_active_member_by_api_key_hash")?;
        Ok(tables
            .members
            .iter()
            .find(|m| {
                m.api_key_hash.as_deref() == Some(api_key_hash)
                    && m.is_active
                    && m.deleted_at.is_none()
            })
            .cloned())
    }

    async fn set_member_api_key_hash(
        &self,
        id: DbId,
        api_key_hash: &str,
    ) -> StoreResult<Option<Member>> {
        let mut tables = self.enter("set_member_api_key_hash")?;
        let Some(member) = tables
            .members
            .iter_mut()
            .find(|m| m.id == id && m.deleted_at.is_none())
        else {
            return Ok(None);
        };
        member.api_key_hash = Some(api_key_hash.to_string());
        member.updated_at = Utc::now();
        Ok(Some(member.clone()))
    }

    async fn soft_delete_member(&self, id: DbId) -> StoreResult<bool> {
        let mut tables = self.enter("soft_delete_member")?;
        let Some(member) = tables
            .members
            .iter_mut()
            .find(|m| m.id == id && m.deleted_at.is_none())
        else {
            return Ok(false);
        };
        let now = Utc::now();
        member.deleted_at = Some(now);
        member.updated_at = now;
        Ok(true)
    }
}

// ---------------------------------------------------------------------------
// Providers
// ---------------------------------------------------------------------------

#[async_trait]
impl ProviderStore for MemoryStore {
    async fn create_provider(&self, input: &CreateProvider) -> StoreResult<NotificationProvider> {
        let mut tables = self.enter("create_provider")?;
        let provider = NotificationProvider {
            id: new_id(),
            tenant_id: input.tenant_id,
            name: input.name.clone(),
            kind: input.kind,
            config: input.config.clone(),
            is_active: true,
            is_deleted: false,
            deleted_at: None,
            created_by: input.created_by,
            created_at: Utc::now(),
            updated_by: None,
            updated_at: None,
        };
        tables.providers.push(provider.clone());
        Ok(provider)
    }

    async fn find_provider(&self, id: DbId) -> StoreResult<Option<NotificationProvider>> {
        let tables = self.enter("find_provider")?;
        Ok(tables
            .providers
            .iter()
            .find(|p| p.id == id && !p.is_deleted)
            .cloned())
    }

    async fn list_providers_by_tenant(
        &self,
        tenant_id: DbId,
    ) -> StoreResult<Vec<NotificationProvider>> {
        let tables = self.enter("list_providers_by_tenant")?;
        Ok(tables
            .providers
            .iter()
            .rev()
            .filter(|p| p.tenant_id == tenant_id && !p.is_deleted)
            .cloned()
            .collect())
    }

    async fn find_active_provider_by_kind(
        &self,
        tenant_id: DbId,
        kind: ChannelKind,
    ) -> StoreResult<Option<NotificationProvider>> {
        let tables = self.enter("find_active_provider_by_kind")?;
        Ok(tables
            .providers
            .iter()
            .rev()
            .find(|p| p.tenant_id == tenant_id && p.kind == kind && p.is_active && !p.is_deleted)
            .cloned())
    }

    async fn replace_provider(
        &self,
        id: DbId,
        input: &ReplaceProvider,
    ) -> StoreResult<Option<NotificationProvider>> {
        let mut tables = self.enter("replace_provider")?;
        let Some(provider) = tables
            .providers
            .iter_mut()
            .find(|p| p.id == id && !p.is_deleted)
        else {
            return Ok(None);
        };
        provider.name = input.name.clone();
        provider.kind = input.kind;
        provider.config = input.config.clone();
        provider.is_active = input.is_active;
        provider.updated_by = Some(input.updated_by);
        provider.updated_at = Some(Utc::now());
        Ok(Some(provider.clone()))
    }

    async fn soft_delete_provider(&self, id: DbId, actor: DbId) -> StoreResult<bool> {
        let mut tables = self.enter("soft_delete_provider")?;
        let Some(provider) = tables
            .providers
            .iter_mut()
            .find(|p| p.id == id && !p.is_deleted)
        else {
            return Ok(false);
        };
        let now = Utc::now();
        provider.is_deleted = true;
        provider.deleted_at = Some(now);
        provider.updated_by = Some(actor);
        provider.updated_at = Some(now);
        Ok(true)
    }
}

// ---------------------------------------------------------------------------
// Delivery logs
// ---------------------------------------------------------------------------

#[async_trait]
impl NotificationLogStore for MemoryStore {
    async fn create_log(&self, input: &CreateNotificationLog) -> StoreResult<NotificationLog> {
        let mut tables = self.enter("create_log")?;
        let log = NotificationLog {
            id: new_id(),
            member_id: input.member_id,
            provider_id: input.provider_id,
            channel: input.channel,
            recipient_email: input.recipient_email.clone(),
            recipient_name: input.recipient_name.clone(),
            recipient_phone: input.recipient_phone.clone(),
            device_token: input.device_token.clone(),
            subject: input.subject.clone(),
            body: input.body.clone(),
            status: DeliveryStatus::Pending,
            error_message: None,
            sent_at: None,
            created_at: Utc::now(),
            updated_at: None,
        };
        tables.logs.push(log.clone());
        Ok(log)
    }

    async fn mark_log_sent(
        &self,
        id: DbId,
        sent_at: Timestamp,
    ) -> StoreResult<Option<NotificationLog>> {
        let mut tables = self.enter("mark_log_sent")?;
        let Some(log) = tables.logs.iter_mut().find(|l| l.id == id) else {
            return Ok(None);
        };
        log.status = DeliveryStatus::Sent;
        log.sent_at = Some(sent_at);
        log.error_message = None;
        log.updated_at = Some(Utc::now());
        Ok(Some(log.clone()))
    }

    async fn mark_log_failed(
        &self,
        id: DbId,
        error_message: &str,
    ) -> StoreResult<Option<NotificationLog>> {
        let mut tables = self.enter("mark_log_failed")?;
        let Some(log) = tables.logs.iter_mut().find(|l| l.id == id) else {
            return Ok(None);
        };
        log.status = DeliveryStatus::Failed;
        log.error_message = Some(error_message.to_string());
        log.sent_at = None;
        log.updated_at = Some(Utc::now());
        Ok(Some(log.clone()))
    }

    async fn find_log(&self, id: DbId) -> StoreResult<Option<NotificationLog>> {
        let tables = self.enter("find_log")?;
        Ok(tables.logs.iter().find(|l| l.id == id).cloned())
    }

    async fn list_logs(
        &self,
        filter: &LogFilter,
        limit: i64,
        offset: i64,
    ) -> StoreResult<Vec<NotificationLog>> {
        let tables = self.enter("list_logs")?;
        Ok(tables
            .logs
            .iter()
            .rev()
            .filter(|l| log_matches(l, filter))
            .skip(usize::try_from(offset).unwrap_or(0))
            .take(usize::try_from(limit).unwrap_or(0))
            .cloned()
            .collect())
    }

    async fn count_logs(&self, filter: &LogFilter) -> StoreResult<i64> {
        let tables = self.enter("count_logs")?;
        let count = tables.logs.iter().filter(|l| log_matches(l, filter)).count();
        Ok(i64::try_from(count).unwrap_or(i64::MAX))
    }

    async fn log_counts(
        &self,
        member_id: DbId,
        start: Option<Timestamp>,
        end: Option<Timestamp>,
    ) -> StoreResult<LogCounts> {
        let tables = self.enter("log_counts")?;
        let filter = LogFilter {
            member_id,
            start,
            end,
            ..LogFilter::default()
        };
        let rows: Vec<&NotificationLog> =
            tables.logs.iter().filter(|l| log_matches(l, &filter)).collect();

        Ok(LogCounts {
            by_status: group_counts(rows.iter().map(|l| l.status.as_str())),
            by_channel: group_counts(rows.iter().map(|l| l.channel.as_str())),
        })
    }
}

// ---------------------------------------------------------------------------
// Device tokens
// ---------------------------------------------------------------------------

#[async_trait]
impl DeviceTokenStore for MemoryStore {
    async fn upsert_device_token(
        &self,
        member_id: DbId,
        device_token: &str,
        device_type: DeviceKind,
    ) -> StoreResult<DeviceToken> {
        let mut tables = self.enter("upsert_device_token")?;
        let now = Utc::now();
        if let Some(existing) = tables
            .device_tokens
            .iter_mut()
            .find(|d| d.member_id == member_id && d.device_token == device_token)
        {
            existing.device_type = device_type;
            existing.is_active = true;
            existing.last_used_at = Some(now);
            existing.updated_at = now;
            return Ok(existing.clone());
        }

        let row = DeviceToken {
            id: new_id(),
            member_id,
            device_token: device_token.to_string(),
            device_type,
            is_active: true,
            last_used_at: Some(now),
            created_at: now,
            updated_at: now,
        };
        tables.device_tokens.push(row.clone());
        Ok(row)
    }

    async fn list_device_tokens(&self, member_id: DbId) -> StoreResult<Vec<DeviceToken>> {
        let tables = self.enter("list_device_tokens")?;
        Ok(tables
            .device_tokens
            .iter()
            .rev()
            .filter(|d| d.member_id == member_id)
            .cloned()
            .collect())
    }

    async fn list_active_device_tokens(&self, member_id: DbId) -> StoreResult<Vec<DeviceToken>> {
        let tables = self.enter("list_active_device_tokens")?;
        Ok(tables
            .device_tokens
            .iter()
            .filter(|d| d.member_id == member_id && d.is_active)
            .cloned()
            .collect())
    }

    async fn deactivate_device_token(&self, device_token: &str) -> StoreResult<u64> {
        let mut tables = self.enter("deactivate_device_token")?;
        let now = Utc::now();
        let mut changed = 0;
        for row in tables
            .device_tokens
            .iter_mut()
            .filter(|d| d.device_token == device_token && d.is_active)
        {
            row.is_active = false;
            row.updated_at = now;
            changed += 1;
        }
        Ok(changed)
    }

    async fn touch_device_token(&self, member_id: DbId, device_token: &str) -> StoreResult<()> {
        let mut tables = self.enter("touch_device_token")?;
        let now = Utc::now();
        for row in tables
            .device_tokens
            .iter_mut()
            .filter(|d| d.member_id == member_id && d.device_token == device_token)
        {
            row.last_used_at = Some(now);
        }
        Ok(())
    }

    async fn delete_device_token(&self, member_id: DbId, device_token: &str) -> StoreResult<bool> {
        let mut tables = self.enter("delete_device_token")?;
        let before = tables.device_tokens.len();
        tables
            .device_tokens
            .retain(|d| !(d.member_id == member_id && d.device_token == device_token));
        Ok(tables.device_tokens.len() < before)
    }
}
