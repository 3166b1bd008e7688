//! Repository tests against a real PostgreSQL database.

use herald_core::notification::{ChannelKind, DeliveryStatus, DeviceKind};
use herald_db::models::member::CreateMember;
use herald_db::models::notification_log::{CreateNotificationLog, LogFilter};
use herald_db::models::provider::{CreateProvider, ReplaceProvider};
use herald_db::models::tenant::CreateTenant;
use herald_db::repositories::{
    DeviceTokenRepo, MemberRepo, NotificationLogRepo, ProviderRepo, TenantRepo,
};
use herald_db::StoreError;
use sqlx::PgPool;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn seed_member(pool: &PgPool, email: &str) -> herald_db::models::member::Member {
    let tenant = TenantRepo::create(
        pool,
        &CreateTenant {
            name: "Acme".into(),
        },
    )
    .await
    .unwrap();
    MemberRepo::create(
        pool,
        &CreateMember {
            tenant_id: Some(tenant.id),
            name: "Alice".into(),
            email: email.into(),
            password_hash: "argon2-hash".into(),
            api_key_hash: format!("hash-{email}"),
        },
    )
    .await
    .unwrap()
}

fn smtp_provider(tenant_id: uuid::Uuid, actor: uuid::Uuid) -> CreateProvider {
    CreateProvider {
        tenant_id,
        name: "Primary mail".into(),
        kind: ChannelKind::Smtp,
        config: serde_json::json!({ "host": "smtp.example.com", "password": "sealed" }),
        created_by: actor,
    }
}

// ---------------------------------------------------------------------------
// Members
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "./migrations")]
async fn duplicate_member_email_is_a_conflict(pool: PgPool) {
    let member = seed_member(&pool, "dup@example.com").await;
    let err = MemberRepo::create(
        &pool,
        &CreateMember {
            tenant_id: member.tenant_id,
            name: "Other".into(),
            email: "dup@example.com".into(),
            password_hash: "x".into(),
            api_key_hash: "other-hash".into(),
        },
    )
    .await
    .unwrap_err();

    match StoreError::from(err) {
        StoreError::Conflict(constraint) => assert_eq!(constraint, "uq_members_email"),
        other => panic!("expected conflict, got {other:?}"),
    }
}

#[sqlx::test(migrations = "./migrations")]
async fn member_email_uniqueness_ignores_case(pool: PgPool) {
    let member = seed_member(&pool, "alice@x.com").await;
    let err = MemberRepo::create(
        &pool,
        &CreateMember {
            tenant_id: member.tenant_id,
            name: "Shouting Alice".into(),
            email: "Alice@X.com".into(),
            password_hash: "x".into(),
            api_key_hash: "other-hash".into(),
        },
    )
    .await
    .unwrap_err();

    match StoreError::from(err) {
        StoreError::Conflict(constraint) => assert_eq!(constraint, "uq_members_email"),
        other => panic!("expected conflict, got {other:?}"),
    }

    let found = MemberRepo::find_by_email(&pool, "ALICE@x.com").await.unwrap();
    assert_eq!(found.map(|m| m.id), Some(member.id));
}

#[sqlx::test(migrations = "./migrations")]
async fn soft_deleted_member_is_hidden_and_frees_email(pool: PgPool) {
    let member = seed_member(&pool, "gone@example.com").await;
    let tenant_id = member.tenant_id.unwrap();
    assert_eq!(
        MemberRepo::list_by_tenant(&pool, tenant_id).await.unwrap().len(),
        1
    );

    assert!(MemberRepo::soft_delete(&pool, member.id).await.unwrap());
    assert!(!MemberRepo::soft_delete(&pool, member.id).await.unwrap());
    assert!(MemberRepo::find_by_id(&pool, member.id).await.unwrap().is_none());
    assert!(MemberRepo::list_by_tenant(&pool, tenant_id).await.unwrap().is_empty());

    let again = MemberRepo::create(
        &pool,
        &CreateMember {
            tenant_id: Some(tenant_id),
            name: "Returning".into(),
            email: "Gone@example.com".into(),
            password_hash: "x".into(),
            api_key_hash: "returning-hash".into(),
        },
    )
    .await
    .unwrap();
    assert_ne!(again.id, member.id);
}

#[sqlx::test(migrations = "./migrations")]
async fn api_key_lookup_requires_active_member(pool: PgPool) {
    let member = seed_member(&pool, "key@example.com").await;
    let hash = member.api_key_hash.clone().unwrap();

    let found = MemberRepo::find_active_by_api_key_hash(&pool, &hash).await.unwrap();
    assert_eq!(found.map(|m| m.id), Some(member.id));

    sqlx::query("UPDATE members SET is_active = FALSE WHERE id = $1")
        .bind(member.id)
        .execute(&pool)
        .await
        .unwrap();
    assert!(MemberRepo::find_active_by_api_key_hash(&pool, &hash)
        .await
        .unwrap()
        .is_none());
}

// ---------------------------------------------------------------------------
// Providers
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "./migrations")]
async fn provider_soft_delete_is_single_shot(pool: PgPool) {
    let member = seed_member(&pool, "prov@example.com").await;
    let tenant_id = member.tenant_id.unwrap();
    let provider = ProviderRepo::create(&pool, &smtp_provider(tenant_id, member.id))
        .await
        .unwrap();
    assert_eq!(provider.kind, ChannelKind::Smtp);
    assert!(provider.is_active);

    assert!(ProviderRepo::soft_delete(&pool, provider.id, member.id).await.unwrap());
    assert!(!ProviderRepo::soft_delete(&pool, provider.id, member.id).await.unwrap());
    assert!(ProviderRepo::find_by_id(&pool, provider.id).await.unwrap().is_none());
    assert!(ProviderRepo::list_by_tenant(&pool, tenant_id).await.unwrap().is_empty());
}

#[sqlx::test(migrations = "./migrations")]
async fn provider_replace_overwrites_every_field(pool: PgPool) {
    let member = seed_member(&pool, "replace@example.com").await;
    let tenant_id = member.tenant_id.unwrap();
    let provider = ProviderRepo::create(&pool, &smtp_provider(tenant_id, member.id))
        .await
        .unwrap();

    let replaced = ProviderRepo::replace(
        &pool,
        provider.id,
        &ReplaceProvider {
            name: "Texts".into(),
            kind: ChannelKind::Sms,
            config: serde_json::json!({ "provider": "twilio" }),
            is_active: false,
            updated_by: member.id,
        },
    )
    .await
    .unwrap()
    .unwrap();

    assert_eq!(replaced.name, "Texts");
    assert_eq!(replaced.kind, ChannelKind::Sms);
    assert!(!replaced.is_active);
    assert_eq!(replaced.updated_by, Some(member.id));
    assert!(ProviderRepo::find_active_by_kind(&pool, tenant_id, ChannelKind::Sms)
        .await
        .unwrap()
        .is_none());
}

// ---------------------------------------------------------------------------
// Logs and device tokens
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "./migrations")]
async fn log_transitions_and_filters(pool: PgPool) {
    let member = seed_member(&pool, "logs@example.com").await;
    let provider = ProviderRepo::create(&pool, &smtp_provider(member.tenant_id.unwrap(), member.id))
        .await
        .unwrap();

    let log = NotificationLogRepo::create(
        &pool,
        &CreateNotificationLog {
            member_id: member.id,
            provider_id: provider.id,
            channel: ChannelKind::Smtp,
            recipient_email: Some("bob@example.com".into()),
            recipient_name: Some("Bob".into()),
            recipient_phone: None,
            device_token: None,
            subject: Some("Hi".into()),
            body: "<p>Hello</p>".into(),
        },
    )
    .await
    .unwrap();
    assert_eq!(log.status, DeliveryStatus::Pending);

    let sent = NotificationLogRepo::mark_sent(&pool, log.id, chrono::Utc::now())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(sent.status, DeliveryStatus::Sent);
    assert!(sent.sent_at.is_some());

    let filter = LogFilter {
        member_id: member.id,
        recipient: Some("bob@".into()),
        ..LogFilter::default()
    };
    assert_eq!(NotificationLogRepo::count(&pool, &filter).await.unwrap(), 1);

    let counts = NotificationLogRepo::counts(&pool, member.id, None, None).await.unwrap();
    assert_eq!(counts.status_count(DeliveryStatus::Sent), 1);
    assert_eq!(counts.total(), 1);
}

#[sqlx::test(migrations = "./migrations")]
async fn device_token_upsert_is_per_member(pool: PgPool) {
    let alice = seed_member(&pool, "alice@example.com").await;
    let bob = seed_member(&pool, "bob@example.com").await;

    let first = DeviceTokenRepo::upsert(&pool, alice.id, "tok", DeviceKind::Ios).await.unwrap();
    let again = DeviceTokenRepo::upsert(&pool, alice.id, "tok", DeviceKind::Web).await.unwrap();
    assert_eq!(first.id, again.id);
    assert_eq!(again.device_type, DeviceKind::Web);

    let other = DeviceTokenRepo::upsert(&pool, bob.id, "tok", DeviceKind::Ios).await.unwrap();
    assert_ne!(other.id, first.id);

    assert_eq!(DeviceTokenRepo::deactivate_by_token(&pool, "tok").await.unwrap(), 2);
    assert!(DeviceTokenRepo::list_active_by_member(&pool, alice.id)
        .await
        .unwrap()
        .is_empty());
    assert!(DeviceTokenRepo::delete(&pool, bob.id, "tok").await.unwrap());
}
