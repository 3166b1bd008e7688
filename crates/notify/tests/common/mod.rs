#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use herald_core::api_keys::generate_api_key;
use herald_core::crypto::CredentialCipher;
use herald_core::error::CoreError;
use herald_core::notification::ChannelKind;
use herald_core::provider_config::{PushConfig, SmsConfig, SmtpConfig};
use herald_db::models::member::{CreateMember, Member};
use herald_db::models::provider::NotificationProvider;
use herald_db::models::tenant::{CreateTenant, Tenant};
use herald_db::{Datastore, MemberStore, MemoryStore, TenantStore};
use herald_notify::delivery::email::{EmailTransport, OutgoingEmail};
use herald_notify::delivery::push::{PushClient, PushConnector, PushMessage};
use herald_notify::delivery::sms::SmsTransport;
use herald_notify::delivery::SendError;
use herald_notify::ProviderService;
use serde_json::{json, Value};

pub const SMTP_PASSWORD: &str = "smtp-hunter2";
pub const SMS_AUTH_TOKEN: &str = "sms-auth-token-xyz";

// ---------------------------------------------------------------------------
// Fixture
// ---------------------------------------------------------------------------

pub struct Fixture {
    pub store: Arc<MemoryStore>,
    pub providers: Arc<ProviderService>,
    pub tenant: Tenant,
    pub member: Member,
    /// Plaintext API key of `member`.
    pub api_key: String,
}

impl Fixture {
    pub fn datastore(&self) -> Arc<dyn Datastore> {
        self.store.clone()
    }

    pub async fn provider(&self, kind: ChannelKind, config: Value) -> NotificationProvider {
        self.providers
            .create(self.tenant.id, "test provider", kind, &config, self.member.id)
            .await
            .unwrap()
    }
}

pub fn cipher() -> CredentialCipher {
    CredentialCipher::from_secret("0123456789abcdef0123456789abcdef")
}

pub async fn fixture() -> Fixture {
    let store = Arc::new(MemoryStore::new());
    let tenant = store
        .create_tenant(&CreateTenant {
            name: "Acme".into(),
        })
        .await
        .unwrap();
    let key = generate_api_key();
    let member = store
        .create_member(&CreateMember {
            tenant_id: Some(tenant.id),
            name: "Alice".into(),
            email: "alice@example.com".into(),
            password_hash: "argon2-hash".into(),
            api_key_hash: key.hash.clone(),
        })
        .await
        .unwrap();
    let providers = Arc::new(ProviderService::new(store.clone(), cipher()));

    Fixture {
        store,
        providers,
        tenant,
        member,
        api_key: key.plaintext,
    }
}

pub fn smtp_config() -> Value {
    json!({
        "host": "smtp.example.com",
        "port": 587,
        "username": "mailer",
        "password": SMTP_PASSWORD,
        "from": "noreply@example.com",
        "use_tls": false
    })
}

pub fn sms_config() -> Value {
    json!({
        "provider": "twilio",
        "account_id": "AC123",
        "auth_token": SMS_AUTH_TOKEN,
        "from_phone": "+15550001111"
    })
}

pub fn push_config() -> Value {
    json!({
        "project_id": "demo-project",
        "credential_json": "{\"client_email\":\"svc@demo\",\"private_key\":\"pem\"}"
    })
}

// ---------------------------------------------------------------------------
// Scripted transports
// ---------------------------------------------------------------------------

/// Results handed out in order; once the script runs out every call succeeds.
#[derive(Default)]
pub struct Script {
    results: Mutex<VecDeque<Result<(), SendError>>>,
    calls: AtomicUsize,
}

impl Script {
    pub fn new(results: impl IntoIterator<Item = Result<(), SendError>>) -> Self {
        Self {
            results: Mutex::new(results.into_iter().collect()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn always_failing(message: &str, times: usize) -> Self {
        Self::new((0..times).map(|_| Err(SendError::failed(message))))
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn next(&self) -> Result<(), SendError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.results.lock().unwrap().pop_front().unwrap_or(Ok(()))
    }
}

#[derive(Default)]
pub struct ScriptedEmail {
    pub script: Script,
    pub sent: Mutex<Vec<OutgoingEmail>>,
}

#[async_trait]
impl EmailTransport for ScriptedEmail {
    async fn send(&self, _config: &SmtpConfig, email: &OutgoingEmail) -> Result<(), SendError> {
        self.sent.lock().unwrap().push(email.clone());
        self.script.next()
    }
}

#[derive(Default)]
pub struct ScriptedSms {
    pub script: Script,
    /// `(from, to, body)` of every attempt.
    pub sent: Mutex<Vec<(String, String, String)>>,
}

#[async_trait]
impl SmsTransport for ScriptedSms {
    async fn send(
        &self,
        _account: &SmsConfig,
        from: &str,
        to: &str,
        body: &str,
    ) -> Result<(), SendError> {
        self.sent
            .lock()
            .unwrap()
            .push((from.to_string(), to.to_string(), body.to_string()));
        self.script.next()
    }
}

/// Push client answering per token; unknown tokens succeed.
#[derive(Default)]
pub struct FakePushClient {
    pub responses: Mutex<HashMap<String, SendError>>,
    pub sent: Mutex<Vec<String>>,
}

impl FakePushClient {
    pub fn reject(&self, token: &str, error: SendError) {
        self.responses.lock().unwrap().insert(token.to_string(), error);
    }
}

#[async_trait]
impl PushClient for FakePushClient {
    async fn send(&self, token: &str, _message: &PushMessage) -> Result<(), SendError> {
        self.sent.lock().unwrap().push(token.to_string());
        match self.responses.lock().unwrap().get(token) {
            Some(e) => Err(e.clone()),
            None => Ok(()),
        }
    }
}

pub struct FakeConnector {
    pub client: Arc<FakePushClient>,
    pub connects: AtomicUsize,
}

impl FakeConnector {
    pub fn new() -> Self {
        Self {
            client: Arc::new(FakePushClient::default()),
            connects: AtomicUsize::new(0),
        }
    }

    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PushConnector for FakeConnector {
    async fn connect(&self, _config: &PushConfig) -> Result<Arc<dyn PushClient>, CoreError> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        Ok(self.client.clone())
    }
}
