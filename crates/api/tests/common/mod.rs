#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::response::Response;
use axum::Router;
use herald_core::error::CoreError;
use herald_core::provider_config::{PushConfig, SmsConfig, SmtpConfig};
use herald_db::models::tenant::{CreateTenant, Tenant};
use herald_db::{MemoryStore, TenantStore};
use herald_notify::delivery::email::OutgoingEmail;
use herald_notify::{
    EmailTransport, PushClient, PushConnector, PushMessage, SendError, SmsTransport,
};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use herald_api::auth::jwt::JwtConfig;
use herald_api::config::ServerConfig;
use herald_api::router::build_app_router;
use herald_api::state::{AppState, Transports};

pub const PASSWORD: &str = "correct-horse-battery";

/// Tokens with this prefix are rejected by the fake push service as
/// unregistered.
pub const STALE_TOKEN_PREFIX: &str = "stale-";

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        jwt: JwtConfig {
            secret: "test-jwt-secret".to_string(),
            access_token_expiry_mins: 60,
        },
        encryption_key: "0123456789abcdef0123456789abcdef".to_string(),
        api_key_cache_ttl_secs: 300,
    }
}

// ---------------------------------------------------------------------------
// Fake transports
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct RecordingEmail {
    pub sent: Mutex<Vec<OutgoingEmail>>,
}

#[async_trait]
impl EmailTransport for RecordingEmail {
    async fn send(&self, _config: &SmtpConfig, email: &OutgoingEmail) -> Result<(), SendError> {
        self.sent.lock().unwrap().push(email.clone());
        Ok(())
    }
}

/// Records `(to, body)` of every accepted message.
#[derive(Default)]
pub struct RecordingSms {
    pub sent: Mutex<Vec<(String, String)>>,
}

#[async_trait]
impl SmsTransport for RecordingSms {
    async fn send(
        &self,
        _account: &SmsConfig,
        _from: &str,
        to: &str,
        body: &str,
    ) -> Result<(), SendError> {
        self.sent
            .lock()
            .unwrap()
            .push((to.to_string(), body.to_string()));
        Ok(())
    }
}

pub struct FakePush;

#[async_trait]
impl PushClient for FakePush {
    async fn send(&self, token: &str, _message: &PushMessage) -> Result<(), SendError> {
        if token.starts_with(STALE_TOKEN_PREFIX) {
            return Err(SendError::InvalidToken("UNREGISTERED".into()));
        }
        Ok(())
    }
}

pub struct FakeConnector;

#[async_trait]
impl PushConnector for FakeConnector {
    async fn connect(&self, _config: &PushConfig) -> Result<Arc<dyn PushClient>, CoreError> {
        Ok(Arc::new(FakePush))
    }
}

// ---------------------------------------------------------------------------
// App
// ---------------------------------------------------------------------------

pub struct TestApp {
    pub app: Router,
    pub store: Arc<MemoryStore>,
    pub tenant: Tenant,
    pub email: Arc<RecordingEmail>,
    pub sms: Arc<RecordingSms>,
}

/// A registered member with both credentials.
pub struct Caller {
    pub member_id: String,
    pub api_key: String,
    pub token: String,
}

impl TestApp {
    /// Router clone for a single `oneshot` call.
    pub fn router(&self) -> Router {
        self.app.clone()
    }

    /// Register a member of the test tenant and log it in.
    pub async fn caller(&self, email: &str) -> Caller {
        self.caller_in(email, Some(self.tenant.id.to_string())).await
    }

    pub async fn caller_in(&self, email: &str, tenant_id: Option<String>) -> Caller {
        let response = post_json(
            self.router(),
            "/api/v1/register",
            json!({
                "name": "Test Member",
                "email": email,
                "password": PASSWORD,
                "tenant_id": tenant_id,
            }),
        )
        .await;
        assert_eq!(response.status(), StatusCode::CREATED);
        let registered = body_json(response).await;

        let response = post_json(
            self.router(),
            "/api/v1/login",
            json!({ "email": email, "password": PASSWORD }),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        let login = body_json(response).await;

        Caller {
            member_id: registered["data"]["member"]["id"].as_str().unwrap().to_string(),
            api_key: registered["data"]["api_key"].as_str().unwrap().to_string(),
            token: login["access_token"].as_str().unwrap().to_string(),
        }
    }

    /// Create a provider through the API and return its id.
    pub async fn provider(&self, caller: &Caller, kind: &str, config: Value) -> String {
        let response = post_json_auth(
            self.router(),
            "/api/v1/providers",
            &caller.token,
            json!({ "name": format!("{kind} provider"), "type": kind, "config": config }),
        )
        .await;
        assert_eq!(response.status(), StatusCode::CREATED);
        body_json(response).await["data"]["id"]
            .as_str()
            .unwrap()
            .to_string()
    }
}

/// Build the full application over an in-process store with fake
/// transports and one tenant.
pub async fn build_test_app() -> TestApp {
    let store = Arc::new(MemoryStore::new());
    let tenant = store
        .create_tenant(&CreateTenant {
            name: "Acme".into(),
        })
        .await
        .unwrap();

    let email = Arc::new(RecordingEmail::default());
    let sms = Arc::new(RecordingSms::default());
    let transports = Transports {
        email: email.clone(),
        sms: sms.clone(),
        push: Arc::new(FakeConnector),
    };

    let config = test_config();
    let state = AppState::new(config.clone(), store.clone(), None, transports);
    let app = build_app_router(state, &config);

    TestApp {
        app,
        store,
        tenant,
        email,
        sms,
    }
}

pub fn smtp_config() -> Value {
    json!({
        "host": "smtp.example.com",
        "port": 587,
        "username": "mailer",
        "password": "smtp-secret",
        "from": "noreply@example.com",
        "use_tls": false,
    })
}

pub fn sms_config() -> Value {
    json!({
        "provider": "twilio",
        "account_id": "AC123",
        "auth_token": "sms-secret",
        "from_phone": "+15550001111",
    })
}

pub fn push_config() -> Value {
    json!({
        "project_id": "demo",
        "credential_json": "{\"client_email\":\"svc@demo\",\"private_key\":\"pem\"}",
    })
}

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

async fn send(app: Router, request: Request<Body>) -> Response {
    app.oneshot(request).await.unwrap()
}

fn json_request(method: Method, uri: &str) -> axum::http::request::Builder {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
}

pub async fn get(app: Router, uri: &str) -> Response {
    send(app, Request::get(uri).body(Body::empty()).unwrap()).await
}

pub async fn get_auth(app: Router, uri: &str, token: &str) -> Response {
    let request = Request::get(uri)
        .header("authorization", format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap();
    send(app, request).await
}

pub async fn get_with_key(app: Router, uri: &str, api_key: &str) -> Response {
    let request = Request::get(uri)
        .header("x-api-key", api_key)
        .body(Body::empty())
        .unwrap();
    send(app, request).await
}

pub async fn delete_auth(app: Router, uri: &str, token: &str) -> Response {
    let request = Request::delete(uri)
        .header("authorization", format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap();
    send(app, request).await
}

pub async fn post_json(app: Router, uri: &str, body: Value) -> Response {
    let request = json_request(Method::POST, uri)
        .body(Body::from(body.to_string()))
        .unwrap();
    send(app, request).await
}

pub async fn post_json_auth(app: Router, uri: &str, token: &str, body: Value) -> Response {
    let request = json_request(Method::POST, uri)
        .header("authorization", format!("Bearer {token}"))
        .body(Body::from(body.to_string()))
        .unwrap();
    send(app, request).await
}

pub async fn put_json_auth(app: Router, uri: &str, token: &str, body: Value) -> Response {
    let request = json_request(Method::PUT, uri)
        .header("authorization", format!("Bearer {token}"))
        .body(Body::from(body.to_string()))
        .unwrap();
    send(app, request).await
}

pub async fn post_json_key(app: Router, uri: &str, api_key: &str, body: Value) -> Response {
    let request = json_request(Method::POST, uri)
        .header("x-api-key", api_key)
        .body(Body::from(body.to_string()))
        .unwrap();
    send(app, request).await
}

pub async fn body_json(response: Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
