//! Firebase Cloud Messaging HTTP v1 client.
//!
//! Authenticates with a service account: an RS256-signed JWT assertion is
//! exchanged for an OAuth2 access token, which is cached until shortly
//! before it expires.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use herald_core::error::CoreError;
use herald_core::provider_config::PushConfig;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tokio::time::Instant;

use super::push::{PushClient, PushConnector, PushMessage};
use super::SendError;

/// Base URL of the FCM HTTP v1 API.
pub const FCM_API_BASE: &str = "https://fcm.googleapis.com/v1/projects";

/// OAuth2 scope required to send messages.
pub const FCM_SCOPE: &str = "https://www.googleapis.com/auth/firebase.messaging";

const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ASSERTION_LIFETIME_SECS: i64 = 3600;
const TOKEN_REFRESH_MARGIN: Duration = Duration::from_secs(60);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// FCM error codes that mean the target token will never succeed.
const INVALID_TOKEN_CODES: [&str; 2] = ["UNREGISTERED", "INVALID_ARGUMENT"];

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct ServiceAccount {
    client_email: String,
    private_key: String,
    #[serde(default = "default_token_uri")]
    token_uri: String,
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

#[derive(Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

#[derive(Deserialize, Default)]
struct ErrorEnvelope {
    #[serde(default)]
    error: ErrorBody,
}

#[derive(Deserialize, Default)]
struct ErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: String,
    #[serde(default)]
    details: Vec<ErrorDetail>,
}

#[derive(Deserialize)]
struct ErrorDetail {
    #[serde(rename = "errorCode", default)]
    error_code: Option<String>,
}

/// Classify a non-success FCM response.
///
/// Either the top-level `status` or any detail `errorCode` naming an
/// invalid or unregistered token yields [`SendError::InvalidToken`].
pub fn classify_fcm_error(http_status: u16, body: &str) -> SendError {
    let envelope: ErrorEnvelope = serde_json::from_str(body).unwrap_or_default();
    let error = envelope.error;

    let invalid = INVALID_TOKEN_CODES.contains(&error.status.as_str())
        || error
            .details
            .iter()
            .filter_map(|d| d.error_code.as_deref())
            .any(|code| INVALID_TOKEN_CODES.contains(&code));

    let message = if error.message.is_empty() {
        format!("FCM returned HTTP {http_status}")
    } else {
        format!("FCM returned HTTP {http_status}: {}", error.message)
    };

    if invalid {
        SendError::InvalidToken(message)
    } else {
        SendError::Failed(message)
    }
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

struct AccessToken {
    value: String,
    refresh_at: Instant,
}

/// [`PushClient`] for one Firebase project.
pub struct FcmClient {
    http: reqwest::Client,
    project_id: String,
    client_email: String,
    token_uri: String,
    signing_key: EncodingKey,
    token: Mutex<Option<AccessToken>>,
}

impl FcmClient {
    fn send_url(&self) -> String {
        format!("{FCM_API_BASE}/{}/messages:send", self.project_id)
    }

    fn assertion(&self) -> Result<String, SendError> {
        let iat = chrono::Utc::now().timestamp();
        let claims = AssertionClaims {
            iss: &self.client_email,
            scope: FCM_SCOPE,
            aud: &self.token_uri,
            iat,
            exp: iat + ASSERTION_LIFETIME_SECS,
        };
        jsonwebtoken::encode(&Header::new(Algorithm::RS256), &claims, &self.signing_key)
            .map_err(|e| SendError::failed(format!("failed to sign FCM assertion: {e}")))
    }

    async fn access_token(&self) -> Result<String, SendError> {
        let mut cached = self.token.lock().await;
        if let Some(token) = cached.as_ref() {
            if Instant::now() < token.refresh_at {
                return Ok(token.value.clone());
            }
        }

        let assertion = self.assertion()?;
        let response = self
            .http
            .post(&self.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await
            .map_err(|e| SendError::failed(format!("FCM token request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(SendError::failed(format!(
                "FCM token endpoint returned HTTP {}",
                response.status().as_u16()
            )));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| SendError::failed(format!("FCM token response unreadable: {e}")))?;
        let lifetime = Duration::from_secs(token.expires_in).saturating_sub(TOKEN_REFRESH_MARGIN);
        *cached = Some(AccessToken {
            value: token.access_token.clone(),
            refresh_at: Instant::now() + lifetime,
        });
        Ok(token.access_token)
    }
}

#[async_trait]
impl PushClient for FcmClient {
    async fn send(&self, token: &str, message: &PushMessage) -> Result<(), SendError> {
        let access_token = self.access_token().await?;
        let payload = serde_json::json!({
            "message": {
                "token": token,
                "notification": { "title": message.title, "body": message.body },
                "data": message.data,
            }
        });

        let response = self
            .http
            .post(self.send_url())
            .bearer_auth(access_token)
            .json(&payload)
            .send()
            .await
            .map_err(|e| SendError::failed(format!("FCM request failed: {e}")))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let body = response.text().await.unwrap_or_default();
        Err(classify_fcm_error(status.as_u16(), &body))
    }
}

// ---------------------------------------------------------------------------
// Connector
// ---------------------------------------------------------------------------

/// Creates [`FcmClient`]s from decrypted PUSH provider settings.
pub struct FcmConnector {
    http: reqwest::Client,
}

impl FcmConnector {
    pub fn new() -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self { http })
    }
}

#[async_trait]
impl PushConnector for FcmConnector {
    async fn connect(&self, config: &PushConfig) -> Result<Arc<dyn PushClient>, CoreError> {
        let project_id = config
            .project_id
            .clone()
            .filter(|p| !p.is_empty())
            .ok_or_else(|| CoreError::configuration("missing field: project_id"))?;
        let raw = config
            .credential_json
            .as_deref()
            .filter(|c| !c.is_empty())
            .ok_or_else(|| CoreError::configuration("missing field: credential_json"))?;

        let account: ServiceAccount = serde_json::from_str(raw).map_err(|_| {
            CoreError::configuration("credential_json is not a service account document")
        })?;
        let signing_key = EncodingKey::from_rsa_pem(account.private_key.as_bytes())
            .map_err(|_| CoreError::configuration("service account private key is not valid PEM"))?;

        Ok(Arc::new(FcmClient {
            http: self.http.clone(),
            project_id,
            client_email: account.client_email,
            token_uri: account.token_uri,
            signing_key,
            token: Mutex::new(None),
        }))
    }
}
