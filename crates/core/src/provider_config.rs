//! Typed provider configuration documents.
//!
//! A provider's configuration is stored as a JSON document whose shape depends
//! on its [`ChannelKind`]. Each per-kind schema names its secret fields in
//! [`ProviderConfig::secret_slots_mut`]; those fields are always encrypted at
//! rest and only decrypted in a transient copy immediately before delivery.
//!
//! Fields are optional at parse time so that incomplete configurations can be
//! stored and later reported by [`ProviderConfig::check`]. An empty string is
//! treated the same as an absent field. Unknown keys are preserved verbatim.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::crypto::CredentialCipher;
use crate::error::CoreError;
use crate::notification::ChannelKind;

/// Message reported by [`ProviderConfig::check`] for a complete configuration.
pub const CONFIG_VALID_MESSAGE: &str = "configuration valid";

// ---------------------------------------------------------------------------
// Per-kind schemas
// ---------------------------------------------------------------------------

/// SMTP relay settings. `password` is secret.
#[derive(Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SmtpConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    /// Implicit TLS on connect. When `false` the session starts in plaintext
    /// and upgrades with STARTTLS.
    #[serde(default)]
    pub use_tls: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// SMS gateway settings. `auth_token` is secret.
#[derive(Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SmsConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_phone: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Firebase Cloud Messaging settings. `credential_json` and `server_key` are
/// secret.
#[derive(Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PushConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    /// Service-account JSON, stored as a string.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credential_json: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_key: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl std::fmt::Debug for SmtpConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("from", &self.from)
            .field("use_tls", &self.use_tls)
            .finish_non_exhaustive()
    }
}

impl std::fmt::Debug for SmsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmsConfig")
            .field("provider", &self.provider)
            .field("account_id", &self.account_id)
            .field("from_phone", &self.from_phone)
            .finish_non_exhaustive()
    }
}

impl std::fmt::Debug for PushConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PushConfig")
            .field("project_id", &self.project_id)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Tagged union
// ---------------------------------------------------------------------------

/// Outcome of [`ProviderConfig::check`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfigCheck {
    pub valid: bool,
    pub message: String,
}

/// Configuration document for one provider, tagged by channel kind.
#[derive(Debug, Clone, PartialEq)]
pub enum ProviderConfig {
    Smtp(SmtpConfig),
    Sms(SmsConfig),
    Push(PushConfig),
}

impl ProviderConfig {
    /// Parse a JSON document as the schema for `kind`.
    ///
    /// `null` parses as an empty configuration. Any other shape that does not
    /// fit the schema is a validation error. The error text never echoes
    /// document values.
    pub fn parse(kind: ChannelKind, document: &Value) -> Result<Self, CoreError> {
        let document = match document {
            Value::Null => Value::Object(Map::new()),
            other => other.clone(),
        };
        let invalid = |_: serde_json::Error| {
            CoreError::Validation(format!("invalid {kind} configuration document"))
        };

        Ok(match kind {
            ChannelKind::Smtp => Self::Smtp(serde_json::from_value(document).map_err(invalid)?),
            ChannelKind::Sms => Self::Sms(serde_json::from_value(document).map_err(invalid)?),
            ChannelKind::Push => Self::Push(serde_json::from_value(document).map_err(invalid)?),
        })
    }

    pub fn kind(&self) -> ChannelKind {
        match self {
            Self::Smtp(_) => ChannelKind::Smtp,
            Self::Sms(_) => ChannelKind::Sms,
            Self::Push(_) => ChannelKind::Push,
        }
    }

    /// Serialize back into the stored JSON document.
    pub fn to_document(&self) -> Value {
        let result = match self {
            Self::Smtp(c) => serde_json::to_value(c),
            Self::Sms(c) => serde_json::to_value(c),
            Self::Push(c) => serde_json::to_value(c),
        };
        // Plain structs of strings, integers and JSON maps always serialize.
        result.unwrap_or_else(|_| Value::Object(Map::new()))
    }

    /// The secret fields of this kind, by name.
    pub fn secret_slots_mut(&mut self) -> Vec<(&'static str, &mut Option<String>)> {
        match self {
            Self::Smtp(c) => vec![("password", &mut c.password)],
            Self::Sms(c) => vec![("auth_token", &mut c.auth_token)],
            Self::Push(c) => vec![
                ("credential_json", &mut c.credential_json),
                ("server_key", &mut c.server_key),
            ],
        }
    }

    /// Non-empty secret values currently held, for scrubbing error text.
    pub fn secret_values(&self) -> Vec<String> {
        let mut copy = self.clone();
        copy.secret_slots_mut()
            .into_iter()
            .filter_map(|(_, slot)| slot.clone())
            .filter(|value| !value.is_empty())
            .collect()
    }

    /// Return a copy with every non-empty secret field encrypted.
    pub fn encrypt_secrets(&self, cipher: &CredentialCipher) -> Result<Self, CoreError> {
        let mut sealed = self.clone();
        for (name, slot) in sealed.secret_slots_mut() {
            if let Some(value) = slot.as_mut() {
                *value = cipher
                    .encrypt(value)
                    .map_err(|e| CoreError::Internal(format!("{name}: {e}")))?;
            }
        }
        Ok(sealed)
    }

    /// Return a copy with every non-empty secret field decrypted.
    pub fn decrypt_secrets(&self, cipher: &CredentialCipher) -> Result<Self, CoreError> {
        let mut opened = self.clone();
        for (name, slot) in opened.secret_slots_mut() {
            if let Some(value) = slot.as_mut() {
                *value = cipher
                    .decrypt(value)
                    .map_err(|e| CoreError::Decryption(format!("{name}: {e}")))?;
            }
        }
        Ok(opened)
    }

    /// The first required field that is absent or empty, in schema order.
    pub fn first_missing_field(&self) -> Option<&'static str> {
        fn text(value: &Option<String>) -> bool {
            value.as_deref().is_some_and(|v| !v.is_empty())
        }

        let required: Vec<(&'static str, bool)> = match self {
            Self::Smtp(c) => vec![
                ("host", text(&c.host)),
                ("port", c.port.is_some_and(|p| p != 0)),
                ("username", text(&c.username)),
                ("password", text(&c.password)),
                ("from", text(&c.from)),
            ],
            Self::Sms(c) => vec![
                ("provider", text(&c.provider)),
                ("account_id", text(&c.account_id)),
                ("auth_token", text(&c.auth_token)),
                ("from_phone", text(&c.from_phone)),
            ],
            Self::Push(c) => vec![
                ("project_id", text(&c.project_id)),
                ("credential_json", text(&c.credential_json)),
            ],
        };

        required
            .into_iter()
            .find(|(_, present)| !present)
            .map(|(name, _)| name)
    }

    /// Report whether every required field is present.
    pub fn check(&self) -> ConfigCheck {
        match self.first_missing_field() {
            Some(field) => ConfigCheck {
                valid: false,
                message: format!("missing field: {field}"),
            },
            None => ConfigCheck {
                valid: true,
                message: CONFIG_VALID_MESSAGE.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use serde_json::json;

    use super::*;

    fn cipher() -> CredentialCipher {
        CredentialCipher::from_secret("0123456789abcdef0123456789abcdef")
    }

    fn smtp_document() -> Value {
        json!({
            "host": "smtp.example.com",
            "port": 587,
            "username": "mailer",
            "password": "hunter2",
            "from": "noreply@example.com",
            "use_tls": false
        })
    }

    #[test]
    fn parse_rejects_wrong_shape_without_echoing_values() {
        let doc = json!({ "port": "not-a-port-hunter2" });
        let err = ProviderConfig::parse(ChannelKind::Smtp, &doc).unwrap_err();
        assert_matches!(err, CoreError::Validation(_));
        assert!(!err.to_string().contains("hunter2"));

        assert!(ProviderConfig::parse(ChannelKind::Sms, &json!([1, 2])).is_err());
    }

    #[test]
    fn null_document_parses_as_empty() {
        let config = ProviderConfig::parse(ChannelKind::Push, &Value::Null).unwrap();
        assert_eq!(config.first_missing_field(), Some("project_id"));
    }

    #[test]
    fn encrypts_exactly_the_secret_fields() {
        let config = ProviderConfig::parse(ChannelKind::Smtp, &smtp_document()).unwrap();
        let sealed = config.encrypt_secrets(&cipher()).unwrap();
        let ProviderConfig::Smtp(ref smtp) = sealed else {
            panic!("kind changed");
        };
        assert_ne!(smtp.password.as_deref(), Some("hunter2"));
        assert_eq!(smtp.username.as_deref(), Some("mailer"));
        assert_eq!(smtp.host.as_deref(), Some("smtp.example.com"));

        assert_eq!(sealed.decrypt_secrets(&cipher()).unwrap(), config);
    }

    #[test]
    fn push_encrypts_both_secrets() {
        let doc = json!({
            "project_id": "demo",
            "credential_json": "{\"type\":\"service_account\"}",
            "server_key": "legacy-key"
        });
        let config = ProviderConfig::parse(ChannelKind::Push, &doc).unwrap();
        let sealed = config.encrypt_secrets(&cipher()).unwrap();
        let ProviderConfig::Push(ref push) = sealed else {
            panic!("kind changed");
        };
        assert_ne!(
            push.credential_json.as_deref(),
            Some("{\"type\":\"service_account\"}")
        );
        assert_ne!(push.server_key.as_deref(), Some("legacy-key"));
        assert_eq!(push.project_id.as_deref(), Some("demo"));
    }

    #[test]
    fn unknown_fields_survive_round_trip() {
        let mut doc = smtp_document();
        doc["reply_to"] = json!("support@example.com");
        let config = ProviderConfig::parse(ChannelKind::Smtp, &doc).unwrap();
        assert_eq!(config.to_document()["reply_to"], "support@example.com");
    }

    #[test]
    fn tampered_secret_is_a_decryption_error() {
        let mut doc = smtp_document();
        doc["password"] = json!("AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA");
        let config = ProviderConfig::parse(ChannelKind::Smtp, &doc).unwrap();
        assert_matches!(config.decrypt_secrets(&cipher()), Err(CoreError::Decryption(_)));
    }

    #[test]
    fn complete_smtp_config_checks_valid() {
        let config = ProviderConfig::parse(ChannelKind::Smtp, &smtp_document()).unwrap();
        assert_eq!(
            config.check(),
            ConfigCheck {
                valid: true,
                message: "configuration valid".into()
            }
        );
    }

    #[test]
    fn missing_or_empty_password_is_reported() {
        let mut doc = smtp_document();
        doc.as_object_mut().unwrap().remove("password");
        let config = ProviderConfig::parse(ChannelKind::Smtp, &doc).unwrap();
        assert_eq!(config.check().message, "missing field: password");
        assert!(!config.check().valid);

        doc["password"] = json!("");
        let config = ProviderConfig::parse(ChannelKind::Smtp, &doc).unwrap();
        assert_eq!(config.first_missing_field(), Some("password"));
    }

    #[test]
    fn sms_required_fields_in_order() {
        let doc = json!({ "provider": "twilio", "auth_token": "t" });
        let config = ProviderConfig::parse(ChannelKind::Sms, &doc).unwrap();
        assert_eq!(config.first_missing_field(), Some("account_id"));
    }

    #[test]
    fn debug_output_hides_secrets() {
        let config = ProviderConfig::parse(ChannelKind::Smtp, &smtp_document()).unwrap();
        assert!(!format!("{config:?}").contains("hunter2"));
        assert_eq!(config.secret_values(), ["hunter2"]);
    }
}
