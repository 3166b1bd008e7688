//! Field-level encryption for secrets stored inside provider configuration.
//!
//! Tokens are `base64(nonce || ciphertext || tag)` produced by AES-256-GCM
//! with a fresh 96-bit nonce per call. The empty string is passed through
//! unchanged in both directions so an absent secret stays absent.

use aes_gcm::aead::{Aead, AeadCore, KeyInit, OsRng};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

/// AES-256 key length in bytes.
pub const KEY_LEN: usize = 32;

/// AES-GCM nonce length in bytes.
pub const NONCE_LEN: usize = 12;

/// Development-only fallback secret used when `ENCRYPTION_KEY` is unset.
///
/// It is shorter than [`KEY_LEN`] and therefore zero-padded; deployments must
/// override it.
pub const DEV_FALLBACK_SECRET: &str = "default-32-byte-key-for-dev!!";

/// Error returned when a token cannot be turned back into plaintext.
#[derive(Debug, thiserror::Error)]
pub enum DecryptionError {
    #[error("ciphertext is not valid base64")]
    InvalidEncoding,

    #[error("ciphertext too short")]
    TooShort,

    #[error("ciphertext failed authentication")]
    Authentication,

    #[error("plaintext is not valid UTF-8")]
    InvalidUtf8,
}

/// Error returned when encryption itself fails (never expected in practice).
#[derive(Debug, thiserror::Error)]
#[error("encryption failed")]
pub struct EncryptionError;

/// Symmetric cipher for small secret strings.
///
/// Cheap to clone; holds only the derived key.
#[derive(Clone)]
pub struct CredentialCipher {
    key: Key<Aes256Gcm>,
}

impl std::fmt::Debug for CredentialCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialCipher").finish_non_exhaustive()
    }
}

impl CredentialCipher {
    /// Derive a cipher from a configured secret.
    ///
    /// Secrets shorter than 32 bytes are zero-padded and longer ones are
    /// truncated. Callers should check [`CredentialCipher::is_weak_secret`]
    /// and warn at startup.
    pub fn from_secret(secret: &str) -> Self {
        let mut key = [0u8; KEY_LEN];
        let bytes = secret.as_bytes();
        let len = bytes.len().min(KEY_LEN);
        key[..len].copy_from_slice(&bytes[..len]);
        Self {
            key: Key::<Aes256Gcm>::clone_from_slice(&key),
        }
    }

    /// `true` when the secret needs padding or is the built-in development
    /// default.
    pub fn is_weak_secret(secret: &str) -> bool {
        secret.len() < KEY_LEN || secret == DEV_FALLBACK_SECRET
    }

    /// Encrypt `plaintext` into a storable token. `""` maps to `""`.
    pub fn encrypt(&self, plaintext: &str) -> Result<String, EncryptionError> {
        if plaintext.is_empty() {
            return Ok(String::new());
        }

        let cipher = Aes256Gcm::new(&self.key);
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let ciphertext = cipher
            .encrypt(&nonce, plaintext.as_bytes())
            .map_err(|_| EncryptionError)?;

        let mut sealed = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        sealed.extend_from_slice(&nonce);
        sealed.extend_from_slice(&ciphertext);
        Ok(STANDARD.encode(sealed))
    }

    /// Decrypt a token produced by [`CredentialCipher::encrypt`]. `""` maps to `""`.
    pub fn decrypt(&self, token: &str) -> Result<String, DecryptionError> {
        if token.is_empty() {
            return Ok(String::new());
        }

        let data = STANDARD
            .decode(token)
            .map_err(|_| DecryptionError::InvalidEncoding)?;
        if data.len() < NONCE_LEN {
            return Err(DecryptionError::TooShort);
        }

        let (nonce, ciphertext) = data.split_at(NONCE_LEN);
        let cipher = Aes256Gcm::new(&self.key);
        let plaintext = cipher
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .map_err(|_| DecryptionError::Authentication)?;

        String::from_utf8(plaintext).map_err(|_| DecryptionError::InvalidUtf8)
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    fn cipher() -> CredentialCipher {
        CredentialCipher::from_secret("0123456789abcdef0123456789abcdef")
    }

    #[test]
    fn round_trips_non_empty_strings() {
        let c = cipher();
        let long = "x".repeat(4096);
        for s in ["p", "s3cr3t-password", "密碼與 emoji 🔐", long.as_str()] {
            let token = c.encrypt(s).unwrap();
            assert_ne!(token, s);
            assert_eq!(c.decrypt(&token).unwrap(), s);
        }
    }

    #[test]
    fn empty_string_is_identity_both_ways() {
        let c = cipher();
        assert_eq!(c.encrypt("").unwrap(), "");
        assert_eq!(c.decrypt("").unwrap(), "");
    }

    #[test]
    fn same_plaintext_encrypts_to_different_tokens() {
        let c = cipher();
        assert_ne!(c.encrypt("secret").unwrap(), c.encrypt("secret").unwrap());
    }

    #[test]
    fn flipping_any_byte_fails_authentication() {
        let c = cipher();
        let token = c.encrypt("smtp-password").unwrap();
        let raw = STANDARD.decode(&token).unwrap();

        for i in 0..raw.len() {
            let mut tampered = raw.clone();
            tampered[i] ^= 0x01;
            let result = c.decrypt(&STANDARD.encode(&tampered));
            assert_matches!(result, Err(DecryptionError::Authentication), "byte {i}");
        }
    }

    #[test]
    fn invalid_base64_is_rejected() {
        assert_matches!(
            cipher().decrypt("not base64 at all!"),
            Err(DecryptionError::InvalidEncoding)
        );
    }

    #[test]
    fn short_input_is_rejected() {
        let short = STANDARD.encode([0u8; NONCE_LEN - 1]);
        assert_matches!(cipher().decrypt(&short), Err(DecryptionError::TooShort));
    }

    #[test]
    fn wrong_key_fails_authentication() {
        let token = cipher().encrypt("secret").unwrap();
        let other = CredentialCipher::from_secret("another-key-another-key-another!");
        assert_matches!(other.decrypt(&token), Err(DecryptionError::Authentication));
    }

    #[test]
    fn short_and_long_secrets_are_normalised() {
        let padded = CredentialCipher::from_secret("short");
        let explicit =
            CredentialCipher::from_secret(&format!("short{}", "\0".repeat(KEY_LEN - 5)));
        let token = padded.encrypt("value").unwrap();
        assert_eq!(explicit.decrypt(&token).unwrap(), "value");

        let long = "L".repeat(64);
        let truncated = CredentialCipher::from_secret(&long[..KEY_LEN]);
        let token = CredentialCipher::from_secret(&long).encrypt("value").unwrap();
        assert_eq!(truncated.decrypt(&token).unwrap(), "value");
    }

    #[test]
    fn weak_secret_detection() {
        assert!(CredentialCipher::is_weak_secret(DEV_FALLBACK_SECRET));
        assert!(CredentialCipher::is_weak_secret("short"));
        assert!(!CredentialCipher::is_weak_secret(
            "0123456789abcdef0123456789abcdef"
        ));
    }
}
