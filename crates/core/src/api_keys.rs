//! Member API key generation and hashing.
//!
//! Keys are shown to the member exactly once. Only the SHA-256 digest is
//! persisted, and lookups hash the presented key before querying.

use rand::Rng;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Marker every issued key starts with.
pub const KEY_MARKER: &str = "ak_";

/// Number of random alphanumeric characters after [`KEY_MARKER`].
pub const KEY_RANDOM_LENGTH: usize = 40;

// ---------------------------------------------------------------------------
// Generation
// ---------------------------------------------------------------------------

/// A freshly issued API key.
pub struct GeneratedApiKey {
    /// The plaintext key (returned to the member once, never stored).
    pub plaintext: String,
    /// The SHA-256 hex digest of the plaintext (stored in `members.api_key_hash`).
    pub hash: String,
}

impl std::fmt::Debug for GeneratedApiKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeneratedApiKey")
            .field("hash", &self.hash)
            .finish_non_exhaustive()
    }
}

/// Generate a new random API key of the form `ak_<40 alphanumerics>`.
pub fn generate_api_key() -> GeneratedApiKey {
    let random: String = rand::rng()
        .sample_iter(&rand::distr::Alphanumeric)
        .take(KEY_RANDOM_LENGTH)
        .map(char::from)
        .collect();

    let plaintext = format!("{KEY_MARKER}{random}");
    let hash = hash_api_key(&plaintext);

    GeneratedApiKey { plaintext, hash }
}

// ---------------------------------------------------------------------------
// Hashing
// ---------------------------------------------------------------------------

/// Compute the SHA-256 hex digest of an API key.
pub fn hash_api_key(key: &str) -> String {
    crate::hashing::sha256_hex(key.as_bytes())
}
