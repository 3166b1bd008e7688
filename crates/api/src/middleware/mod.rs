//! Authentication extractors.
//!
//! - [`auth::AuthUser`] -- member session from a JWT Bearer token.
//! - [`api_key::ApiKeyAuth`] -- member identity from an API key.

pub mod api_key;
pub mod auth;
