//! Domain building blocks shared by every Herald crate.
//!
//! This crate has no internal dependencies so the datastore, the
//! notification services and the HTTP layer can all depend on it.

pub mod api_keys;
pub mod crypto;
pub mod error;
pub mod hashing;
pub mod notification;
pub mod provider_config;
pub mod types;
pub mod validation;
