//! Row structs and insert/update DTOs.
//!
//! Each submodule contains a `FromRow` + `Serialize` entity struct matching
//! the database row and the input structs its repository accepts.

pub mod device_token;
pub mod member;
pub mod notification_log;
pub mod provider;
pub mod tenant;
