//! Request handlers.
//!
//! Each submodule holds the async handler functions for one resource.
//! Handlers delegate to the services and datastore in [`AppState`] and map
//! errors via [`AppError`].
//!
//! [`AppState`]: crate::state::AppState
//! [`AppError`]: crate::error::AppError

pub mod auth;
pub mod devices;
pub mod logs;
pub mod members;
pub mod notifications;
pub mod providers;
