//! Route definitions for the `/devices` resource.

use axum::routing::{delete, get, post};
use axum::Router;

use crate::handlers::devices;
use crate::state::AppState;

/// Routes mounted at `/devices`.
///
/// ```text
/// GET    /           -> list_devices
/// POST   /register   -> register_device
/// DELETE /{token}    -> delete_device
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(devices::list_devices))
        .route("/register", post(devices::register_device))
        .route("/{token}", delete(devices::delete_device))
}
