//! Route definitions for the `/auth` resource.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::auth;
use crate::state::AppState;

/// Routes mounted at `/auth`.
///
/// ```text
/// POST /regenerate-key  -> regenerate_key (requires bearer token)
/// GET  /verify-key      -> verify_key (requires API key)
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/regenerate-key", post(auth::regenerate_key))
        .route("/verify-key", get(auth::verify_key))
}
