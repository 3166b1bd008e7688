//! Route definitions for the `/logs` resource.

use axum::routing::get;
use axum::Router;

use crate::handlers::logs;
use crate::state::AppState;

/// Routes mounted at `/logs`.
///
/// ```text
/// GET /        -> list_logs
/// GET /stats   -> log_stats
/// GET /{id}    -> get_log
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(logs::list_logs))
        .route("/stats", get(logs::log_stats))
        .route("/{id}", get(logs::get_log))
}
