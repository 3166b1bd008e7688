//! Route definitions for the `/notifications` resource.

use axum::routing::post;
use axum::Router;

use crate::handlers::notifications;
use crate::state::AppState;

/// Routes mounted at `/notifications`. All require an API key.
///
/// ```text
/// POST /email  -> send_email
/// POST /sms    -> send_sms
/// POST /push   -> send_push
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/email", post(notifications::send_email))
        .route("/sms", post(notifications::send_sms))
        .route("/push", post(notifications::send_push))
}
