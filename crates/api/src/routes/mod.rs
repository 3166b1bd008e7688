pub mod auth;
pub mod devices;
pub mod health;
pub mod logs;
pub mod members;
pub mod notifications;
pub mod providers;

use axum::routing::{get, post};
use axum::Router;

use crate::handlers;
use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /register                                        register (public)
/// /login                                           login (public)
/// /profile                                         member profile (bearer)
/// /users                                           tenant members (bearer)
/// /user/{id}                                       get, soft delete
///
/// /auth/regenerate-key                             new API key (bearer, POST)
/// /auth/verify-key                                 check API key (api key)
///
/// /providers                                       list, create (bearer)
/// /providers/{id}                                  get, update, delete
/// /providers/{id}/test                             config check (GET)
///
/// /notifications/email                             send email (api key, POST)
/// /notifications/sms                               send SMS (api key, POST)
/// /notifications/push                              send push (api key, POST)
///
/// /devices                                         list (bearer)
/// /devices/register                                register token (POST)
/// /devices/{token}                                 delete (DELETE)
///
/// /logs                                            list with filters (bearer)
/// /logs/stats                                      aggregate counts (GET)
/// /logs/{id}                                       get
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(handlers::auth::register))
        .route("/login", post(handlers::auth::login))
        .route("/profile", get(handlers::auth::profile))
        .merge(members::router())
        .nest("/auth", auth::router())
        .nest("/providers", providers::router())
        .nest("/notifications", notifications::router())
        .nest("/devices", devices::router())
        .nest("/logs", logs::router())
}
