//! Route definitions for member administration.

use axum::routing::get;
use axum::Router;

use crate::handlers::members;
use crate::state::AppState;

/// Routes merged at the API root.
///
/// ```text
/// GET    /users       -> list_members
/// GET    /user/{id}   -> get_member
/// DELETE /user/{id}   -> delete_member
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/users", get(members::list_members))
        .route(
            "/user/{id}",
            get(members::get_member).delete(members::delete_member),
        )
}
