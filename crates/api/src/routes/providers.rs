//! Route definitions for the `/providers` resource.

use axum::routing::get;
use axum::Router;

use crate::handlers::providers;
use crate::state::AppState;

/// Routes mounted at `/providers`.
///
/// ```text
/// GET    /           -> list_providers
/// POST   /           -> create_provider
/// GET    /{id}       -> get_provider
/// PUT    /{id}       -> update_provider
/// DELETE /{id}       -> delete_provider
/// GET    /{id}/test  -> test_provider
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(providers::list_providers).post(providers::create_provider),
        )
        .route(
            "/{id}",
            get(providers::get_provider)
                .put(providers::update_provider)
                .delete(providers::delete_provider),
        )
        .route("/{id}/test", get(providers::test_provider))
}
