//! HTTP routes for the trigger service.

mod sync;

use axum::Router;
use axum::routing::{get, post};

use crate::middleware;
use crate::state::AppState;

/// Build the application routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(sync::form))
        .route(
            "/sync",
            post(sync::trigger).layer(middleware::trigger_rate_limiter()),
        )
}
