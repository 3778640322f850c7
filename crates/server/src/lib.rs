//! Order Tagger Server - order sequence tagging service.
//!
//! Recomputes the "order sequence" classification (first vs. Nth
//! purchase) for every order a store's customers placed inside an
//! operator-selected date window, writing the result back as order tags
//! through the Shopify Admin REST API.
//!
//! # Architecture
//!
//! - [`shopify`] - Admin REST client: typed operations, `Link`-header
//!   pagination, and the shared rate-limited request gate every outbound
//!   call passes through
//! - [`sync`] - the synchronization driver that enumerates the window,
//!   computes each order's prior-order count, and writes recomputed tags
//! - [`routes`] - the `POST /sync` trigger endpoint plus a minimal form
//! - [`config`] / [`state`] / [`error`] / [`middleware`] - the usual
//!   service plumbing
//!
//! The tag calculation itself is pure and lives in `order-tagger-core`.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod shopify;
pub mod state;
pub mod sync;

use axum::{Router, routing::get};
use tower_http::trace::TraceLayer;

use state::AppState;

/// Build the application router: health probe plus the trigger routes.
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .merge(routes::routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check the Admin API.
async fn health() -> &'static str {
    "ok"
}
