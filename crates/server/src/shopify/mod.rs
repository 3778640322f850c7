//! Shopify Admin REST API client.
//!
//! # Architecture
//!
//! - [`client::RestClient`] - thin typed wrapper over the Admin REST
//!   endpoints this service needs (order listing, order counting, tag
//!   updates)
//! - [`gate::RequestGate`] - the shared concurrency / spacing / retry gate
//!   every outbound request passes through, reads and writes alike
//! - [`pagination`] - `Link`-header cursor extraction and the listing
//!   request template consumed by `RestClient::fetch_all`
//! - [`types`] - serde wire types for the REST payloads
//!
//! The gate is constructed once and owned by the client; there is no
//! ambient global limiter state.

pub mod client;
pub mod gate;
pub mod pagination;
pub mod types;

pub use client::RestClient;
pub use gate::{RateLimitConfig, RequestGate};
pub use types::{CustomerRef, Order};

use thiserror::Error;

/// Errors that can occur when interacting with the Admin REST API.
#[derive(Debug, Error)]
pub enum AdminApiError {
    /// HTTP request failed (connect error, timeout, protocol error).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned a non-success response.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Rate limited by the API.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// Response or input could not be parsed.
    #[error("Parse error: {0}")]
    Parse(String),
}

impl AdminApiError {
    /// Whether retrying the request can plausibly succeed.
    ///
    /// Network failures, throttling, and 5xx responses are transient;
    /// 4xx responses, malformed response bodies, and parse failures are
    /// not.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Http(err) => !err.is_decode(),
            Self::RateLimited(_) => true,
            Self::Api { status, .. } => *status >= 500,
            Self::Parse(_) => false,
        }
    }
}
