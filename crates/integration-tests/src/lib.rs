//! Integration test support: an in-process mock of the Admin REST API.
//!
//! [`MockShop`] serves the three endpoints the tagger uses - the orders
//! listing (with `Link`-header cursor pagination), the order count, and
//! the order update - backed by an in-memory order table. Tests seed
//! orders, point a [`RestClient`] at [`MockShop::shopify_config`], and
//! assert on the stored tags and the recorded request counts afterwards.
//!
//! Failure injection covers the retry scenarios: listing calls can be
//! made to fail N times (fatal-enumeration tests) and updates can fail
//! N times per order (transient-write and per-subject-failure tests).

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, HeaderValue, StatusCode, header};
use axum::routing::{get, put};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use secrecy::SecretString;
use serde_json::{Value, json};

use order_tagger_server::config::ShopifyConfig;
use order_tagger_server::shopify::{RateLimitConfig, RequestGate, RestClient};
use order_tagger_server::sync::{OrderSequencer, SyncOptions};

/// API version the mock serves and test configs request.
pub const API_VERSION: &str = "2024-07";

/// Default page size when the request omits `limit`.
const DEFAULT_PAGE_SIZE: usize = 50;

/// Parse an RFC 3339 timestamp in test fixtures.
///
/// # Panics
///
/// Panics on malformed input; fixtures are literals.
#[must_use]
pub fn ts(value: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(value)
        .expect("fixture timestamp is valid RFC 3339")
        .with_timezone(&Utc)
}

/// Gate tunables that keep tests fast while still exercising the
/// spacing and retry paths.
#[must_use]
pub fn fast_rate_limit() -> RateLimitConfig {
    RateLimitConfig {
        max_concurrent: 2,
        min_interval: Duration::from_millis(1),
        max_attempts: 5,
        retry_base_delay: Duration::from_millis(1),
    }
}

#[derive(Debug, Clone)]
struct StoredOrder {
    id: i64,
    customer_id: Option<i64>,
    created_at: DateTime<Utc>,
    tags: String,
}

impl StoredOrder {
    fn to_json(&self) -> Value {
        json!({
            "id": self.id,
            "customer": self.customer_id.map(|id| json!({"id": id})),
            "created_at": self.created_at.to_rfc3339(),
            "tags": self.tags,
        })
    }
}

#[derive(Debug, Default)]
struct ShopState {
    orders: Vec<StoredOrder>,
    list_calls: usize,
    count_calls: usize,
    put_attempts: HashMap<i64, usize>,
    fail_lists_remaining: usize,
    fail_puts: HashMap<i64, usize>,
}

#[derive(Clone)]
struct MockState {
    base_url: String,
    shop: Arc<Mutex<ShopState>>,
}

/// An in-process Admin REST API double bound to an ephemeral port.
pub struct MockShop {
    addr: SocketAddr,
    shop: Arc<Mutex<ShopState>>,
}

impl MockShop {
    /// Bind and spawn the mock server.
    ///
    /// # Panics
    ///
    /// Panics if no ephemeral port is available.
    pub async fn spawn() -> Self {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind ephemeral port");
        let addr = listener.local_addr().expect("listener has a local addr");

        let shop = Arc::new(Mutex::new(ShopState::default()));
        let state = MockState {
            base_url: format!("http://{addr}"),
            shop: Arc::clone(&shop),
        };

        let router = Router::new()
            .route("/admin/api/{version}/orders.json", get(list_orders))
            .route("/admin/api/{version}/orders/count.json", get(count_orders))
            .route("/admin/api/{version}/orders/{id}", put(update_order))
            .with_state(state);

        tokio::spawn(async move {
            axum::serve(listener, router).await.expect("mock server");
        });

        Self { addr, shop }
    }

    /// Base URL of the mock.
    #[must_use]
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// A client configuration pointing at this mock.
    #[must_use]
    pub fn shopify_config(&self) -> ShopifyConfig {
        ShopifyConfig {
            store: "mock-shop.myshopify.com".to_string(),
            api_version: API_VERSION.to_string(),
            access_token: SecretString::from("shpat_integration_0badc0de"),
            api_base: Some(self.base_url()),
        }
    }

    /// A `RestClient` with fast gate tunables pointing at this mock.
    ///
    /// # Panics
    ///
    /// Panics if the client cannot be built from the test config.
    #[must_use]
    pub fn client(&self) -> RestClient {
        RestClient::new(&self.shopify_config(), RequestGate::new(fast_rate_limit()))
            .expect("test client builds")
    }

    /// A driver over [`Self::client`] with the given options.
    #[must_use]
    pub fn sequencer(&self, options: SyncOptions) -> OrderSequencer {
        OrderSequencer::new(self.client(), options)
    }

    /// Seed one order.
    pub fn add_order(
        &self,
        id: i64,
        customer_id: Option<i64>,
        created_at: DateTime<Utc>,
        tags: &str,
    ) {
        self.lock().orders.push(StoredOrder {
            id,
            customer_id,
            created_at,
            tags: tags.to_string(),
        });
    }

    /// Current tag string of an order.
    ///
    /// # Panics
    ///
    /// Panics if the order does not exist.
    #[must_use]
    pub fn order_tags(&self, id: i64) -> String {
        self.lock()
            .orders
            .iter()
            .find(|order| order.id == id)
            .map(|order| order.tags.clone())
            .expect("order exists")
    }

    /// Number of listing page requests served (including injected failures).
    #[must_use]
    pub fn list_calls(&self) -> usize {
        self.lock().list_calls
    }

    /// Number of count requests served.
    #[must_use]
    pub fn count_calls(&self) -> usize {
        self.lock().count_calls
    }

    /// Number of update attempts for one order (including failures).
    #[must_use]
    pub fn put_attempts(&self, id: i64) -> usize {
        self.lock().put_attempts.get(&id).copied().unwrap_or(0)
    }

    /// Total update attempts across all orders.
    #[must_use]
    pub fn total_puts(&self) -> usize {
        self.lock().put_attempts.values().sum()
    }

    /// Make the next `n` listing requests fail with 500.
    pub fn fail_next_lists(&self, n: usize) {
        self.lock().fail_lists_remaining = n;
    }

    /// Make the next `n` update attempts for `id` fail with 500.
    pub fn fail_puts_for_order(&self, id: i64, n: usize) {
        self.lock().fail_puts.insert(id, n);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ShopState> {
        self.shop.lock().expect("mock state lock")
    }
}

/// Orders matching the request filters, in server order (ascending
/// creation time, ties by id).
fn matching_orders(shop: &ShopState, params: &HashMap<String, String>) -> Vec<StoredOrder> {
    let customer_id: Option<i64> = params.get("customer_id").and_then(|v| v.parse().ok());
    let created_min = params.get("created_at_min").map(|v| ts(v));
    let created_max = params.get("created_at_max").map(|v| ts(v));

    let mut orders: Vec<StoredOrder> = shop
        .orders
        .iter()
        .filter(|order| customer_id.is_none_or(|id| order.customer_id == Some(id)))
        .filter(|order| created_min.is_none_or(|min| order.created_at >= min))
        .filter(|order| created_max.is_none_or(|max| order.created_at <= max))
        .cloned()
        .collect();
    orders.sort_by_key(|order| (order.created_at, order.id));
    orders
}

async fn list_orders(
    State(state): State<MockState>,
    Path(version): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> (StatusCode, HeaderMap, Json<Value>) {
    assert_eq!(version, API_VERSION, "client requested unexpected version");

    let mut shop = state.shop.lock().expect("mock state lock");
    shop.list_calls += 1;

    if shop.fail_lists_remaining > 0 {
        shop.fail_lists_remaining -= 1;
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            HeaderMap::new(),
            Json(json!({"errors": "Internal Server Error"})),
        );
    }

    let limit: usize = params
        .get("limit")
        .and_then(|v| v.parse().ok())
        .unwrap_or(DEFAULT_PAGE_SIZE);
    let offset: usize = params
        .get("page_info")
        .and_then(|v| v.parse().ok())
        .unwrap_or(0);

    let orders = matching_orders(&shop, &params);
    let page: Vec<Value> = orders
        .iter()
        .skip(offset)
        .take(limit)
        .map(StoredOrder::to_json)
        .collect();

    let mut headers = HeaderMap::new();
    let mut links = Vec::new();
    if offset > 0 {
        links.push(format!(
            "<{}/admin/api/{API_VERSION}/orders.json?limit={limit}&page_info={}>; rel=\"previous\"",
            state.base_url,
            offset.saturating_sub(limit),
        ));
    }
    if offset + limit < orders.len() {
        links.push(format!(
            "<{}/admin/api/{API_VERSION}/orders.json?limit={limit}&page_info={}>; rel=\"next\"",
            state.base_url,
            offset + limit,
        ));
    }
    if !links.is_empty() {
        headers.insert(
            header::LINK,
            HeaderValue::from_str(&links.join(", ")).expect("link header is valid"),
        );
    }

    (StatusCode::OK, headers, Json(json!({"orders": page})))
}

async fn count_orders(
    State(state): State<MockState>,
    Path(version): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Json<Value> {
    assert_eq!(version, API_VERSION, "client requested unexpected version");

    let mut shop = state.shop.lock().expect("mock state lock");
    shop.count_calls += 1;

    let count = matching_orders(&shop, &params).len();
    Json(json!({"count": count}))
}

async fn update_order(
    State(state): State<MockState>,
    Path((version, id_segment)): Path<(String, String)>,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    assert_eq!(version, API_VERSION, "client requested unexpected version");

    // The REST path is `orders/{id}.json`; the suffix is part of the
    // final segment.
    let id: i64 = id_segment
        .trim_end_matches(".json")
        .parse()
        .expect("order id segment is numeric");

    let mut shop = state.shop.lock().expect("mock state lock");
    *shop.put_attempts.entry(id).or_insert(0) += 1;

    if let Some(remaining) = shop.fail_puts.get_mut(&id)
        && *remaining > 0
    {
        *remaining -= 1;
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"errors": "Internal Server Error"})),
        );
    }

    let tags = body["order"]["tags"]
        .as_str()
        .expect("update body carries order.tags")
        .to_string();

    let order = shop
        .orders
        .iter_mut()
        .find(|order| order.id == id)
        .expect("updated order exists");
    order.tags = tags;

    (StatusCode::OK, Json(json!({"order": order.to_json()})))
}
