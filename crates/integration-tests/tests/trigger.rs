//! The HTTP trigger endpoint, driven over a real listener.

use reqwest::StatusCode;
use serde_json::Value;

use order_tagger_integration_tests::{MockShop, fast_rate_limit, ts};
use order_tagger_server::app;
use order_tagger_server::config::ServerConfig;
use order_tagger_server::state::AppState;
use order_tagger_server::sync::SyncOptions;

/// Spawn the trigger service wired to the mock shop; returns its base URL.
async fn spawn_app(shop: &MockShop) -> String {
    let config = ServerConfig {
        host: "127.0.0.1".parse().expect("valid host"),
        port: 0,
        shopify: shop.shopify_config(),
        rate_limit: fast_rate_limit(),
        sync: SyncOptions::default(),
        sentry_dsn: None,
    };
    let state = AppState::new(config).expect("state builds");

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind ephemeral port");
    let addr = listener.local_addr().expect("listener has a local addr");
    tokio::spawn(async move {
        axum::serve(listener, app(state)).await.expect("app server");
    });

    format!("http://{addr}")
}

#[tokio::test]
async fn test_health_endpoint() {
    let shop = MockShop::spawn().await;
    let base = spawn_app(&shop).await;

    let response = reqwest::get(format!("{base}/health"))
        .await
        .expect("health request succeeds");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.text().await.expect("body"), "ok");
}

#[tokio::test]
async fn test_form_is_served() {
    let shop = MockShop::spawn().await;
    let base = spawn_app(&shop).await;

    let body = reqwest::get(format!("{base}/"))
        .await
        .expect("form request succeeds")
        .text()
        .await
        .expect("body");
    assert!(body.contains("from_date"));
    assert!(body.contains("to_date"));
}

#[tokio::test]
async fn test_trigger_runs_sync_and_reports() {
    let shop = MockShop::spawn().await;
    shop.add_order(101, Some(7), ts("2024-01-01T10:00:00Z"), "");
    shop.add_order(102, Some(7), ts("2024-01-05T10:00:00Z"), "vip");
    let base = spawn_app(&shop).await;

    let client = reqwest::Client::new();
    let response = client
        .post(format!("{base}/sync"))
        .form(&[("from_date", "2024-01-01"), ("to_date", "2024-01-31")])
        .send()
        .await
        .expect("trigger request succeeds");

    assert_eq!(response.status(), StatusCode::OK);
    let report: Value = response.json().await.expect("report json");
    assert_eq!(report["orders_tagged"], 2);
    assert_eq!(shop.order_tags(102), "vip, 2, returning-customer");
}

#[tokio::test]
async fn test_trigger_missing_date_is_client_error() {
    let shop = MockShop::spawn().await;
    let base = spawn_app(&shop).await;

    let client = reqwest::Client::new();
    let response = client
        .post(format!("{base}/sync"))
        .form(&[("from_date", "2024-01-01")])
        .send()
        .await
        .expect("trigger request succeeds");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    // Validation happens before any remote call.
    assert_eq!(shop.list_calls(), 0);
}

#[tokio::test]
async fn test_trigger_rejects_reversed_window() {
    let shop = MockShop::spawn().await;
    let base = spawn_app(&shop).await;

    let client = reqwest::Client::new();
    let response = client
        .post(format!("{base}/sync"))
        .form(&[("from_date", "2024-02-01"), ("to_date", "2024-01-01")])
        .send()
        .await
        .expect("trigger request succeeds");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
