//! Typed Admin REST API client.
//!
//! Wraps reqwest with the store's credential header and funnels every
//! request - reads and writes - through the shared [`RequestGate`], so
//! the aggregate request rate stays under the store's throughput ceiling
//! regardless of the read/write mix.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, SecondsFormat, TimeDelta, Utc};
use reqwest::StatusCode;
use reqwest::header::{HeaderMap, HeaderValue, RETRY_AFTER};
use secrecy::ExposeSecret;
use serde::de::DeserializeOwned;
use tracing::instrument;

use order_tagger_core::tags::join_tags;
use order_tagger_core::{CustomerId, DateWindow, OrderId};

use crate::config::ShopifyConfig;

use super::gate::RequestGate;
use super::pagination::{ListRequest, PAGE_LIMIT, next_page_info};
use super::types::{Order, OrderCount, OrdersPage, PageBody};
use super::AdminApiError;

/// Per-request timeout; retries are handled by the gate, so a hung
/// connection should fail fast rather than stall a run.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Fallback Retry-After when a 429 response omits the header.
const DEFAULT_RETRY_AFTER_SECS: u64 = 2;

/// Admin REST API client.
///
/// Cheap to clone; all clones share one HTTP connection pool and one
/// request gate.
#[derive(Debug, Clone)]
pub struct RestClient {
    inner: Arc<RestClientInner>,
}

#[derive(Debug)]
struct RestClientInner {
    http: reqwest::Client,
    base: String,
    api_version: String,
    gate: RequestGate,
}

impl RestClient {
    /// Create a client for the configured store, owning the given gate.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client fails to build or the access
    /// token is not a valid header value.
    pub fn new(config: &ShopifyConfig, gate: RequestGate) -> Result<Self, AdminApiError> {
        let mut headers = HeaderMap::new();
        let mut token = HeaderValue::from_str(config.access_token.expose_secret())
            .map_err(|e| AdminApiError::Parse(format!("Invalid access token: {e}")))?;
        token.set_sensitive(true);
        headers.insert("X-Shopify-Access-Token", token);

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        let base = config
            .api_base
            .clone()
            .unwrap_or_else(|| format!("https://{}", config.store));

        Ok(Self {
            inner: Arc::new(RestClientInner {
                http,
                base,
                api_version: config.api_version.clone(),
                gate,
            }),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/admin/api/{}/{path}",
            self.inner.base, self.inner.api_version
        )
    }

    /// Fetch every record of a listing call chain.
    ///
    /// Issues the template request, then follows `Link` header cursors
    /// until no `rel="next"` remains, preserving server order throughout.
    /// A page failure propagates as-is; nothing is cached across
    /// failures, so re-invoking restarts from the first page.
    ///
    /// # Errors
    ///
    /// Returns the gate's terminal error for the page that failed.
    pub async fn fetch_all<P: PageBody>(
        &self,
        request: &ListRequest,
    ) -> Result<Vec<P::Record>, AdminApiError> {
        let mut records = Vec::new();
        let mut cursor: Option<String> = None;
        let mut pages = 0_u32;

        loop {
            // Continuation requests may only carry limit + page_info; the
            // cursor encodes the original filters.
            let params: Vec<(String, String)> = match &cursor {
                None => request.params().to_vec(),
                Some(page_info) => vec![
                    ("limit".to_string(), PAGE_LIMIT.to_string()),
                    ("page_info".to_string(), page_info.clone()),
                ],
            };

            let (page, headers): (P, HeaderMap) = self.get(request.path(), &params).await?;
            let batch = page.into_records();
            pages += 1;
            tracing::debug!(
                path = request.path(),
                page = pages,
                records = batch.len(),
                "fetched listing page"
            );
            records.extend(batch);

            match next_page_info(&headers) {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }

        Ok(records)
    }

    /// All orders created inside the window, ascending by creation time.
    ///
    /// # Errors
    ///
    /// Returns an error if any listing page fails after retries.
    #[instrument(skip(self))]
    pub async fn orders_in_window(
        &self,
        window: &DateWindow,
    ) -> Result<Vec<Order>, AdminApiError> {
        let request = ListRequest::new("orders.json")
            .param("status", "any")
            .param("limit", PAGE_LIMIT)
            .param("order", "created_at asc")
            .param("created_at_min", format_bound(window.start()))
            .param("created_at_max", format_bound(window.end()));

        self.fetch_all::<OrdersPage>(&request).await
    }

    /// Number of the customer's orders created strictly before `cutoff`.
    ///
    /// The API's date filter is inclusive, so the bound is stepped back
    /// one second to exclude the subject order itself.
    ///
    /// # Errors
    ///
    /// Returns an error if the count request fails after retries.
    #[instrument(skip(self), fields(customer_id = %customer))]
    pub async fn count_orders_before(
        &self,
        customer: CustomerId,
        cutoff: DateTime<Utc>,
    ) -> Result<u64, AdminApiError> {
        let bound = cutoff - TimeDelta::seconds(1);
        let params = [
            ("customer_id".to_string(), customer.to_string()),
            ("status".to_string(), "any".to_string()),
            ("created_at_max".to_string(), format_bound(bound)),
        ];

        let (count, _headers): (OrderCount, HeaderMap) =
            self.get("orders/count.json", &params).await?;
        Ok(count.count)
    }

    /// Replace an order's tags.
    ///
    /// # Errors
    ///
    /// Returns an error if the update fails after retries.
    #[instrument(skip(self, tags), fields(order_id = %id))]
    pub async fn update_order_tags(
        &self,
        id: OrderId,
        tags: &[String],
    ) -> Result<(), AdminApiError> {
        let path = format!("orders/{id}.json");
        let body = serde_json::json!({
            "order": {
                "id": id,
                "tags": join_tags(tags),
            }
        });
        self.put(&path, &body).await
    }

    /// GET through the gate, returning the parsed body and the response
    /// headers (pagination needs the `Link` header).
    async fn get<P: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(String, String)],
    ) -> Result<(P, HeaderMap), AdminApiError> {
        let url = self.endpoint(path);
        self.inner
            .gate
            .run(path, || async {
                let response = self.inner.http.get(&url).query(params).send().await?;
                let response = check_status(response).await?;
                let headers = response.headers().clone();
                let body = response.json::<P>().await?;
                Ok((body, headers))
            })
            .await
    }

    /// PUT through the gate.
    async fn put(&self, path: &str, body: &serde_json::Value) -> Result<(), AdminApiError> {
        let url = self.endpoint(path);
        self.inner
            .gate
            .run(path, || async {
                let response = self.inner.http.put(&url).json(body).send().await?;
                check_status(response).await?;
                Ok(())
            })
            .await
    }
}

/// Map non-success responses to the error taxonomy.
async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, AdminApiError> {
    let status = response.status();

    if status == StatusCode::TOO_MANY_REQUESTS {
        let retry_after = response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.parse().ok())
            .unwrap_or(DEFAULT_RETRY_AFTER_SECS);
        return Err(AdminApiError::RateLimited(retry_after));
    }

    if !status.is_success() {
        let message = response.text().await.unwrap_or_default();
        return Err(AdminApiError::Api {
            status: status.as_u16(),
            message,
        });
    }

    Ok(response)
}

/// Format a window bound the way the API's date filters expect.
fn format_bound(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, true)
}
