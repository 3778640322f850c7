//! Cursor pagination over the Admin REST listing endpoints.
//!
//! Listing responses carry a `Link` header in which a `rel="next"` entry
//! holds the continuation URL; its `page_info` query parameter is the
//! opaque cursor for the following page. A cursor is only meaningful
//! within the listing call chain that produced it.

use reqwest::header::{HeaderMap, LINK};
use url::Url;

/// Maximum page size the Admin REST listing endpoints accept.
pub const PAGE_LIMIT: &str = "250";

/// Template for one listing call chain: the endpoint path plus its base
/// query filters.
///
/// Continuation requests do not reuse these filters - the API rejects
/// them alongside `page_info` - so the template is only applied to the
/// first request of a chain.
#[derive(Debug, Clone)]
pub struct ListRequest {
    path: String,
    params: Vec<(String, String)>,
}

impl ListRequest {
    /// Start a request template for an endpoint path relative to the API
    /// root, e.g. `orders.json`.
    #[must_use]
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            params: Vec::new(),
        }
    }

    /// Add a query parameter.
    #[must_use]
    pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push((key.into(), value.into()));
        self
    }

    /// Endpoint path.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Base query parameters for the first page.
    #[must_use]
    pub fn params(&self) -> &[(String, String)] {
        &self.params
    }
}

/// Extract the next-page cursor from a listing response's `Link` header.
///
/// Returns `None` when no `rel="next"` entry is present, which terminates
/// the pagination loop.
#[must_use]
pub fn next_page_info(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(LINK)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .find_map(|entry| {
            let (target, params) = entry.split_once(';')?;
            if !params.contains("rel=\"next\"") {
                return None;
            }
            let target = target.trim().trim_start_matches('<').trim_end_matches('>');
            let url = Url::parse(target).ok()?;
            url.query_pairs()
                .find(|(key, _)| key == "page_info")
                .map(|(_, value)| value.into_owned())
        })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use reqwest::header::HeaderValue;

    use super::*;

    fn headers_with_link(link: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(LINK, HeaderValue::from_str(link).unwrap());
        headers
    }

    #[test]
    fn test_extracts_next_cursor() {
        let headers = headers_with_link(
            "<https://shop.myshopify.com/admin/api/2024-07/orders.json?limit=250&page_info=abc123>; rel=\"next\"",
        );
        assert_eq!(next_page_info(&headers), Some("abc123".to_string()));
    }

    #[test]
    fn test_picks_next_among_multiple_relations() {
        let headers = headers_with_link(
            "<https://shop.myshopify.com/admin/api/2024-07/orders.json?page_info=prev1>; rel=\"previous\", \
             <https://shop.myshopify.com/admin/api/2024-07/orders.json?page_info=next1&limit=250>; rel=\"next\"",
        );
        assert_eq!(next_page_info(&headers), Some("next1".to_string()));
    }

    #[test]
    fn test_no_next_relation_means_done() {
        let headers = headers_with_link(
            "<https://shop.myshopify.com/admin/api/2024-07/orders.json?page_info=prev1>; rel=\"previous\"",
        );
        assert_eq!(next_page_info(&headers), None);
    }

    #[test]
    fn test_missing_header_means_done() {
        assert_eq!(next_page_info(&HeaderMap::new()), None);
    }

    #[test]
    fn test_list_request_accumulates_params() {
        let request = ListRequest::new("orders.json")
            .param("status", "any")
            .param("limit", PAGE_LIMIT);
        assert_eq!(request.path(), "orders.json");
        assert_eq!(
            request.params(),
            &[
                ("status".to_string(), "any".to_string()),
                ("limit".to_string(), "250".to_string()),
            ]
        );
    }
}
