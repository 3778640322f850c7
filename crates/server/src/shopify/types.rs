//! Serde wire types for the Admin REST API payloads this service touches.
//!
//! Only the fields the tagger reads are modelled; everything else in the
//! API's order representation is ignored on deserialization.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde::de::DeserializeOwned;

use order_tagger_core::tags::split_tags;
use order_tagger_core::{CustomerId, OrderId};

/// Reference to the customer who placed an order.
#[derive(Debug, Clone, Deserialize)]
pub struct CustomerRef {
    /// Customer ID.
    pub id: CustomerId,
}

/// An order as returned by the orders listing endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct Order {
    /// Order ID.
    pub id: OrderId,
    /// Owning customer; `null` for orders placed without an account
    /// (draft orders, some POS sales). Those are excluded from tagging.
    #[serde(default)]
    pub customer: Option<CustomerRef>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Current tags as one comma-separated string.
    #[serde(default)]
    pub tags: String,
}

impl Order {
    /// The order's tags as individual strings.
    #[must_use]
    pub fn tag_list(&self) -> Vec<String> {
        split_tags(&self.tags)
    }
}

/// Response envelope for a listing page.
///
/// The REST API wraps each collection in a keyed object
/// (`{"orders": [...]}`), so pagination is generic over the envelope
/// rather than the record type.
pub trait PageBody: DeserializeOwned {
    /// Record type carried by the page.
    type Record;

    /// Unwrap the page into its records, preserving server order.
    fn into_records(self) -> Vec<Self::Record>;
}

/// One page of the orders listing.
#[derive(Debug, Deserialize)]
pub struct OrdersPage {
    /// Orders in server-provided order.
    pub orders: Vec<Order>,
}

impl PageBody for OrdersPage {
    type Record = Order;

    fn into_records(self) -> Vec<Order> {
        self.orders
    }
}

/// Response of the order count endpoint.
#[derive(Debug, Deserialize)]
pub struct OrderCount {
    /// Number of matching orders.
    pub count: u64,
}
