//! The synchronization driver.
//!
//! One run walks `FETCHING_SCOPE -> FOR_EACH_SUBJECT(COUNTING -> TAGGING)
//! -> DONE`. Scope is order-scoped: a single windowed orders listing
//! enumerates every subject, which is then grouped by customer. Customers
//! fan out with bounded parallelism while each customer's own orders are
//! processed strictly sequentially in ascending creation-time order - the
//! sequence numbers depend on that order.
//!
//! A subject's terminal failure is logged and counted but never aborts
//! the run; only a scope-enumeration failure is fatal. Successful tag
//! writes are never rolled back - re-running the same window is the
//! recovery mechanism, which the calculator's idempotence makes safe.

use std::collections::BTreeMap;
use std::str::FromStr;

use futures::StreamExt;
use serde::Serialize;
use thiserror::Error;
use tracing::instrument;
use uuid::Uuid;

use order_tagger_core::tags::compute_tags;
use order_tagger_core::{CustomerId, DateWindow};

use crate::shopify::types::Order;
use crate::shopify::{AdminApiError, RestClient};

/// Default number of customers processed concurrently.
const DEFAULT_BATCH_SIZE: usize = 5;

/// How the driver determines a subject's prior order count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CountStrategy {
    /// A dedicated count query per subject, bounded just below its
    /// creation time. Authoritative: sees orders outside the sync window.
    #[default]
    Query,
    /// The subject's index within the fetched per-customer listing.
    /// Saves one request per subject but undercounts whenever the
    /// customer has orders before the window; only valid when the window
    /// is known to cover the customer's complete history.
    Position,
}

impl FromStr for CountStrategy {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "query" => Ok(Self::Query),
            "position" => Ok(Self::Position),
            other => Err(format!(
                "unknown count strategy '{other}' (expected 'query' or 'position')"
            )),
        }
    }
}

/// Driver tunables.
#[derive(Debug, Clone)]
pub struct SyncOptions {
    /// Maximum customers processed concurrently.
    pub batch_size: usize,
    /// Prior-order counting strategy.
    pub count_strategy: CountStrategy,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            count_strategy: CountStrategy::Query,
        }
    }
}

/// Fatal run errors.
///
/// Per-subject failures are not represented here - they are tallied in
/// the [`SyncReport`] and the run continues.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Listing the orders in scope failed after retries.
    #[error("Order enumeration failed: {0}")]
    Enumeration(#[source] AdminApiError),
}

/// Outcome of a completed run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    /// Orders returned by the scope listing.
    pub orders_seen: usize,
    /// Orders whose tags were written.
    pub orders_tagged: usize,
    /// Orders skipped for having no customer.
    pub orders_skipped: usize,
    /// Orders whose processing failed terminally.
    pub orders_failed: usize,
    /// Distinct customers with at least one order in scope.
    pub customers: usize,
}

#[derive(Debug, Default)]
struct CustomerTally {
    tagged: usize,
    failed: usize,
}

/// Recomputes order-sequence tags for every order in a date window.
pub struct OrderSequencer {
    client: RestClient,
    options: SyncOptions,
}

impl OrderSequencer {
    /// Create a driver over the given client.
    #[must_use]
    pub const fn new(client: RestClient, options: SyncOptions) -> Self {
        Self { client, options }
    }

    /// Run one synchronization pass over the window.
    ///
    /// # Errors
    ///
    /// Returns `SyncError::Enumeration` if the scope listing fails;
    /// everything downstream of enumeration is contained per subject.
    #[instrument(
        skip(self),
        fields(run_id = %Uuid::new_v4(), window = %window)
    )]
    pub async fn run(&self, window: &DateWindow) -> Result<SyncReport, SyncError> {
        let orders = self
            .client
            .orders_in_window(window)
            .await
            .map_err(SyncError::Enumeration)?;

        let mut report = SyncReport {
            orders_seen: orders.len(),
            ..SyncReport::default()
        };

        let mut by_customer: BTreeMap<CustomerId, Vec<Order>> = BTreeMap::new();
        for order in orders {
            if let Some(customer) = &order.customer {
                by_customer.entry(customer.id).or_default().push(order);
            } else {
                tracing::info!(order_id = %order.id, "order has no customer, skipping");
                report.orders_skipped += 1;
            }
        }
        report.customers = by_customer.len();

        tracing::info!(
            orders = report.orders_seen,
            customers = report.customers,
            skipped = report.orders_skipped,
            "scope fetched, tagging"
        );

        let tallies: Vec<CustomerTally> = futures::stream::iter(by_customer)
            .map(|(customer, orders)| self.process_customer(customer, orders))
            .buffer_unordered(self.options.batch_size.max(1))
            .collect()
            .await;

        for tally in tallies {
            report.orders_tagged += tally.tagged;
            report.orders_failed += tally.failed;
        }

        tracing::info!(
            tagged = report.orders_tagged,
            failed = report.orders_failed,
            skipped = report.orders_skipped,
            "sync run complete"
        );

        Ok(report)
    }

    /// Tag one customer's in-scope orders, oldest first.
    async fn process_customer(
        &self,
        customer: CustomerId,
        mut orders: Vec<Order>,
    ) -> CustomerTally {
        // The listing is requested ascending, but the sequence invariant
        // is this driver's to uphold, so sort locally as well.
        orders.sort_by_key(|order| (order.created_at, order.id));

        let mut tally = CustomerTally::default();
        for (position, order) in orders.iter().enumerate() {
            match self.process_order(customer, order, position).await {
                Ok(()) => tally.tagged += 1,
                Err(err) => {
                    tracing::error!(
                        %customer,
                        order_id = %order.id,
                        error = %err,
                        "failed to tag order, continuing run"
                    );
                    tally.failed += 1;
                }
            }
        }
        tally
    }

    /// Count, compute, and write back one subject's tags.
    async fn process_order(
        &self,
        customer: CustomerId,
        order: &Order,
        position: usize,
    ) -> Result<(), AdminApiError> {
        let prior_order_count = match self.options.count_strategy {
            CountStrategy::Query => {
                self.client
                    .count_orders_before(customer, order.created_at)
                    .await?
            }
            CountStrategy::Position => position as u64,
        };

        let tags = compute_tags(&order.tag_list(), prior_order_count);
        self.client.update_order_tags(order.id, &tags).await?;

        tracing::info!(
            %customer,
            order_id = %order.id,
            sequence = prior_order_count + 1,
            "order tagged"
        );
        Ok(())
    }
}
