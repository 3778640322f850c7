//! End-to-end synchronization runs against the mock API.

use order_tagger_core::DateWindow;
use order_tagger_integration_tests::{MockShop, ts};
use order_tagger_server::sync::{CountStrategy, SyncOptions, SyncReport};

fn january() -> DateWindow {
    DateWindow::parse("2024-01-01", "2024-01-31").expect("valid window")
}

/// A customer's first and second order in one window: O1 (no tags) and
/// O2 (tags=[vip]).
#[tokio::test]
async fn test_first_and_second_order_tagged() {
    let shop = MockShop::spawn().await;
    shop.add_order(101, Some(7), ts("2024-01-01T10:00:00Z"), "");
    shop.add_order(102, Some(7), ts("2024-01-05T10:00:00Z"), "vip");

    let report = shop
        .sequencer(SyncOptions::default())
        .run(&january())
        .await
        .expect("run succeeds");

    assert_eq!(shop.order_tags(101), "1, new-customer");
    assert_eq!(shop.order_tags(102), "vip, 2, returning-customer");
    assert_eq!(
        report,
        SyncReport {
            orders_seen: 2,
            orders_tagged: 2,
            orders_skipped: 0,
            orders_failed: 0,
            customers: 1,
        }
    );
}

/// An order with `customer: null` is skipped: no write is issued for it
/// and the run still completes.
#[tokio::test]
async fn test_order_without_customer_is_skipped() {
    let shop = MockShop::spawn().await;
    shop.add_order(201, None, ts("2024-01-02T08:00:00Z"), "pos-sale");
    shop.add_order(202, Some(5), ts("2024-01-03T08:00:00Z"), "");

    let report = shop
        .sequencer(SyncOptions::default())
        .run(&january())
        .await
        .expect("run succeeds");

    assert_eq!(shop.put_attempts(201), 0);
    assert_eq!(shop.order_tags(201), "pos-sale");
    assert_eq!(shop.order_tags(202), "1, new-customer");
    assert_eq!(report.orders_skipped, 1);
    assert_eq!(report.orders_tagged, 1);
}

/// Re-running the same window converges: the second pass strips the
/// tags the first pass wrote and writes them back identically.
#[tokio::test]
async fn test_rerun_is_idempotent() {
    let shop = MockShop::spawn().await;
    shop.add_order(301, Some(3), ts("2024-01-04T12:00:00Z"), "wholesale");
    shop.add_order(302, Some(3), ts("2024-01-09T12:00:00Z"), "");

    let sequencer = shop.sequencer(SyncOptions::default());
    sequencer.run(&january()).await.expect("first run succeeds");
    let after_first = (shop.order_tags(301), shop.order_tags(302));

    let report = sequencer.run(&january()).await.expect("second run succeeds");

    assert_eq!((shop.order_tags(301), shop.order_tags(302)), after_first);
    assert_eq!(report.orders_tagged, 2);
    assert_eq!(shop.put_attempts(301), 2);
}

/// Query-based counting sees orders before the window; position-based
/// counting does not - the documented reason query is the default.
#[tokio::test]
async fn test_query_counting_sees_history_outside_window() {
    let shop = MockShop::spawn().await;
    shop.add_order(90, Some(9), ts("2023-12-15T10:00:00Z"), "");
    shop.add_order(91, Some(9), ts("2024-01-10T10:00:00Z"), "");

    shop.sequencer(SyncOptions::default())
        .run(&january())
        .await
        .expect("query run succeeds");

    // The December order is outside the window (never written) but still
    // counts toward the January order's sequence.
    assert_eq!(shop.put_attempts(90), 0);
    assert_eq!(shop.order_tags(91), "2, returning-customer");

    let position_options = SyncOptions {
        count_strategy: CountStrategy::Position,
        ..SyncOptions::default()
    };
    shop.sequencer(position_options)
        .run(&january())
        .await
        .expect("position run succeeds");

    // Position counting only sees the fetched window and undercounts.
    assert_eq!(shop.order_tags(91), "1, new-customer");
}

/// Position counting matches query counting when the window covers the
/// complete history.
#[tokio::test]
async fn test_position_counting_valid_over_complete_history() {
    let shop = MockShop::spawn().await;
    shop.add_order(401, Some(4), ts("2024-01-02T10:00:00Z"), "");
    shop.add_order(402, Some(4), ts("2024-01-06T10:00:00Z"), "");
    shop.add_order(403, Some(4), ts("2024-01-20T10:00:00Z"), "vip");

    let options = SyncOptions {
        count_strategy: CountStrategy::Position,
        ..SyncOptions::default()
    };
    shop.sequencer(options)
        .run(&january())
        .await
        .expect("run succeeds");

    assert_eq!(shop.order_tags(401), "1, new-customer");
    assert_eq!(shop.order_tags(402), "2, returning-customer");
    assert_eq!(shop.order_tags(403), "vip, 3, returning-customer");
    // No count queries were needed.
    assert_eq!(shop.count_calls(), 0);
}

/// Customers fan out; every customer's orders still sequence correctly.
#[tokio::test]
async fn test_multiple_customers_tagged_independently() {
    let shop = MockShop::spawn().await;
    for (customer, base_id) in [(11_i64, 500_i64), (12, 510), (13, 520)] {
        shop.add_order(base_id, Some(customer), ts("2024-01-03T09:00:00Z"), "");
        shop.add_order(base_id + 1, Some(customer), ts("2024-01-21T09:00:00Z"), "");
    }

    let report = shop
        .sequencer(SyncOptions::default())
        .run(&january())
        .await
        .expect("run succeeds");

    assert_eq!(report.customers, 3);
    assert_eq!(report.orders_tagged, 6);
    for base_id in [500_i64, 510, 520] {
        assert_eq!(shop.order_tags(base_id), "1, new-customer");
        assert_eq!(shop.order_tags(base_id + 1), "2, returning-customer");
    }
}

/// Transient write failures are retried behind the scenes; the run
/// reports success once the write lands.
#[tokio::test]
async fn test_write_retry_survives_transient_failures() {
    let shop = MockShop::spawn().await;
    shop.add_order(601, Some(6), ts("2024-01-05T15:00:00Z"), "");
    shop.fail_puts_for_order(601, 2);

    let report = shop
        .sequencer(SyncOptions::default())
        .run(&january())
        .await
        .expect("run succeeds");

    assert_eq!(shop.put_attempts(601), 3);
    assert_eq!(shop.order_tags(601), "1, new-customer");
    assert_eq!(report.orders_failed, 0);
}

/// A subject that keeps failing after retries is reported and skipped;
/// the rest of the run continues.
#[tokio::test]
async fn test_subject_failure_does_not_abort_run() {
    let shop = MockShop::spawn().await;
    shop.add_order(701, Some(71), ts("2024-01-05T15:00:00Z"), "");
    shop.add_order(702, Some(72), ts("2024-01-06T15:00:00Z"), "");
    shop.fail_puts_for_order(701, usize::MAX);

    let report = shop
        .sequencer(SyncOptions::default())
        .run(&january())
        .await
        .expect("run completes despite the failing subject");

    // max_attempts from the fast test gate config
    assert_eq!(shop.put_attempts(701), 5);
    assert_eq!(report.orders_failed, 1);
    assert_eq!(report.orders_tagged, 1);
    assert_eq!(shop.order_tags(702), "1, new-customer");
}

/// A scope enumeration failure is fatal: the run errors and nothing is
/// written.
#[tokio::test]
async fn test_enumeration_failure_is_fatal() {
    let shop = MockShop::spawn().await;
    shop.add_order(801, Some(8), ts("2024-01-05T15:00:00Z"), "");
    shop.fail_next_lists(usize::MAX);

    let result = shop
        .sequencer(SyncOptions::default())
        .run(&january())
        .await;

    assert!(result.is_err());
    assert_eq!(shop.total_puts(), 0);
    // The listing itself was retried before giving up.
    assert_eq!(shop.list_calls(), 5);
}
