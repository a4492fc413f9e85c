//! Integration tests for the dataset coordinator and its sweeper.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{
    dimension_column, drain_evictions, eviction_channel, measure_column, table, StubAggregator,
};
use lexica::cache::{CacheError, CacheOptions, DatasetCache, DatasetRequest, DictRequestKind};
use lexica::model::{AggregationFn, TokenNode};
use lexica::store::AggregatorSlot;

fn options(dataset_expiry: Duration) -> CacheOptions {
    CacheOptions {
        // Sweeps are posted manually in these tests.
        sweep_interval: Duration::from_secs(3600),
        dataset_expiry,
        request_timeout: Duration::from_secs(5),
    }
}

fn sales_nodes() -> Vec<lexica::model::Node> {
    vec![
        table(7, "sales", None),
        dimension_column(7, "region"),
        measure_column(7, "amount", AggregationFn::Sum),
    ]
}

fn stubbed_slot(aggregator: &Arc<StubAggregator>) -> AggregatorSlot {
    let slot = AggregatorSlot::new();
    slot.set(aggregator.clone());
    slot
}

#[tokio::test]
async fn test_cold_get_hydrates_and_caches() {
    let aggregator = Arc::new(StubAggregator::new());
    aggregator.insert("7", sales_nodes());
    let (sink, _rx) = eviction_channel();
    let cache = DatasetCache::spawn(options(Duration::from_secs(3600)), stubbed_slot(&aggregator), sink);

    let dataset = cache.get("7", "42").await.unwrap().expect("dataset should hydrate");
    assert_eq!(aggregator.fetches(), 1);

    let mut keys: Vec<&str> = dataset.tokens.keys().map(String::as_str).collect();
    keys.sort_unstable();
    assert_eq!(keys, ["amount", "region", "sales"]);

    // Columns carry a parent back-reference to the table.
    match &dataset.tokens["amount"].nodes[0] {
        TokenNode::Column(col) => {
            assert_eq!(col.aggregation_fn, AggregationFn::Sum);
            assert_eq!(col.parent.as_ref().unwrap().word, "sales");
        }
        other => panic!("unexpected node {other:?}"),
    }

    // A second get is served from memory.
    cache.get("7", "42").await.unwrap().expect("dataset should be cached");
    assert_eq!(aggregator.fetches(), 1);

    cache.shutdown().await;
}

#[tokio::test]
async fn test_failed_hydration_is_not_cached() {
    let aggregator = Arc::new(StubAggregator::new());
    aggregator.insert("7", sales_nodes());
    aggregator.fail("7");
    let (sink, _rx) = eviction_channel();
    let cache = DatasetCache::spawn(options(Duration::from_secs(3600)), stubbed_slot(&aggregator), sink);

    assert!(cache.get("7", "42").await.unwrap().is_none());
    assert_eq!(aggregator.fetches(), 1);

    // Once the backend recovers, the next get fetches again: no negative
    // result was stored.
    aggregator.recover("7");
    assert!(cache.get("7", "42").await.unwrap().is_some());
    assert_eq!(aggregator.fetches(), 2);

    cache.shutdown().await;
}

#[tokio::test]
async fn test_unconfigured_aggregator_leaves_subscribers_untouched() {
    let aggregator = Arc::new(StubAggregator::new());
    aggregator.insert("7", sales_nodes());
    let slot = AggregatorSlot::new();
    let (sink, mut rx) = eviction_channel();
    let cache = DatasetCache::spawn(options(Duration::from_secs(3600)), slot.clone(), sink);

    // No aggregator configured: get answers invalid without crashing.
    assert!(cache.get("7", "42").await.unwrap().is_none());

    // The failed get must not have subscribed "42": an update after the
    // aggregator appears fans out to nobody.
    slot.set(aggregator.clone());
    cache.update("7", "").await.unwrap().expect("update should hydrate");
    assert!(drain_evictions(&mut rx).is_empty());

    cache.shutdown().await;
}

#[tokio::test]
async fn test_update_fans_out_to_every_subscriber() {
    let aggregator = Arc::new(StubAggregator::new());
    aggregator.insert("7", sales_nodes());
    let (sink, mut rx) = eviction_channel();
    let cache = DatasetCache::spawn(options(Duration::from_secs(3600)), stubbed_slot(&aggregator), sink);

    cache.get("7", "42").await.unwrap();
    cache.get("7", "43").await.unwrap();
    cache.update("7", "42").await.unwrap();

    let mut evicted: Vec<String> = drain_evictions(&mut rx)
        .into_iter()
        .map(|msg| {
            assert_eq!(msg.kind, DictRequestKind::Remove);
            msg.id
        })
        .collect();
    evicted.sort_unstable();
    assert_eq!(evicted, ["42", "43"]);

    cache.shutdown().await;
}

#[tokio::test]
async fn test_repeat_gets_subscribe_once() {
    let aggregator = Arc::new(StubAggregator::new());
    aggregator.insert("7", sales_nodes());
    let (sink, mut rx) = eviction_channel();
    let cache = DatasetCache::spawn(options(Duration::from_secs(3600)), stubbed_slot(&aggregator), sink);

    cache.get("7", "42").await.unwrap();
    cache.get("7", "42").await.unwrap();
    cache.update("7", "42").await.unwrap();

    let evicted = drain_evictions(&mut rx);
    assert_eq!(evicted.len(), 1);
    assert_eq!(evicted[0].id, "42");

    cache.shutdown().await;
}

#[tokio::test]
async fn test_update_is_a_full_refetch() {
    let aggregator = Arc::new(StubAggregator::new());
    aggregator.insert("7", vec![table(7, "sales", None), dimension_column(7, "region")]);
    let (sink, _rx) = eviction_channel();
    let cache = DatasetCache::spawn(options(Duration::from_secs(3600)), stubbed_slot(&aggregator), sink);

    cache.get("7", "42").await.unwrap();

    // The persistent shape changed; an update must pick it up wholesale.
    aggregator.insert("7", vec![table(7, "sales", None), dimension_column(7, "territory")]);
    let refreshed = cache.update("7", "42").await.unwrap().unwrap();
    assert!(refreshed.tokens.contains_key("territory"));
    assert!(!refreshed.tokens.contains_key("region"));
    assert_eq!(aggregator.fetches(), 2);

    cache.shutdown().await;
}

#[tokio::test]
async fn test_sweep_evicts_idle_datasets_and_their_subscribers() {
    let aggregator = Arc::new(StubAggregator::new());
    aggregator.insert("7", sales_nodes());
    let (sink, mut rx) = eviction_channel();
    let cache = DatasetCache::spawn(options(Duration::from_millis(100)), stubbed_slot(&aggregator), sink);

    cache.get("7", "42").await.unwrap();
    assert_eq!(aggregator.fetches(), 1);

    tokio::time::sleep(Duration::from_millis(200)).await;
    cache.sweep().await.unwrap();

    // The entry is gone: the next get hydrates again.
    cache.get("7", "").await.unwrap();
    assert_eq!(aggregator.fetches(), 2);

    // The subscriber set was cleared with the entry, so the earlier "42"
    // subscription no longer fans out.
    cache.update("7", "").await.unwrap();
    assert!(drain_evictions(&mut rx).is_empty());

    cache.shutdown().await;
}

#[tokio::test]
async fn test_sweep_keeps_recently_used_datasets() {
    let aggregator = Arc::new(StubAggregator::new());
    aggregator.insert("7", sales_nodes());
    let (sink, _rx) = eviction_channel();
    let cache = DatasetCache::spawn(options(Duration::from_secs(3600)), stubbed_slot(&aggregator), sink);

    cache.get("7", "42").await.unwrap();
    cache.sweep().await.unwrap();
    cache.get("7", "42").await.unwrap();
    assert_eq!(aggregator.fetches(), 1);

    cache.shutdown().await;
}

#[tokio::test]
async fn test_zero_expiry_sweep_clears_everything() {
    let aggregator = Arc::new(StubAggregator::new());
    aggregator.insert("7", sales_nodes());
    aggregator.insert("8", sales_nodes());
    let (sink, _rx) = eviction_channel();
    let cache = DatasetCache::spawn(options(Duration::ZERO), stubbed_slot(&aggregator), sink);

    cache.get("7", "42").await.unwrap();
    cache.get("8", "42").await.unwrap();
    cache.sweep().await.unwrap();

    cache.get("7", "42").await.unwrap();
    cache.get("8", "42").await.unwrap();
    assert_eq!(aggregator.fetches(), 4);

    cache.shutdown().await;
}

#[tokio::test]
async fn test_slow_hydration_times_out_the_caller() {
    let aggregator = Arc::new(StubAggregator::new());
    aggregator.insert("7", sales_nodes());
    aggregator.set_delay(Duration::from_millis(500));
    let (sink, _rx) = eviction_channel();
    let cache = DatasetCache::spawn(
        CacheOptions {
            sweep_interval: Duration::from_secs(3600),
            dataset_expiry: Duration::from_secs(3600),
            request_timeout: Duration::from_millis(50),
        },
        stubbed_slot(&aggregator),
        sink,
    );

    match cache.get("7", "42").await {
        Err(CacheError::Timeout(_)) => {}
        other => panic!("expected timeout, got {other:?}"),
    }

    cache.shutdown().await;
}

#[tokio::test]
async fn test_requests_fail_after_shutdown() {
    let aggregator = Arc::new(StubAggregator::new());
    let (sink, _rx) = eviction_channel();
    let cache = DatasetCache::spawn(options(Duration::from_secs(3600)), stubbed_slot(&aggregator), sink);

    let input = cache.input();
    cache.shutdown().await;
    assert!(input.send(DatasetRequest::sweep()).await.is_err());
}
