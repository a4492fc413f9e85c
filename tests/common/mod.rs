//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;
use uuid::Uuid;

use lexica::cache::{Dataset, DictRequest, EvictionSink};
use lexica::model::{AggregationFn, ColumnDataType, ColumnNode, Node, TableNode};
use lexica::store::{AggregateError, AggregateResult, DatasetAggregator, DatasetDirectory};

/// A dimension column node with the given word.
pub fn dimension_column(dataset_id: i64, word: &str) -> Node {
    Node::from_column(
        dataset_id,
        &ColumnNode {
            uid: Uuid::new_v4(),
            word: word.to_string(),
            name: word.to_string(),
            description: String::new(),
            dimension: true,
            measure: false,
            aggregation_fn: AggregationFn::Count,
            data_type: ColumnDataType::String,
            date_format: None,
            parent: None,
        },
    )
}

/// A measure column node with the given word and aggregation.
pub fn measure_column(dataset_id: i64, word: &str, aggregation_fn: AggregationFn) -> Node {
    Node::from_column(
        dataset_id,
        &ColumnNode {
            uid: Uuid::new_v4(),
            word: word.to_string(),
            name: word.to_string(),
            description: String::new(),
            dimension: false,
            measure: true,
            aggregation_fn,
            data_type: ColumnDataType::Float,
            date_format: None,
            parent: None,
        },
    )
}

/// A table node with the given word.
pub fn table(dataset_id: i64, word: &str, default_date_field: Option<Uuid>) -> Node {
    Node::from_table(
        dataset_id,
        &TableNode {
            uid: Uuid::new_v4(),
            word: word.to_string(),
            name: word.to_string(),
            description: String::new(),
            datastore_id: 1,
            default_date_field_uid: default_date_field,
            default_date_field: None,
        },
    )
}

/// In-memory aggregator with scriptable failures and latency.
#[derive(Default)]
pub struct StubAggregator {
    datasets: Mutex<HashMap<String, Vec<Node>>>,
    failing: Mutex<HashSet<String>>,
    delay: Mutex<Option<Duration>>,
    fetches: AtomicUsize,
}

impl StubAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, id: &str, nodes: Vec<Node>) {
        self.datasets.lock().unwrap().insert(id.to_string(), nodes);
    }

    /// Make fetches for `id` fail until [`StubAggregator::recover`].
    pub fn fail(&self, id: &str) {
        self.failing.lock().unwrap().insert(id.to_string());
    }

    pub fn recover(&self, id: &str) {
        self.failing.lock().unwrap().remove(id);
    }

    /// Delay every fetch, for deadline tests.
    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }

    /// Number of fetches observed so far.
    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DatasetAggregator for StubAggregator {
    async fn fetch_dataset(&self, id: &str) -> AggregateResult<Dataset> {
        self.fetches.fetch_add(1, Ordering::SeqCst);

        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if self.failing.lock().unwrap().contains(id) {
            return Err(AggregateError::Source("backend offline".to_string()));
        }

        let nodes = self
            .datasets
            .lock()
            .unwrap()
            .get(id)
            .cloned()
            .unwrap_or_default();
        Ok(Dataset::from_nodes(nodes))
    }
}

/// Fixed user-to-datasets mapping.
#[derive(Default)]
pub struct StubDirectory {
    grants: HashMap<i64, Vec<i64>>,
}

impl StubDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn grant(mut self, user_id: i64, dataset_ids: Vec<i64>) -> Self {
        self.grants.insert(user_id, dataset_ids);
        self
    }
}

#[async_trait]
impl DatasetDirectory for StubDirectory {
    async fn dataset_ids_for_user(&self, user_id: i64) -> AggregateResult<Vec<i64>> {
        Ok(self.grants.get(&user_id).cloned().unwrap_or_default())
    }
}

/// An eviction sink together with its receiving end.
pub fn eviction_channel() -> (EvictionSink, mpsc::UnboundedReceiver<DictRequest>) {
    mpsc::unbounded_channel()
}

/// Everything currently sitting in the eviction sink.
pub fn drain_evictions(rx: &mut mpsc::UnboundedReceiver<DictRequest>) -> Vec<DictRequest> {
    let mut messages = Vec::new();
    while let Ok(message) = rx.try_recv() {
        messages.push(message);
    }
    messages
}
