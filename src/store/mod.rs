//! Persistent source for datasets and the pluggable aggregator seam.
//!
//! The cache never talks to storage directly: it goes through the
//! [`DatasetAggregator`] trait, whose sole contract is fetching a hydrated
//! dataset by id. A process-wide [`AggregatorSlot`] holds the default
//! implementation and supports hot-swapping at runtime; it is a
//! configuration sink, not shared mutable state on the cache path.

mod records;
mod sqlite;

use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use once_cell::sync::Lazy;
use thiserror::Error;

use crate::cache::Dataset;

pub use records::{
    DatasetRecord, DatasetUserMapping, ACCESS_TYPE_CREATOR, ACCESS_TYPE_DASHBOARD,
    DATASET_SOURCE_FILE,
};
pub use sqlite::{MetaStore, SqliteAggregator, StoreError, StoreResult};

/// Errors surfaced by dataset aggregation.
#[derive(Debug, Error)]
pub enum AggregateError {
    /// The dataset or user id is not a valid integer.
    #[error("id is not an integer: {0:?}")]
    InvalidId(String),

    /// The persistent store failed; the source error is returned verbatim.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// A non-store aggregation backend failed.
    #[error("aggregation source error: {0}")]
    Source(String),
}

/// Result type for aggregation operations.
pub type AggregateResult<T> = Result<T, AggregateError>;

/// The escape hatch to persistent storage.
///
/// `fetch_dataset` is a pure function of persistent state at call time: no
/// caching, safe to call concurrently from the coordinator hydration path.
#[async_trait]
pub trait DatasetAggregator: Send + Sync {
    /// Hydrate the dataset with the given id from persistent state.
    ///
    /// Returns an empty dataset when no rows exist; an error only for
    /// unparseable ids or persistence failures.
    async fn fetch_dataset(&self, id: &str) -> AggregateResult<Dataset>;
}

/// Enumerates the datasets a user may access.
#[async_trait]
pub trait DatasetDirectory: Send + Sync {
    /// The ids of every dataset mapped to the user, in stable order.
    async fn dataset_ids_for_user(&self, user_id: i64) -> AggregateResult<Vec<i64>>;
}

/// Holder of a [`DatasetAggregator`], swappable at runtime.
///
/// The mutex exists solely for hot-swapping; [`AggregatorSlot::get`] holds it
/// only across the handle clone and releases on every path, never across a
/// fetch.
#[derive(Clone, Default)]
pub struct AggregatorSlot {
    inner: Arc<Mutex<Option<Arc<dyn DatasetAggregator>>>>,
}

static DEFAULT_AGGREGATOR: Lazy<AggregatorSlot> = Lazy::new(AggregatorSlot::new);

impl AggregatorSlot {
    /// An empty slot. Useful for tests that must not observe the process
    /// default.
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide default slot.
    pub fn global() -> AggregatorSlot {
        DEFAULT_AGGREGATOR.clone()
    }

    /// Install an aggregator.
    pub fn set(&self, aggregator: Arc<dyn DatasetAggregator>) {
        *self.lock() = Some(aggregator);
    }

    /// Remove the installed aggregator, if any.
    pub fn clear(&self) {
        *self.lock() = None;
    }

    /// Clone out the current aggregator handle, or `None` when unconfigured.
    pub fn get(&self) -> Option<Arc<dyn DatasetAggregator>> {
        self.lock().clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<Arc<dyn DatasetAggregator>>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
