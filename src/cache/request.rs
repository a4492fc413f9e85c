//! Message types flowing into and out of the coordinator.

use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, oneshot};

use super::dataset::Dataset;

/// What a [`DatasetRequest`] asks the coordinator to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    /// Return the dataset, hydrating it on a miss.
    Get,
    /// Drop and rehydrate the dataset, invalidating downstream dictionaries.
    Update,
    /// Sweep idle datasets out of memory. Carries no id and no reply.
    Remove,
}

/// A request to the dataset coordinator.
pub struct DatasetRequest {
    /// Id of the dataset.
    pub id: String,
    /// Id subscribing to the dataset, typically a user id. Names the
    /// downstream dictionary to evict when the dataset changes.
    pub subscribe_id: String,
    pub kind: RequestKind,
    /// Reply channel; `None` for sweeps.
    pub reply: Option<oneshot::Sender<DatasetReply>>,
}

impl DatasetRequest {
    pub fn get(
        id: impl Into<String>,
        subscribe_id: impl Into<String>,
        reply: oneshot::Sender<DatasetReply>,
    ) -> Self {
        Self {
            id: id.into(),
            subscribe_id: subscribe_id.into(),
            kind: RequestKind::Get,
            reply: Some(reply),
        }
    }

    pub fn update(
        id: impl Into<String>,
        subscribe_id: impl Into<String>,
        reply: oneshot::Sender<DatasetReply>,
    ) -> Self {
        Self {
            id: id.into(),
            subscribe_id: subscribe_id.into(),
            kind: RequestKind::Update,
            reply: Some(reply),
        }
    }

    /// A sweep request. Id and subscribe id are ignored by the handler.
    pub fn sweep() -> Self {
        Self {
            id: String::new(),
            subscribe_id: String::new(),
            kind: RequestKind::Remove,
            reply: None,
        }
    }
}

/// The coordinator's answer to a Get or Update.
///
/// `dataset` is `None` when the cache could not produce the dataset: a
/// failed hydration or no aggregator configured.
#[derive(Debug)]
pub struct DatasetReply {
    pub dataset: Option<Dataset>,
}

/// Kind of a downstream interpreter DICT request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DictRequestKind {
    /// Evict the dictionary entry.
    Remove,
}

/// Fire-and-forget message to the downstream interpreter DICT cache,
/// evicting the dictionary assembled for `id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DictRequest {
    /// The subscriber id whose dictionary must be evicted.
    pub id: String,
    pub kind: DictRequestKind,
}

impl DictRequest {
    pub fn remove(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: DictRequestKind::Remove,
        }
    }
}

/// Sink carrying eviction messages to the downstream interpreter DICT cache.
/// Unbounded so the coordinator never stalls on a slow consumer.
pub type EvictionSink = mpsc::UnboundedSender<DictRequest>;
