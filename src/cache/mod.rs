//! The in-memory dataset cache and its coordination protocol.
//!
//! # Architecture
//!
//! ```text
//! producers (assemblers, API handlers)
//!        │  DatasetRequest via mpsc::channel(1)
//!        ▼
//! ┌─────────────────────────────────────────────┐
//! │ DatasetCoordinator (single task)            │
//! │   datasets:    id → Dataset                 │
//! │   subscribers: id → [subscribe_id]          │
//! └─────────────────────────────────────────────┘
//!        │ oneshot reply          │ on Update
//!        ▼                        ▼
//!    requester          interpreter DICT eviction sink
//! ```
//!
//! The coordinator alone reads and writes the two maps; every mutation is
//! linearized through its input channel. Replies go out on per-request
//! `oneshot` channels, which never block the coordinator and tolerate
//! callers that gave up. The [`ExpirationSweeper`] is just another producer:
//! expiration arrives as a periodic `Remove` request instead of a parallel
//! mutator.

mod coordinator;
mod dataset;
mod error;
mod request;
mod sweeper;

use std::time::Duration;

pub use coordinator::{DatasetCache, DatasetCoordinator};
pub use dataset::Dataset;
pub use error::{CacheError, CacheResult};
pub use request::{DatasetReply, DatasetRequest, DictRequest, DictRequestKind, EvictionSink, RequestKind};
pub use sweeper::ExpirationSweeper;

/// Interval between expiration sweeps.
pub const SWEEP_INTERVAL: Duration = Duration::from_secs(20 * 60);

/// Idle time after which a cached dataset expires.
pub const DATASET_EXPIRY: Duration = Duration::from_secs(4 * 60 * 60);

/// Deadline for a producer waiting on a coordinator reply.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Tunables for a [`DatasetCache`]. All injectable for tests.
#[derive(Debug, Clone, Copy)]
pub struct CacheOptions {
    /// How often the sweeper posts a `Remove` request.
    pub sweep_interval: Duration,
    /// Idle time after which a dataset is evicted by a sweep.
    pub dataset_expiry: Duration,
    /// Per-request reply deadline for producers.
    pub request_timeout: Duration,
}

impl Default for CacheOptions {
    fn default() -> Self {
        Self {
            sweep_interval: SWEEP_INTERVAL,
            dataset_expiry: DATASET_EXPIRY,
            request_timeout: REQUEST_TIMEOUT,
        }
    }
}
