//! Cache-specific error types.

use thiserror::Error;

/// Result type for cache operations.
pub type CacheResult<T> = Result<T, CacheError>;

/// Errors a producer can observe when talking to the coordinator.
///
/// Persistence failures never surface here: the coordinator reports those as
/// an invalid reply (no dataset) and the caller treats the dataset as
/// unavailable.
#[derive(Debug, Error)]
pub enum CacheError {
    /// The reply deadline elapsed before the coordinator answered.
    #[error("dataset request timed out after {0} seconds")]
    Timeout(u64),

    /// The coordinator task is no longer running.
    #[error("dataset coordinator is not running")]
    Closed,
}
