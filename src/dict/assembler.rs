//! Assembly of per-user dictionaries from cached datasets.

use std::sync::Arc;

use futures::future::join_all;
use thiserror::Error;
use tracing::{debug, error, warn};

use super::system::system_dictionary;
use crate::cache::{CacheError, DatasetCache};
use crate::model::Dictionary;
use crate::store::{AggregateError, DatasetDirectory};

/// Errors surfaced by dictionary assembly.
///
/// Unavailable datasets are not errors: a failed hydration or an elapsed
/// reply deadline skips that dataset and the rest of the dictionary still
/// assembles.
#[derive(Debug, Error)]
pub enum DictError {
    /// The user id is not a valid integer.
    #[error("user id is not an integer: {0:?}")]
    InvalidUserId(String),

    /// Enumerating the user's datasets failed.
    #[error(transparent)]
    Directory(#[from] AggregateError),

    /// The coordinator is no longer running.
    #[error(transparent)]
    Cache(#[from] CacheError),
}

/// Builds per-user dictionaries.
///
/// Datasets are requested concurrently, but replies merge in enumeration
/// order so assembly is deterministic; the system dictionary overlays last,
/// which also puts system nodes last within a colliding token.
pub struct DictionaryAssembler {
    directory: Arc<dyn DatasetDirectory>,
    cache: Arc<DatasetCache>,
}

impl DictionaryAssembler {
    pub fn new(directory: Arc<dyn DatasetDirectory>, cache: Arc<DatasetCache>) -> Self {
        Self { directory, cache }
    }

    /// Assemble the dictionary for a user.
    ///
    /// With `force_refresh`, every dataset is updated (dropped and
    /// rehydrated) instead of read, which also fans invalidations out to
    /// other subscribers of those datasets.
    pub async fn assemble(
        &self,
        user_id: &str,
        force_refresh: bool,
    ) -> Result<Dictionary, DictError> {
        let parsed: i64 = user_id.parse().map_err(|_| {
            error!(user = %user_id, "user id is not an integer");
            DictError::InvalidUserId(user_id.to_string())
        })?;

        let dataset_ids = self.directory.dataset_ids_for_user(parsed).await?;

        let requests = dataset_ids.iter().map(|dataset_id| {
            let id = dataset_id.to_string();
            async move {
                if force_refresh {
                    self.cache.update(&id, user_id).await
                } else {
                    self.cache.get(&id, user_id).await
                }
            }
        });
        let replies = join_all(requests).await;

        let mut dict = Dictionary::new();
        for (dataset_id, reply) in dataset_ids.iter().zip(replies) {
            match reply {
                Ok(Some(dataset)) => {
                    for (_, token) in dataset.tokens {
                        dict.merge_token(token);
                    }
                }
                Ok(None) => {
                    debug!(dataset = %dataset_id, "dataset unavailable, skipping");
                }
                Err(CacheError::Timeout(secs)) => {
                    warn!(dataset = %dataset_id, timeout_secs = secs, "dataset request timed out, skipping");
                }
                Err(err @ CacheError::Closed) => return Err(err.into()),
            }
        }

        for (_, token) in system_dictionary().entries {
            dict.merge_token(token);
        }

        Ok(dict)
    }
}
