//! # Lexica
//!
//! Dataset dictionary cache for a natural-language query platform.
//!
//! Users phrase questions against datasets; an external interpreter tokenizes
//! those questions with a per-user **dictionary** mapping lowercase words to
//! candidate semantic nodes (tables, columns, operators, knowledge-base
//! entries). Lexica assembles and caches the per-dataset halves of those
//! dictionaries.
//!
//! ## Architecture
//!
//! ```text
//! DictionaryAssembler ──(mpsc)──▶ DatasetCoordinator ──▶ DatasetAggregator
//!         ▲                              │                 (persistent store)
//!         └───────(oneshot reply)────────┤
//!                                        └──▶ interpreter DICT eviction sink
//!
//! ExpirationSweeper ──(mpsc, periodic Remove)──▶ DatasetCoordinator
//! ```
//!
//! The coordinator is the single writer: it alone owns the in-memory dataset
//! table and the subscription index, consuming requests from one input
//! channel so every mutation is linearized. When a dataset is updated, every
//! user dictionary assembled from it is invalidated downstream through the
//! eviction sink.
//!
//! ## Quick start
//!
//! ```ignore
//! use std::sync::Arc;
//! use lexica::prelude::*;
//!
//! let store = Arc::new(MetaStore::open("lexica.db")?);
//! let source = Arc::new(SqliteAggregator::new(store));
//! AggregatorSlot::global().set(source.clone());
//!
//! let (evictions, _interpreter_rx) = tokio::sync::mpsc::unbounded_channel();
//! let cache = Arc::new(DatasetCache::spawn(
//!     CacheOptions::default(),
//!     AggregatorSlot::global(),
//!     evictions,
//! ));
//!
//! let assembler = DictionaryAssembler::new(source, cache);
//! let dict = assembler.assemble("42", false).await?;
//! ```

pub mod cache;
pub mod config;
pub mod dict;
pub mod model;
pub mod store;

/// Re-exports for convenient usage.
pub mod prelude {
    pub use crate::cache::{
        CacheError, CacheOptions, Dataset, DatasetCache, DictRequest, DictRequestKind,
        EvictionSink,
    };
    pub use crate::config::Settings;
    pub use crate::dict::{system_dictionary, DictError, DictionaryAssembler};
    pub use crate::model::{Dictionary, Node, NodeType, Token, TokenNode};
    pub use crate::store::{
        AggregateError, AggregatorSlot, DatasetAggregator, DatasetDirectory, MetaStore,
        SqliteAggregator,
    };
}
