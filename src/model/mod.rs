//! Semantic model shared by the cache and the persistent store.
//!
//! A [`Node`] is a unit of meaning reconstructed from metadata rows: the
//! `(property, value)` list is the canonical storage, and the typed
//! interpreter-level views ([`TokenNode`] and friends) are derived from it at
//! read time. [`Token`] carries ambiguity (several nodes sharing one word);
//! [`Dictionary`] is the user-facing word map handed to the interpreter.

mod metadata;
mod node;
mod token;

pub use metadata::{parse_bool, NodeMetadata, Property};
pub use node::{Node, NodeType};
pub use token::{
    AggregationFn, ColumnDataType, ColumnNode, Dictionary, KnowledgeBaseKind, KnowledgeBaseNode,
    Operation, OperatorNode, TableNode, Token, TokenNode,
};
