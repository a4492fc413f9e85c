//! The cache entry for a single dataset and its hydration from nodes.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use crate::model::{Node, NodeType, Token, TokenNode};

/// A hydrated dataset: its token map plus the last time a producer asked
/// for it.
///
/// Keys are always `lowercase(token.word)`. `last_used` drives expiration;
/// it is touched only by the coordinator's Get handler.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub tokens: HashMap<String, Token>,
    pub last_used: Instant,
}

impl Dataset {
    /// A dataset with no tokens.
    pub fn empty() -> Self {
        Self {
            tokens: HashMap::new(),
            last_used: Instant::now(),
        }
    }

    /// Hydrate a dataset from its stored nodes.
    ///
    /// Reconstructs node parentage before any token is emitted: the single
    /// table node becomes the `parent` of every column, and a declared
    /// default date field UID is resolved against the column set and
    /// attached to the table. Value nodes and nodes without a word are
    /// skipped. Without a table node, column tokens are still emitted,
    /// just without a parent.
    pub fn from_nodes(nodes: Vec<Node>) -> Self {
        let table = nodes
            .iter()
            .find(|n| n.node_type == NodeType::Table)
            .map(|t| {
                let mut table = t.table_node();
                if let Some(ddf_uid) = table.default_date_field_uid {
                    table.default_date_field = nodes
                        .iter()
                        .find(|n| n.node_type != NodeType::Table && n.uid == ddf_uid)
                        .map(|n| Box::new(n.column_node()));
                }
                Arc::new(table)
            });

        let mut dataset = Dataset::empty();
        for node in &nodes {
            let Some(mut emitted) = node.token_node() else {
                continue;
            };
            match &mut emitted {
                TokenNode::Column(col) => col.parent = table.clone(),
                // The table emits its resolved form, default date field
                // attached.
                TokenNode::Table(tbl) => {
                    if let Some(resolved) = &table {
                        if resolved.uid == tbl.uid {
                            *tbl = resolved.as_ref().clone();
                        }
                    }
                }
                _ => {}
            }
            dataset.insert_node(emitted);
        }
        dataset
    }

    /// File a node under its lowercased word, creating the token entry if
    /// absent. Nodes without a word are dropped: the user has nothing to
    /// type for them.
    pub fn insert_node(&mut self, node: TokenNode) {
        let word = node.word().to_string();
        if word.is_empty() {
            return;
        }
        let token = self
            .tokens
            .entry(word.to_lowercase())
            .or_insert_with(|| Token::new(&word));
        token.nodes.push(node);
    }
}
