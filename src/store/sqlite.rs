//! SQLite-backed dataset catalog and the default aggregator.
//!
//! Schema bootstrap is idempotent (`CREATE TABLE IF NOT EXISTS`); the store
//! is safe to share behind an `Arc` and serializes connection access behind
//! a mutex. Queries run on the blocking thread pool when called through the
//! async trait implementations so the coordinator task is never parked on
//! file I/O.

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use thiserror::Error;
use uuid::Uuid;

use super::records::{DatasetRecord, DatasetUserMapping};
use super::{AggregateError, AggregateResult, DatasetAggregator, DatasetDirectory};
use crate::cache::Dataset;
use crate::model::{Node, NodeType};

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("stored uid {value:?} is not a valid UUID")]
    InvalidUid {
        value: String,
        #[source]
        source: uuid::Error,
    },

    #[error("unknown node type {0:?}")]
    UnknownNodeType(String),
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS datasets (
    id            INTEGER PRIMARY KEY AUTOINCREMENT,
    name          TEXT NOT NULL,
    description   TEXT NOT NULL DEFAULT '',
    user_id       INTEGER NOT NULL,
    source        TEXT NOT NULL,
    resource_id   INTEGER NOT NULL DEFAULT 0,
    table_created INTEGER NOT NULL DEFAULT 0,
    datastore_id  INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS dataset_user_mappings (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    dataset_id  INTEGER NOT NULL,
    user_id     INTEGER NOT NULL,
    access_type INTEGER NOT NULL DEFAULT 0
);
CREATE INDEX IF NOT EXISTS idx_mappings_user ON dataset_user_mappings(user_id);

CREATE TABLE IF NOT EXISTS nodes (
    id         INTEGER PRIMARY KEY AUTOINCREMENT,
    uid        TEXT NOT NULL,
    type       TEXT NOT NULL,
    puid       TEXT,
    dataset_id INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_nodes_dataset ON nodes(dataset_id);

CREATE TABLE IF NOT EXISTS node_metadatas (
    id         INTEGER PRIMARY KEY AUTOINCREMENT,
    node_id    INTEGER NOT NULL,
    dataset_id INTEGER NOT NULL,
    prop       TEXT NOT NULL,
    value      TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_metadatas_dataset ON node_metadatas(dataset_id);
"#;

/// The dataset catalog: datasets, user grants, nodes and node metadata.
pub struct MetaStore {
    conn: Mutex<Connection>,
}

impl MetaStore {
    /// Open (or create) a catalog at the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        Self::from_connection(Connection::open(path)?)
    }

    /// Open an in-memory catalog. Every instance is independent.
    pub fn open_in_memory() -> StoreResult<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> StoreResult<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Load a dataset row scoped by owner and id.
    pub fn dataset(&self, user_id: i64, id: i64) -> StoreResult<Option<DatasetRecord>> {
        let conn = self.conn();
        let record = conn
            .query_row(
                "SELECT id, name, description, user_id, source, resource_id, table_created, datastore_id
                 FROM datasets WHERE user_id = ?1 AND id = ?2",
                params![user_id, id],
                |row| {
                    Ok(DatasetRecord {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        description: row.get(2)?,
                        user_id: row.get(3)?,
                        source: row.get(4)?,
                        resource_id: row.get(5)?,
                        table_created: row.get(6)?,
                        datastore_id: row.get(7)?,
                    })
                },
            )
            .optional()?;
        Ok(record)
    }

    /// Insert a dataset row, returning its assigned id.
    pub fn insert_dataset(&self, record: &DatasetRecord) -> StoreResult<i64> {
        let conn = self.conn();
        conn.execute(
            "INSERT INTO datasets (name, description, user_id, source, resource_id, table_created, datastore_id)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                record.name,
                record.description,
                record.user_id,
                record.source,
                record.resource_id,
                record.table_created,
                record.datastore_id
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Grant a user access to a dataset, returning the mapping id.
    pub fn insert_mapping(&self, mapping: &DatasetUserMapping) -> StoreResult<i64> {
        let conn = self.conn();
        conn.execute(
            "INSERT INTO dataset_user_mappings (dataset_id, user_id, access_type)
             VALUES (?1, ?2, ?3)",
            params![mapping.dataset_id, mapping.user_id, mapping.access_type],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// The ids of every dataset the user has any access to, in grant order.
    pub fn user_dataset_ids(&self, user_id: i64) -> StoreResult<Vec<i64>> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare("SELECT dataset_id FROM dataset_user_mappings WHERE user_id = ?1 ORDER BY id")?;
        let ids = stmt
            .query_map(params![user_id], |row| row.get(0))?
            .collect::<Result<Vec<i64>, _>>()?;
        Ok(ids)
    }

    /// Every node of a dataset with its metadata attached, in row order.
    pub fn nodes_for_dataset(&self, dataset_id: i64) -> StoreResult<Vec<Node>> {
        let conn = self.conn();
        load_nodes(&conn, dataset_id, None)
    }

    /// The column nodes of a dataset with their metadata attached.
    pub fn columns(&self, dataset_id: i64) -> StoreResult<Vec<Node>> {
        let conn = self.conn();
        load_nodes(&conn, dataset_id, Some(NodeType::Column))
    }

    /// The table node of a dataset, if one exists.
    pub fn table(&self, dataset_id: i64) -> StoreResult<Option<Node>> {
        let conn = self.conn();
        let mut nodes = load_nodes(&conn, dataset_id, Some(NodeType::Table))?;
        Ok(if nodes.is_empty() {
            None
        } else {
            Some(nodes.remove(0))
        })
    }

    /// Insert a node and its metadata rows, returning the node's row id.
    pub fn insert_node(&self, node: &Node) -> StoreResult<i64> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;
        let id = insert_node_tx(&tx, node)?;
        tx.commit()?;
        Ok(id)
    }

    /// Create or update column nodes for a dataset in one transaction.
    ///
    /// Nodes with row id 0 are created with a fresh UID; existing nodes have
    /// their metadata rows saved in place. Any failure rolls the whole batch
    /// back. Returns the columns with assigned ids.
    pub fn upsert_columns(&self, dataset_id: i64, columns: Vec<Node>) -> StoreResult<Vec<Node>> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;
        let mut saved = Vec::with_capacity(columns.len());

        for mut node in columns {
            node.dataset_id = dataset_id;
            if node.id == 0 {
                node.uid = Uuid::new_v4();
                node.id = insert_node_tx(&tx, &node)?;
                for meta in &mut node.metadata {
                    meta.node_id = node.id;
                    meta.dataset_id = dataset_id;
                }
                // ids of the freshly inserted metadata rows
                let ids = metadata_ids(&tx, node.id)?;
                for (meta, id) in node.metadata.iter_mut().zip(ids) {
                    meta.id = id;
                }
            } else {
                for meta in &mut node.metadata {
                    meta.node_id = node.id;
                    meta.dataset_id = dataset_id;
                    if meta.id == 0 {
                        tx.execute(
                            "INSERT INTO node_metadatas (node_id, dataset_id, prop, value)
                             VALUES (?1, ?2, ?3, ?4)",
                            params![meta.node_id, meta.dataset_id, meta.prop, meta.value],
                        )?;
                        meta.id = tx.last_insert_rowid();
                    } else {
                        tx.execute(
                            "UPDATE node_metadatas SET prop = ?1, value = ?2 WHERE id = ?3",
                            params![meta.prop, meta.value, meta.id],
                        )?;
                    }
                }
            }
            saved.push(node);
        }

        tx.commit()?;
        Ok(saved)
    }
}

fn insert_node_tx(tx: &rusqlite::Transaction<'_>, node: &Node) -> StoreResult<i64> {
    tx.execute(
        "INSERT INTO nodes (uid, type, puid, dataset_id) VALUES (?1, ?2, ?3, ?4)",
        params![
            node.uid.to_string(),
            node.node_type.as_str(),
            node.puid.map(|u| u.to_string()),
            node.dataset_id
        ],
    )?;
    let id = tx.last_insert_rowid();
    for meta in &node.metadata {
        tx.execute(
            "INSERT INTO node_metadatas (node_id, dataset_id, prop, value)
             VALUES (?1, ?2, ?3, ?4)",
            params![id, node.dataset_id, meta.prop, meta.value],
        )?;
    }
    Ok(id)
}

fn metadata_ids(tx: &rusqlite::Transaction<'_>, node_id: i64) -> StoreResult<Vec<i64>> {
    let mut stmt = tx.prepare("SELECT id FROM node_metadatas WHERE node_id = ?1 ORDER BY id")?;
    let ids = stmt
        .query_map(params![node_id], |row| row.get(0))?
        .collect::<Result<Vec<i64>, _>>()?;
    Ok(ids)
}

fn load_nodes(
    conn: &Connection,
    dataset_id: i64,
    node_type: Option<NodeType>,
) -> StoreResult<Vec<Node>> {
    type Row = (i64, String, String, Option<String>, i64);

    let map_row = |row: &rusqlite::Row<'_>| -> rusqlite::Result<Row> {
        Ok((
            row.get(0)?,
            row.get(1)?,
            row.get(2)?,
            row.get(3)?,
            row.get(4)?,
        ))
    };

    let rows: Vec<Row> = match node_type {
        Some(ty) => {
            let mut stmt = conn.prepare(
                "SELECT id, uid, type, puid, dataset_id FROM nodes
                 WHERE dataset_id = ?1 AND type = ?2 ORDER BY id",
            )?;
            let rows = stmt.query_map(params![dataset_id, ty.as_str()], map_row)?;
            rows.collect::<Result<_, _>>()?
        }
        None => {
            let mut stmt = conn.prepare(
                "SELECT id, uid, type, puid, dataset_id FROM nodes
                 WHERE dataset_id = ?1 ORDER BY id",
            )?;
            let rows = stmt.query_map(params![dataset_id], map_row)?;
            rows.collect::<Result<_, _>>()?
        }
    };

    let mut nodes = Vec::with_capacity(rows.len());
    for (id, uid, ty, puid, dataset_id) in rows {
        nodes.push(Node {
            id,
            uid: parse_uid(&uid)?,
            node_type: NodeType::parse(&ty).ok_or(StoreError::UnknownNodeType(ty))?,
            puid: puid.as_deref().map(parse_uid).transpose()?,
            dataset_id,
            metadata: Vec::new(),
        });
    }

    attach_metadata(conn, dataset_id, &mut nodes)?;
    Ok(nodes)
}

fn attach_metadata(conn: &Connection, dataset_id: i64, nodes: &mut [Node]) -> StoreResult<()> {
    use std::collections::HashMap;

    let index: HashMap<i64, usize> = nodes
        .iter()
        .enumerate()
        .map(|(i, n)| (n.id, i))
        .collect();

    let mut stmt = conn.prepare(
        "SELECT id, node_id, dataset_id, prop, value FROM node_metadatas
         WHERE dataset_id = ?1 ORDER BY id",
    )?;
    let rows = stmt.query_map(params![dataset_id], |row| {
        Ok(crate::model::NodeMetadata {
            id: row.get(0)?,
            node_id: row.get(1)?,
            dataset_id: row.get(2)?,
            prop: row.get(3)?,
            value: row.get(4)?,
        })
    })?;

    for row in rows {
        let meta = row?;
        // Metadata for nodes filtered out of this load is skipped.
        if let Some(&i) = index.get(&meta.node_id) {
            nodes[i].metadata.push(meta);
        }
    }
    Ok(())
}

fn parse_uid(value: &str) -> StoreResult<Uuid> {
    Uuid::parse_str(value).map_err(|source| StoreError::InvalidUid {
        value: value.to_string(),
        source,
    })
}

/// The default [`DatasetAggregator`]: hydrates datasets straight from a
/// [`MetaStore`]. Also serves as the [`DatasetDirectory`] for dictionary
/// assembly.
pub struct SqliteAggregator {
    store: Arc<MetaStore>,
}

impl SqliteAggregator {
    pub fn new(store: Arc<MetaStore>) -> Self {
        Self { store }
    }

    /// The underlying catalog.
    pub fn store(&self) -> &Arc<MetaStore> {
        &self.store
    }
}

#[async_trait]
impl DatasetAggregator for SqliteAggregator {
    async fn fetch_dataset(&self, id: &str) -> AggregateResult<Dataset> {
        let dataset_id: i64 = id
            .parse()
            .map_err(|_| AggregateError::InvalidId(id.to_string()))?;

        let store = self.store.clone();
        let nodes = tokio::task::spawn_blocking(move || store.nodes_for_dataset(dataset_id))
            .await
            .map_err(|e| AggregateError::Source(format!("hydration task failed: {e}")))??;

        Ok(Dataset::from_nodes(nodes))
    }
}

#[async_trait]
impl DatasetDirectory for SqliteAggregator {
    async fn dataset_ids_for_user(&self, user_id: i64) -> AggregateResult<Vec<i64>> {
        let store = self.store.clone();
        let ids = tokio::task::spawn_blocking(move || store.user_dataset_ids(user_id))
            .await
            .map_err(|e| AggregateError::Source(format!("directory task failed: {e}")))??;
        Ok(ids)
    }
}
