//! Row types for the dataset catalog tables.

use serde::{Deserialize, Serialize};

/// Dataset source backed by an uploaded file.
pub const DATASET_SOURCE_FILE: &str = "FILE";

/// Minimum access: the user only sees the data through dashboards.
pub const ACCESS_TYPE_DASHBOARD: i64 = 0;

/// Full access: the user may update and delete the dataset.
pub const ACCESS_TYPE_CREATOR: i64 = 10;

/// A dataset registered on the platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetRecord {
    /// Row id in the store (0 before the row is persisted).
    pub id: i64,
    pub name: String,
    pub description: String,
    /// Owner of the dataset.
    pub user_id: i64,
    /// Source kind, e.g. [`DATASET_SOURCE_FILE`].
    pub source: String,
    /// Id of the underlying resource, e.g. the file id for file sources.
    pub resource_id: i64,
    /// Whether the physical table has been created in the datastore.
    pub table_created: bool,
    /// Id of the datastore where the data physically lives.
    pub datastore_id: i64,
}

/// Maps a dataset to a user together with the granted access level.
///
/// Both creator and dashboard grants appear here; the access type
/// distinguishes them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetUserMapping {
    /// Row id in the store (0 before the row is persisted).
    pub id: i64,
    pub dataset_id: i64,
    pub user_id: i64,
    /// [`ACCESS_TYPE_DASHBOARD`] or [`ACCESS_TYPE_CREATOR`].
    pub access_type: i64,
}
