//! Node metadata records and the recognized property vocabulary.

use serde::{Deserialize, Serialize};

/// A single `(property, value)` metadata row attached to a node.
///
/// The metadata list is the canonical storage for node attributes; the typed
/// views in [`crate::model::token`] are derived from it at read time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeMetadata {
    /// Row id in the store (0 before the row is persisted).
    pub id: i64,
    /// Id of the node this row belongs to.
    pub node_id: i64,
    /// Id of the dataset the node belongs to.
    pub dataset_id: i64,
    /// Property name, one of the [`Property`] vocabulary.
    pub prop: String,
    /// Property value, encoded as text.
    pub value: String,
}

impl NodeMetadata {
    /// A metadata row not yet persisted (ids filled in on write).
    pub fn new(prop: Property, value: impl Into<String>) -> Self {
        Self {
            id: 0,
            node_id: 0,
            dataset_id: 0,
            prop: prop.as_str().to_string(),
            value: value.into(),
        }
    }
}

/// Recognized metadata properties.
///
/// Unrecognized property names are carried through the store untouched but
/// have no effect on derived attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Property {
    /// The lowercased token string users type. Applies to all node types.
    Word,
    /// Human/display name.
    Name,
    /// Free-text description.
    Description,
    /// Column: the column is groupable.
    Dimension,
    /// Column: the column is aggregatable.
    Measure,
    /// Column: aggregation function (`avg`, `count`, `sum`).
    AggregationFn,
    /// Column: data type (`date`, `float`, `int`, `string`).
    DataType,
    /// Column: parsing pattern when the data type is `date`.
    DateFormat,
    /// Table: UID of the column used as the default time axis.
    DefaultDateFieldUid,
    /// Table: numeric id of the physical store.
    DatastoreId,
    /// Knowledge base: `"1"` system, `"2"` user.
    KbType,
    /// Operator: operator symbol, e.g. `"="` or `"HAS"`.
    Operation,
}

impl Property {
    /// The property name as stored in `node_metadatas.prop`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Property::Word => "Word",
            Property::Name => "Name",
            Property::Description => "Description",
            Property::Dimension => "Dimension",
            Property::Measure => "Measure",
            Property::AggregationFn => "AggregationFn",
            Property::DataType => "DataType",
            Property::DateFormat => "DateFormat",
            Property::DefaultDateFieldUid => "DefaultDateFieldUID",
            Property::DatastoreId => "DatastoreID",
            Property::KbType => "KBType",
            Property::Operation => "Operation",
        }
    }

    /// Parse a stored property name.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Word" => Some(Property::Word),
            "Name" => Some(Property::Name),
            "Description" => Some(Property::Description),
            "Dimension" => Some(Property::Dimension),
            "Measure" => Some(Property::Measure),
            "AggregationFn" => Some(Property::AggregationFn),
            "DataType" => Some(Property::DataType),
            "DateFormat" => Some(Property::DateFormat),
            "DefaultDateFieldUID" => Some(Property::DefaultDateFieldUid),
            "DatastoreID" => Some(Property::DatastoreId),
            "KBType" => Some(Property::KbType),
            "Operation" => Some(Property::Operation),
            _ => None,
        }
    }
}

/// Decode a boolean metadata value. Anything other than `"true"` is false.
pub fn parse_bool(value: Option<&str>) -> bool {
    matches!(value, Some("true"))
}
