//! Stored nodes and their conversions to interpreter-level views.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::metadata::{parse_bool, NodeMetadata, Property};
use super::token::{
    AggregationFn, ColumnDataType, ColumnNode, KnowledgeBaseKind, KnowledgeBaseNode, Operation,
    OperatorNode, TableNode, TokenNode,
};

/// The kind of semantic entity a node represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeType {
    Column,
    Table,
    KnowledgeBase,
    Operator,
    Value,
}

impl NodeType {
    /// The type name as stored in `nodes.type`.
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeType::Column => "Column",
            NodeType::Table => "Table",
            NodeType::KnowledgeBase => "KnowledgeBase",
            NodeType::Operator => "Operator",
            NodeType::Value => "Value",
        }
    }

    /// Parse a stored type name.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Column" => Some(NodeType::Column),
            "Table" => Some(NodeType::Table),
            "KnowledgeBase" => Some(NodeType::KnowledgeBase),
            "Operator" => Some(NodeType::Operator),
            "Value" => Some(NodeType::Value),
            _ => None,
        }
    }
}

/// A node as stored: identity plus its canonical metadata list.
///
/// Typed attributes (dimension flags, aggregation functions, default date
/// fields) are not stored directly; they are derived from the metadata rows
/// by the conversion methods below.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Row id in the store (0 before the node is persisted).
    pub id: i64,
    /// Stable unique id of the node.
    pub uid: Uuid,
    pub node_type: NodeType,
    /// UID of the parent node, when known.
    pub puid: Option<Uuid>,
    /// Id of the dataset the node belongs to.
    pub dataset_id: i64,
    pub metadata: Vec<NodeMetadata>,
}

impl Node {
    /// First metadata value recorded for a property.
    fn prop(&self, prop: Property) -> Option<&str> {
        self.metadata
            .iter()
            .find(|m| m.prop == prop.as_str())
            .map(|m| m.value.as_str())
    }

    fn prop_string(&self, prop: Property) -> String {
        self.prop(prop).unwrap_or_default().to_string()
    }

    /// Derive the column view. Unknown aggregation or data-type values fall
    /// back to their defaults silently.
    pub fn column_node(&self) -> ColumnNode {
        ColumnNode {
            uid: self.uid,
            word: self.prop_string(Property::Word),
            name: self.prop_string(Property::Name),
            description: self.prop_string(Property::Description),
            dimension: parse_bool(self.prop(Property::Dimension)),
            measure: parse_bool(self.prop(Property::Measure)),
            aggregation_fn: self
                .prop(Property::AggregationFn)
                .and_then(AggregationFn::parse)
                .unwrap_or_default(),
            data_type: self
                .prop(Property::DataType)
                .and_then(ColumnDataType::parse)
                .unwrap_or_default(),
            date_format: self.prop(Property::DateFormat).map(str::to_string),
            parent: None,
        }
    }

    /// Derive the table view. The default date field UID is decoded here;
    /// resolving it to a concrete column happens during dataset hydration.
    pub fn table_node(&self) -> TableNode {
        TableNode {
            uid: self.uid,
            word: self.prop_string(Property::Word),
            name: self.prop_string(Property::Name),
            description: self.prop_string(Property::Description),
            datastore_id: self
                .prop(Property::DatastoreId)
                .and_then(|v| v.parse().ok())
                .unwrap_or(0),
            default_date_field_uid: self
                .prop(Property::DefaultDateFieldUid)
                .and_then(|v| Uuid::parse_str(v).ok()),
            default_date_field: None,
        }
    }

    /// Derive the knowledge-base view.
    pub fn knowledge_base_node(&self) -> KnowledgeBaseNode {
        KnowledgeBaseNode {
            uid: self.uid,
            word: self.prop_string(Property::Word),
            name: self.prop_string(Property::Name),
            description: self.prop_string(Property::Description),
            kind: self
                .prop(Property::KbType)
                .and_then(KnowledgeBaseKind::parse)
                .unwrap_or_default(),
        }
    }

    /// Derive the operator view.
    pub fn operator_node(&self) -> OperatorNode {
        OperatorNode {
            uid: self.uid.to_string(),
            word: self.prop_string(Property::Word),
            operation: self
                .prop(Property::Operation)
                .and_then(Operation::parse)
                .unwrap_or_default(),
        }
    }

    /// Convert to the interpreter-level node, if this node type has one.
    /// Value nodes return `None`.
    pub fn token_node(&self) -> Option<TokenNode> {
        match self.node_type {
            NodeType::Column => Some(TokenNode::Column(self.column_node())),
            NodeType::Table => Some(TokenNode::Table(self.table_node())),
            NodeType::KnowledgeBase => Some(TokenNode::KnowledgeBase(self.knowledge_base_node())),
            NodeType::Operator => Some(TokenNode::Operator(self.operator_node())),
            NodeType::Value => None,
        }
    }

    /// Encode a column view back into a storable node. The inverse of
    /// [`Node::column_node`]; ids are left at 0 for the store to assign.
    pub fn from_column(dataset_id: i64, col: &ColumnNode) -> Node {
        let mut metadata = vec![
            NodeMetadata::new(Property::Word, &col.word),
            NodeMetadata::new(Property::Name, &col.name),
            NodeMetadata::new(Property::Description, &col.description),
            NodeMetadata::new(Property::Dimension, bool_str(col.dimension)),
            NodeMetadata::new(Property::Measure, bool_str(col.measure)),
            NodeMetadata::new(Property::AggregationFn, col.aggregation_fn.as_str()),
            NodeMetadata::new(Property::DataType, col.data_type.as_str()),
        ];
        if let Some(fmt) = &col.date_format {
            metadata.push(NodeMetadata::new(Property::DateFormat, fmt));
        }
        Node {
            id: 0,
            uid: col.uid,
            node_type: NodeType::Column,
            puid: col.parent.as_ref().map(|t| t.uid),
            dataset_id,
            metadata,
        }
    }

    /// Encode a table view back into a storable node. The inverse of
    /// [`Node::table_node`].
    pub fn from_table(dataset_id: i64, table: &TableNode) -> Node {
        let mut metadata = vec![
            NodeMetadata::new(Property::Word, &table.word),
            NodeMetadata::new(Property::Name, &table.name),
            NodeMetadata::new(Property::Description, &table.description),
            NodeMetadata::new(Property::DatastoreId, table.datastore_id.to_string()),
        ];
        if let Some(uid) = table.default_date_field_uid {
            metadata.push(NodeMetadata::new(
                Property::DefaultDateFieldUid,
                uid.to_string(),
            ));
        }
        Node {
            id: 0,
            uid: table.uid,
            node_type: NodeType::Table,
            puid: None,
            dataset_id,
            metadata,
        }
    }
}

fn bool_str(v: bool) -> &'static str {
    if v {
        "true"
    } else {
        "false"
    }
}
