//! Interpreter-level nodes, tokens and the user dictionary.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Aggregation function applied to a measure column.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum AggregationFn {
    Avg,
    #[default]
    Count,
    Sum,
}

impl AggregationFn {
    /// Parse a metadata value. Unknown values return `None`; callers fall
    /// back to the default (`count`).
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "avg" => Some(AggregationFn::Avg),
            "count" => Some(AggregationFn::Count),
            "sum" => Some(AggregationFn::Sum),
            _ => None,
        }
    }

    /// The metadata encoding of the function.
    pub fn as_str(&self) -> &'static str {
        match self {
            AggregationFn::Avg => "avg",
            AggregationFn::Count => "count",
            AggregationFn::Sum => "sum",
        }
    }
}

/// Data type of a column as the interpreter understands it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColumnDataType {
    Date,
    Float,
    Int,
    #[default]
    String,
}

impl ColumnDataType {
    /// Parse a metadata value. Unknown values return `None`; callers fall
    /// back to the default (`string`).
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "date" => Some(ColumnDataType::Date),
            "float" => Some(ColumnDataType::Float),
            "int" => Some(ColumnDataType::Int),
            "string" => Some(ColumnDataType::String),
            _ => None,
        }
    }

    /// The metadata encoding of the type.
    pub fn as_str(&self) -> &'static str {
        match self {
            ColumnDataType::Date => "date",
            ColumnDataType::Float => "float",
            ColumnDataType::Int => "int",
            ColumnDataType::String => "string",
        }
    }
}

/// Origin of a knowledge-base entry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum KnowledgeBaseKind {
    #[default]
    System,
    User,
}

impl KnowledgeBaseKind {
    /// Parse the `KBType` metadata encoding (`"1"` system, `"2"` user).
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "1" => Some(KnowledgeBaseKind::System),
            "2" => Some(KnowledgeBaseKind::User),
            _ => None,
        }
    }

    /// The metadata encoding of the kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            KnowledgeBaseKind::System => "1",
            KnowledgeBaseKind::User => "2",
        }
    }
}

/// Comparison operation carried by an operator node.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operation {
    #[default]
    Equal,
    NotEqual,
    Less,
    Greater,
    LessEq,
    GreaterEq,
    Has,
    Like,
}

impl Operation {
    /// Parse the `Operation` metadata encoding.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "=" => Some(Operation::Equal),
            "<>" => Some(Operation::NotEqual),
            "<" => Some(Operation::Less),
            ">" => Some(Operation::Greater),
            "<=" => Some(Operation::LessEq),
            ">=" => Some(Operation::GreaterEq),
            "HAS" => Some(Operation::Has),
            "LIKE" => Some(Operation::Like),
            _ => None,
        }
    }

    /// The operator symbol as it appears in metadata and query plans.
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Equal => "=",
            Operation::NotEqual => "<>",
            Operation::Less => "<",
            Operation::Greater => ">",
            Operation::LessEq => "<=",
            Operation::GreaterEq => ">=",
            Operation::Has => "HAS",
            Operation::Like => "LIKE",
        }
    }
}

/// A column surfaced to the interpreter.
///
/// `parent` is a transient back-reference constructed during hydration; it
/// points at the owning table and never escapes the hydrated dataset value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnNode {
    pub uid: Uuid,
    pub word: String,
    pub name: String,
    pub description: String,
    /// The column is groupable.
    pub dimension: bool,
    /// The column is aggregatable.
    pub measure: bool,
    pub aggregation_fn: AggregationFn,
    pub data_type: ColumnDataType,
    /// Parsing pattern when `data_type` is [`ColumnDataType::Date`].
    pub date_format: Option<String>,
    pub parent: Option<Arc<TableNode>>,
}

/// A table surfaced to the interpreter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableNode {
    pub uid: Uuid,
    pub word: String,
    pub name: String,
    pub description: String,
    /// Numeric id of the physical store holding the table's data.
    pub datastore_id: i64,
    /// UID of the column used as the default time axis, if the table
    /// declares one.
    pub default_date_field_uid: Option<Uuid>,
    /// The declared default date column, resolved against the dataset's
    /// column set during hydration. The embedded column carries no parent.
    pub default_date_field: Option<Box<ColumnNode>>,
}

/// A knowledge-base entry surfaced to the interpreter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeBaseNode {
    pub uid: Uuid,
    pub word: String,
    pub name: String,
    pub description: String,
    pub kind: KnowledgeBaseKind,
}

/// An operator surfaced to the interpreter.
///
/// Operator UIDs are strings: system operators use well-known names such as
/// `"equal-is"`, while store-backed operators carry their node UID.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperatorNode {
    pub uid: String,
    pub word: String,
    pub operation: Operation,
}

/// A node as the interpreter consumes it.
///
/// `Value` nodes never convert to this form; they exist only in the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum TokenNode {
    Column(ColumnNode),
    Table(TableNode),
    KnowledgeBase(KnowledgeBaseNode),
    Operator(OperatorNode),
}

impl TokenNode {
    /// The token word users type to reference this node.
    pub fn word(&self) -> &str {
        match self {
            TokenNode::Column(n) => &n.word,
            TokenNode::Table(n) => &n.word,
            TokenNode::KnowledgeBase(n) => &n.word,
            TokenNode::Operator(n) => &n.word,
        }
    }
}

/// A word together with every node it may refer to.
///
/// Multiple nodes under one token encode ambiguity; resolution is the
/// downstream interpreter's job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Token {
    pub word: String,
    pub nodes: Vec<TokenNode>,
}

impl Token {
    /// An empty token for the given word.
    pub fn new(word: impl Into<String>) -> Self {
        Self {
            word: word.into(),
            nodes: Vec::new(),
        }
    }
}

/// The user-facing dictionary: lowercase word to candidate nodes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dictionary {
    pub entries: HashMap<String, Token>,
}

impl Dictionary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Look up a token by its (already lowercased) key.
    pub fn get(&self, word: &str) -> Option<&Token> {
        self.entries.get(word)
    }

    /// Merge a token into the dictionary under its lowercased word.
    ///
    /// On collision the incoming nodes are appended to the existing entry,
    /// broadening ambiguity rather than overriding.
    pub fn merge_token(&mut self, token: Token) {
        let key = token.word.to_lowercase();
        match self.entries.get_mut(&key) {
            Some(existing) => existing.nodes.extend(token.nodes),
            None => {
                self.entries.insert(key, token);
            }
        }
    }
}
