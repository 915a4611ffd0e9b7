//! Schema node types and simple paths

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Declared type of a schema node
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemaType {
    String,
    Number,
    Integer,
    Boolean,
    Object,
    Array,
    Null,
    /// Sentinel for a node that declares no `type`
    #[serde(rename = "NOTYPE")]
    NoType,
}

impl SchemaType {
    pub fn from_json_type(type_str: &str) -> Option<Self> {
        match type_str {
            "string" => Some(Self::String),
            "number" => Some(Self::Number),
            "integer" => Some(Self::Integer),
            "boolean" => Some(Self::Boolean),
            "object" => Some(Self::Object),
            "array" => Some(Self::Array),
            "null" => Some(Self::Null),
            _ => None,
        }
    }

    /// Name as written in the schema document
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Number => "number",
            Self::Integer => "integer",
            Self::Boolean => "boolean",
            Self::Object => "object",
            Self::Array => "array",
            Self::Null => "null",
            Self::NoType => "NOTYPE",
        }
    }
}

impl fmt::Display for SchemaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Property-name segments from the root to a node, with `anyOf`, `$ref`
/// and `items` hops elided
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SimplePath(Vec<String>);

impl SimplePath {
    pub fn new(segments: Vec<String>) -> Self {
        Self(segments)
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }

    pub fn last(&self) -> Option<&str> {
        self.0.last().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// A copy of this path with `segment` appended
    pub fn child(&self, segment: impl Into<String>) -> Self {
        let mut segments = self.0.clone();
        segments.push(segment.into());
        Self(segments)
    }

    pub fn ends_with(&self, suffix: &[String]) -> bool {
        self.0.ends_with(suffix)
    }

    /// Dotted rendering, e.g. `encoding.x.field`
    pub fn dotted(&self) -> String {
        self.0.join(".")
    }
}

impl fmt::Display for SimplePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.0.join(", "))
    }
}

impl<S: Into<String>> FromIterator<S> for SimplePath {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

/// One typed position in the grammar tree
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaNode {
    /// Declared types in document order; `[NoType]` when absent
    pub types: Vec<SchemaType>,
    /// Allowed literal values, if the node is an enumeration
    pub enums: Option<BTreeSet<String>>,
    pub simple_path: SimplePath,
    /// Every hop taken to reach this node, for diagnostics
    pub full_path: Vec<String>,
    /// JSON pointer to the raw schema object within the document
    pub pointer: String,
    /// Whether the raw schema object carries a `type` keyword
    pub typed: bool,
}

impl SchemaNode {
    pub fn is_enum(&self) -> bool {
        self.enums.is_some()
    }

    /// Last simple-path segment, or "" for the root
    pub fn last_segment(&self) -> &str {
        self.simple_path.last().unwrap_or("")
    }
}
