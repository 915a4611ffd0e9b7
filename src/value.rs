//! Typed values
//!
//! A literal plus the semantic tag that drives schema matching. The tag, not
//! the literal's own JSON type, decides whether a value fits a position.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use crate::schema::SchemaType;

/// Semantic type discriminator of a [`TypedValue`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueTag {
    String,
    Number,
    Integer,
    Boolean,
    Object,
    Array,
    Null,
    /// A color name
    Color,
    /// A reference to a data field
    Field,
    /// A literal drawn from a schema enumeration
    Enum,
}

impl ValueTag {
    /// The plain tag carried by values of a declared schema type
    pub fn for_schema_type(schema_type: &SchemaType) -> Option<Self> {
        match schema_type {
            SchemaType::String => Some(Self::String),
            SchemaType::Number => Some(Self::Number),
            SchemaType::Integer => Some(Self::Integer),
            SchemaType::Boolean => Some(Self::Boolean),
            SchemaType::Object => Some(Self::Object),
            SchemaType::Array => Some(Self::Array),
            SchemaType::Null => Some(Self::Null),
            SchemaType::NoType => None,
        }
    }

    /// Tag name equals the declared type name
    pub fn is(&self, schema_type: &SchemaType) -> bool {
        Self::for_schema_type(schema_type) == Some(*self)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Number => "number",
            Self::Integer => "integer",
            Self::Boolean => "boolean",
            Self::Object => "object",
            Self::Array => "array",
            Self::Null => "null",
            Self::Color => "color",
            Self::Field => "field",
            Self::Enum => "enum",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "string" => Some(Self::String),
            "number" => Some(Self::Number),
            "integer" => Some(Self::Integer),
            "boolean" => Some(Self::Boolean),
            "object" => Some(Self::Object),
            "array" => Some(Self::Array),
            "null" => Some(Self::Null),
            "color" => Some(Self::Color),
            "field" => Some(Self::Field),
            "enum" => Some(Self::Enum),
            _ => None,
        }
    }
}

impl fmt::Display for ValueTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A literal tagged with its schema type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypedValue {
    pub value: Value,
    #[serde(rename = "schemaType")]
    pub schema_type: ValueTag,
}

impl TypedValue {
    pub fn new(value: impl Into<Value>, schema_type: ValueTag) -> Self {
        Self {
            value: value.into(),
            schema_type,
        }
    }

    /// Tag a value by its own JSON type
    pub fn infer(value: Value) -> Self {
        let schema_type = match &value {
            Value::String(_) => ValueTag::String,
            Value::Number(n) if n.is_i64() || n.is_u64() => ValueTag::Integer,
            Value::Number(_) => ValueTag::Number,
            Value::Bool(_) => ValueTag::Boolean,
            Value::Object(_) => ValueTag::Object,
            Value::Array(_) => ValueTag::Array,
            Value::Null => ValueTag::Null,
        };
        Self { value, schema_type }
    }

    /// Literal text: strings unquoted, everything else as JSON
    pub fn text(&self) -> String {
        match &self.value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

impl fmt::Display for TypedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.value, self.schema_type)
    }
}
