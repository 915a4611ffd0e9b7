//! Visualization context
//!
//! The plot in progress plus the client's description of the data table,
//! rebuilt wholesale from each client request.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashSet};

/// One column of the client's data table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldInfo {
    pub name: String,
    /// Primitive data type: string, integer, number, boolean or date
    #[serde(rename = "type")]
    pub field_type: String,
    #[serde(default)]
    pub unique_count: Option<u64>,
    #[serde(default)]
    pub count: Option<u64>,
    #[serde(default)]
    pub probably_years: bool,
    #[serde(default)]
    pub source: bool,
}

impl FieldInfo {
    /// Vega-Lite measurement type suited to this column
    pub fn measurement(&self) -> &'static str {
        match self.field_type.as_str() {
            "integer" | "number" if self.probably_years => "temporal",
            "integer" | "number" => "quantitative",
            "date" => "temporal",
            _ => "nominal",
        }
    }
}

/// Plot and data schema supplied by the client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VegaContext {
    /// The Vega-Lite spec being edited
    pub context: Value,
    /// Data fields keyed by name
    #[serde(default)]
    pub schema: BTreeMap<String, FieldInfo>,
}

impl Default for VegaContext {
    fn default() -> Self {
        Self {
            context: Value::Object(Map::new()),
            schema: BTreeMap::new(),
        }
    }
}

impl VegaContext {
    /// Read `context` and `schema` from a command payload, dropping excluded
    /// top-level context keys
    pub fn from_client_request(
        payload: &Map<String, Value>,
        excluded_context_paths: &HashSet<String>,
    ) -> serde_json::Result<Self> {
        let mut context = payload
            .get("context")
            .cloned()
            .unwrap_or_else(|| Value::Object(Map::new()));
        if let Value::Object(object) = &mut context {
            object.retain(|key, _| !excluded_context_paths.contains(key));
        }

        let schema = match payload.get("schema") {
            None | Some(Value::Null) => BTreeMap::new(),
            Some(schema) => serde_json::from_value(schema.clone())?,
        };

        Ok(Self { context, schema })
    }

    /// No plot yet: empty, absent, or flagged with `initialContext`
    pub fn is_initial_context(&self) -> bool {
        match &self.context {
            Value::Null => true,
            Value::Object(object) => object.is_empty() || object.contains_key("initialContext"),
            _ => false,
        }
    }

    /// Data fields whose measurement type is `measurement`
    pub fn fields_measured_as<'a>(&'a self, measurement: &'a str) -> impl Iterator<Item = &'a FieldInfo> {
        self.schema
            .values()
            .filter(move |field| field.measurement() == measurement)
    }
}
