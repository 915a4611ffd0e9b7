//! Schema Tree
//!
//! The navigable form of a grammar document: the raw document plus the flat
//! list of descendant nodes the path and enum indexes are built from.

pub mod loader;

use serde_json::Value;
use std::path::Path;

use crate::error::{Result, VegaError};
use crate::schema::SchemaNode;

/// A loaded grammar document and its descendants
#[derive(Debug, Clone)]
pub struct SchemaTree {
    document: Value,
    nodes: Vec<SchemaNode>,
}

impl SchemaTree {
    /// Build the tree from an in-memory schema document
    pub fn from_value(document: Value) -> Result<Self> {
        let nodes = loader::load_descendants(&document)?;
        Ok(Self { document, nodes })
    }

    /// Read and build the tree from a schema file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| VegaError::Resource {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        let document: Value = serde_json::from_str(&content).map_err(|e| VegaError::Resource {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::from_value(document)
    }

    pub fn document(&self) -> &Value {
        &self.document
    }

    /// Every node below the root, in discovery order
    pub fn descendants(&self) -> &[SchemaNode] {
        &self.nodes
    }

    /// Descendants whose schema object declares a `type`
    pub fn typed_descendants(&self) -> impl Iterator<Item = &SchemaNode> {
        self.nodes.iter().filter(|n| n.typed)
    }

    /// The raw schema object a node was read from
    pub fn raw(&self, node: &SchemaNode) -> Option<&Value> {
        self.document.pointer(&node.pointer)
    }
}
