//! Vega Resources
//!
//! Loads the grammar, colors, initial templates and accepted-example log once
//! at startup and bundles them with the path and enum indexes. The bundle is
//! read-only afterwards and shared between sessions behind an `Arc`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::fs;
use std::path::Path;

use crate::config::ResourceConfig;
use crate::enums::EnumIndex;
use crate::error::{Result, VegaError};
use crate::paths::SchemaPathIndex;
use crate::tree::SchemaTree;

pub const CHANNELS: [&str; 8] = ["x", "y", "color", "opacity", "shape", "size", "row", "column"];
pub const MARKS: [&str; 10] = [
    "area", "bar", "circle", "line", "point", "rect", "rule", "square", "text", "tick",
];
pub const AGGREGATES: [&str; 5] = ["max", "mean", "min", "median", "sum"];

/// A starting plot: a mark and the measurement type wanted on each channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InitialTemplate {
    pub mark: String,
    pub encoding: HashMap<String, String>,
}

/// Loaded-once configuration sets
#[derive(Debug, Clone, Default)]
pub struct ResourceStore {
    colors: BTreeSet<String>,
    initial_templates: Vec<InitialTemplate>,
    examples: Vec<Map<String, Value>>,
}

impl ResourceStore {
    /// Load every file the config names; absent entries stay empty
    pub fn load(config: &ResourceConfig) -> Result<Self> {
        let mut store = Self::default();

        if let Some(path) = &config.color_file {
            let colors: Map<String, Value> = read_json(path)?;
            store.colors = colors.into_iter().map(|(name, _)| name).collect();
            tracing::info!("loaded {} colors from {}", store.colors.len(), path.display());
        }

        if let Some(path) = &config.initial_templates {
            store.initial_templates = read_json(path)?;
            tracing::info!("Read {} initial templates", store.initial_templates.len());
        }

        if let Some(path) = &config.query_path {
            store.examples = read_accepted_examples(path)?;
            tracing::info!("Read {} accepted examples from {}", store.examples.len(), path.display());
        }

        Ok(store)
    }

    pub fn with_colors<I, S>(mut self, colors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.colors = colors.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_templates(mut self, templates: Vec<InitialTemplate>) -> Self {
        self.initial_templates = templates;
        self
    }

    pub fn with_examples(mut self, examples: Vec<Map<String, Value>>) -> Self {
        self.examples = examples;
        self
    }

    pub fn colors(&self) -> &BTreeSet<String> {
        &self.colors
    }

    pub fn is_color(&self, name: &str) -> bool {
        self.colors.contains(name)
    }

    pub fn initial_templates(&self) -> &[InitialTemplate] {
        &self.initial_templates
    }

    /// Accepted commands from the query log
    pub fn examples(&self) -> &[Map<String, Value>] {
        &self.examples
    }
}

/// Keep the log lines whose command (`q[0]`) is `accept`
fn read_accepted_examples(path: &Path) -> Result<Vec<Map<String, Value>>> {
    let content = fs::read_to_string(path).map_err(|e| resource_error(path, e))?;
    let mut examples = Vec::new();

    for line in content.lines().filter(|l| !l.trim().is_empty()) {
        let entry: Map<String, Value> =
            serde_json::from_str(line).map_err(|e| resource_error(path, e))?;
        let command = entry
            .get("q")
            .and_then(Value::as_array)
            .and_then(|q| q.first())
            .and_then(Value::as_str);
        if command == Some("accept") {
            examples.push(entry);
        }
    }

    Ok(examples)
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let content = fs::read_to_string(path).map_err(|e| resource_error(path, e))?;
    serde_json::from_str(&content).map_err(|e| resource_error(path, e))
}

fn resource_error(path: &Path, e: impl std::fmt::Display) -> VegaError {
    VegaError::Resource {
        path: path.display().to_string(),
        message: e.to_string(),
    }
}

/// Everything the value engine and router read, built once
#[derive(Debug, Clone)]
pub struct VegaResources {
    tree: SchemaTree,
    paths: SchemaPathIndex,
    enums: EnumIndex,
    store: ResourceStore,
    schema_digest: String,
    excluded_context_paths: HashSet<String>,
    verbose: u8,
}

impl VegaResources {
    /// Load the grammar and resource files named by the config
    pub fn load(config: &ResourceConfig) -> Result<Self> {
        let schema_path = config.vega_schema.as_ref().ok_or_else(|| VegaError::Resource {
            path: "resources.vega_schema".to_string(),
            message: "no schema file configured".to_string(),
        })?;

        let _span = tracing::info_span!("load_schema", path = %schema_path.display()).entered();
        let tree = SchemaTree::from_file(schema_path)?;
        let store = ResourceStore::load(config)?;

        let mut resources = Self::build(tree, &config.excluded_paths, store);
        resources.excluded_context_paths = config.excluded_context_paths.clone();
        resources.verbose = config.verbose;
        Ok(resources)
    }

    /// Assemble from an already-loaded tree
    pub fn build(tree: SchemaTree, excluded_paths: &HashSet<String>, store: ResourceStore) -> Self {
        let typed = tree.typed_descendants().count();
        tracing::info!(
            "Got {} descendants, {} typed",
            tree.descendants().len(),
            typed
        );

        let paths = SchemaPathIndex::build(tree.descendants(), excluded_paths);
        let enums = EnumIndex::build(tree.typed_descendants());

        let canonical = serde_json::to_string(tree.document()).unwrap_or_default();
        let schema_digest = format!("{:x}", Sha256::digest(canonical.as_bytes()));

        Self {
            tree,
            paths,
            enums,
            store,
            schema_digest,
            excluded_context_paths: HashSet::new(),
            verbose: 0,
        }
    }

    pub fn with_verbose(mut self, verbose: u8) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn tree(&self) -> &SchemaTree {
        &self.tree
    }

    pub fn paths(&self) -> &SchemaPathIndex {
        &self.paths
    }

    pub fn enums(&self) -> &EnumIndex {
        &self.enums
    }

    pub fn store(&self) -> &ResourceStore {
        &self.store
    }

    /// SHA256 of the schema document
    pub fn schema_digest(&self) -> &str {
        &self.schema_digest
    }

    pub fn excluded_context_paths(&self) -> &HashSet<String> {
        &self.excluded_context_paths
    }

    pub fn verbose(&self) -> u8 {
        self.verbose
    }

    /// Write the typed nodes, filtered paths and enum values as pretty JSON
    /// side files under `dir`
    pub fn dump(&self, dir: &Path) -> Result<()> {
        fs::create_dir_all(dir)?;
        let base = dir.join("vegaResource");

        let nodes: Vec<&Value> = self
            .tree
            .typed_descendants()
            .filter_map(|node| self.tree.raw(node))
            .collect();
        fs::write(
            base.with_extension("nodes.json"),
            serde_json::to_string_pretty(&nodes)?,
        )?;

        let paths: Vec<_> = self.paths.paths().collect();
        fs::write(
            base.with_extension("simplePaths.json"),
            serde_json::to_string_pretty(&paths)?,
        )?;

        let enums: Vec<&str> = self.enums.values().collect();
        fs::write(
            base.with_extension("enums.json"),
            serde_json::to_string_pretty(&enums)?,
        )?;

        tracing::info!("Wrote resource dumps to {}", dir.display());
        Ok(())
    }
}
