//! Schema Path Index
//!
//! The distinct simple paths of the grammar, minus configured noise segments,
//! and the matcher that maps a (possibly partial) query path to schema nodes.
//!
//! Matching: an exact simple-path match wins; otherwise every node whose
//! simple path ends with the query is returned. Nothing matches an empty query.

use indexmap::{IndexMap, IndexSet};
use serde::Serialize;
use std::collections::{HashMap, HashSet};

use crate::schema::{SchemaNode, SimplePath};

/// A path returned by [`SchemaPathIndex::search`]
#[derive(Debug, Clone, Serialize)]
pub struct PathMatch {
    pub path: SimplePath,
    pub score: i64,
}

/// Read-only index from simple paths to the nodes that live there
#[derive(Debug, Clone)]
pub struct SchemaPathIndex {
    paths: IndexSet<SimplePath>,
    /// Filtered paths where no node declares a type
    untyped_paths: IndexSet<SimplePath>,
    nodes: Vec<SchemaNode>,
    by_path: HashMap<SimplePath, Vec<usize>>,
    distinct_unfiltered: usize,
}

impl SchemaPathIndex {
    /// Build from tree descendants, dropping paths that contain an excluded
    /// segment. Typed nodes make up the path set; a path reached only through
    /// untyped nodes still resolves, to those nodes.
    pub fn build<'a>(
        descendants: impl IntoIterator<Item = &'a SchemaNode>,
        excluded: &HashSet<String>,
    ) -> Self {
        let mut all = IndexSet::new();
        let mut paths = IndexSet::new();
        let mut nodes = Vec::new();
        let mut by_path: HashMap<SimplePath, Vec<usize>> = HashMap::new();
        let mut untyped: IndexMap<SimplePath, Vec<usize>> = IndexMap::new();

        for node in descendants {
            if node.typed {
                all.insert(node.simple_path.clone());
            }
            if node
                .simple_path
                .segments()
                .iter()
                .any(|segment| excluded.contains(segment))
            {
                continue;
            }

            let index = nodes.len();
            nodes.push(node.clone());
            if node.typed {
                paths.insert(node.simple_path.clone());
                by_path.entry(node.simple_path.clone()).or_default().push(index);
            } else {
                untyped.entry(node.simple_path.clone()).or_default().push(index);
            }
        }

        let mut untyped_paths = IndexSet::new();
        for (path, indices) in untyped {
            if !paths.contains(&path) {
                by_path.insert(path.clone(), indices);
                untyped_paths.insert(path);
            }
        }

        tracing::info!(
            "Got {} distinct simple paths, {} not containing {:?}, {} untyped",
            all.len(),
            paths.len(),
            excluded,
            untyped_paths.len()
        );

        Self {
            paths,
            untyped_paths,
            nodes,
            by_path,
            distinct_unfiltered: all.len(),
        }
    }

    /// Distinct filtered paths in discovery order
    pub fn paths(&self) -> impl ExactSizeIterator<Item = &SimplePath> {
        self.paths.iter()
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Distinct paths before exclusion filtering
    pub fn distinct_unfiltered(&self) -> usize {
        self.distinct_unfiltered
    }

    pub fn contains(&self, path: &SimplePath) -> bool {
        self.paths.contains(path)
    }

    /// The path at a discovery-order position
    pub fn get_index(&self, index: usize) -> Option<&SimplePath> {
        self.paths.get_index(index)
    }

    /// Every node the query path could denote; empty when nothing matches
    pub fn schemas(&self, path: &[String]) -> Vec<&SchemaNode> {
        if path.is_empty() {
            return Vec::new();
        }

        let exact = SimplePath::new(path.to_vec());
        if let Some(indices) = self.by_path.get(&exact) {
            return indices.iter().map(|&i| &self.nodes[i]).collect();
        }

        self.paths
            .iter()
            .chain(self.untyped_paths.iter())
            .filter(|candidate| candidate.ends_with(path))
            .flat_map(|candidate| self.by_path[candidate].iter().map(|&i| &self.nodes[i]))
            .collect()
    }

    /// Fuzzy search over dotted paths, best first
    pub fn search(&self, query: &str, limit: usize) -> Vec<PathMatch> {
        use fuzzy_matcher::skim::SkimMatcherV2;
        use fuzzy_matcher::FuzzyMatcher;

        let matcher = SkimMatcherV2::default();
        let mut results: Vec<(i64, &SimplePath)> = self
            .paths
            .iter()
            .filter_map(|path| {
                matcher
                    .fuzzy_match(&path.dotted(), query)
                    .map(|score| (score, path))
            })
            .collect();

        // Sort by score descending, shorter paths first on ties
        results.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.len().cmp(&b.1.len())));

        results
            .into_iter()
            .take(limit)
            .map(|(score, path)| PathMatch {
                path: path.clone(),
                score,
            })
            .collect()
    }
}
