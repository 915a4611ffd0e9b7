//! Enum Value Index
//!
//! Reverse index from each literal enum string to the schema types that
//! accept it and the simple paths it appears under. Used to disambiguate a
//! bare literal that arrives without a declared type.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use crate::schema::{SchemaNode, SchemaType, SimplePath};

#[derive(Debug, Clone, Default)]
pub struct EnumIndex {
    value_to_types: BTreeMap<String, BTreeSet<SchemaType>>,
    value_to_paths: BTreeMap<String, HashSet<SimplePath>>,
}

impl EnumIndex {
    /// Index every descendant that declares an enumeration
    pub fn build<'a>(descendants: impl IntoIterator<Item = &'a SchemaNode>) -> Self {
        let mut index = Self::default();

        for node in descendants {
            let Some(enums) = &node.enums else { continue };
            // Only the first declared type is recorded
            let Some(first_type) = node.types.first() else { continue };
            for value in enums {
                index
                    .value_to_types
                    .entry(value.clone())
                    .or_default()
                    .insert(first_type.clone());
                index
                    .value_to_paths
                    .entry(value.clone())
                    .or_default()
                    .insert(node.simple_path.clone());
            }
        }

        tracing::info!(
            "gathering value to types: {} distinct enum values",
            index.value_to_types.len()
        );
        index
    }

    /// Types that accept `value` as an enum literal
    pub fn enum_types(&self, value: &str) -> Option<&BTreeSet<SchemaType>> {
        self.value_to_types.get(value)
    }

    /// Simple paths where `value` is an allowed literal
    pub fn enum_paths(&self, value: &str) -> Option<&HashSet<SimplePath>> {
        self.value_to_paths.get(value)
    }

    /// All distinct enum values, sorted
    pub fn values(&self) -> impl Iterator<Item = &str> {
        self.value_to_types.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.value_to_types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.value_to_types.is_empty()
    }
}
