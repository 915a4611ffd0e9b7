//! Value Engine
//!
//! Type-checks candidate values against grammar positions and synthesizes
//! plausible values for empty positions. Both operations resolve a path to
//! its schema nodes and then run each declared type through the rule chain
//! in [`rules`].

pub mod rules;

use rand::seq::SliceRandom;
use rand::{Rng, RngCore};
use std::sync::Arc;

use crate::error::{Result, VegaError};
use crate::resources::VegaResources;
use crate::schema::SchemaType;
use crate::value::TypedValue;

pub use rules::{default_rules, ValueRule};

/// Stateless checker/synthesizer over shared resources
pub struct ValueEngine {
    resources: Arc<VegaResources>,
    rules: Vec<Box<dyn ValueRule>>,
}

impl ValueEngine {
    pub fn new(resources: Arc<VegaResources>) -> Self {
        Self::with_rules(resources, default_rules())
    }

    /// Use a custom rule chain, evaluated in order
    pub fn with_rules(resources: Arc<VegaResources>, rules: Vec<Box<dyn ValueRule>>) -> Self {
        Self { resources, rules }
    }

    pub fn resources(&self) -> &Arc<VegaResources> {
        &self.resources
    }

    /// Whether `value` may sit at `path`.
    ///
    /// The first rule verdict decides. Fails with `SchemaNotFound` when the
    /// path resolves to no node, and with `MalformedSchema` when an untyped
    /// node is reached before any verdict.
    pub fn check_type(&self, path: &[String], value: &TypedValue) -> Result<bool> {
        let schemas = self.resources.paths().schemas(path);
        if schemas.is_empty() {
            return Err(VegaError::SchemaNotFound {
                path: path.join("."),
            });
        }

        for schema in schemas {
            for schema_type in &schema.types {
                if self.resources.verbose() > 1 {
                    tracing::debug!(
                        "checkType: path: {:?} | simplePath: {} | types: {:?} | valueType: {}",
                        path,
                        schema.simple_path,
                        schema.types,
                        value.schema_type
                    );
                }

                if *schema_type == SchemaType::NoType {
                    return Err(VegaError::MalformedSchema(format!(
                        "schema has no type at {}",
                        schema.full_path.join(".")
                    )));
                }

                let verdict = self
                    .rules
                    .iter()
                    .filter(|rule| rule.applies(schema_type, schema))
                    .find_map(|rule| rule.check(schema_type, schema, value));
                if let Some(accepted) = verdict {
                    return Ok(accepted);
                }
            }
        }

        Ok(false)
    }

    /// Validate a supplied value, or draw one synthesized value.
    ///
    /// With a value: `[value]` if it checks, else `[]`. Without: one element
    /// picked uniformly from the union of every node's candidate pool, or `[]`
    /// if the path is unknown or nothing can be synthesized.
    pub fn get_values(&self, path: &[String], value: Option<&TypedValue>) -> Result<Vec<TypedValue>> {
        self.get_values_with(path, value, &mut rand::thread_rng())
    }

    /// [`get_values`](Self::get_values) drawing from a caller-supplied rng
    pub fn get_values_with<R: Rng>(
        &self,
        path: &[String],
        value: Option<&TypedValue>,
        rng: &mut R,
    ) -> Result<Vec<TypedValue>> {
        if let Some(value) = value {
            return Ok(if self.check_type(path, value)? {
                vec![value.clone()]
            } else {
                Vec::new()
            });
        }

        let pool = self.candidate_pool(path, rng);
        Ok(pool.choose(rng).cloned().into_iter().collect())
    }

    /// Every synthesized candidate for `path`, before the single draw
    pub fn candidate_pool<R: Rng>(&self, path: &[String], rng: &mut R) -> Vec<TypedValue> {
        let rng: &mut dyn RngCore = rng;
        let mut values = Vec::new();

        for schema in self.resources.paths().schemas(path) {
            for schema_type in &schema.types {
                if *schema_type == SchemaType::NoType {
                    continue;
                }
                if self.resources.verbose() > 0 {
                    tracing::debug!("getValues {} {:?}", schema_type, path);
                }

                if let Some(rule) = self
                    .rules
                    .iter()
                    .find(|rule| rule.applies(schema_type, schema))
                {
                    values.extend(rule.synthesize(schema_type, schema, rng));
                }
            }
        }

        values
    }
}
