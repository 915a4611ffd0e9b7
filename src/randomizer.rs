//! Random plot suggestions
//!
//! Fills an empty-utterance example with synthesized derivations: whole new
//! plots when there is no plot yet, single-property edits otherwise.

use rand::seq::SliceRandom;
use rand::Rng;
use serde_json::{json, Map, Value};

use crate::context::FieldInfo;
use crate::engine::ValueEngine;
use crate::error::Result;
use crate::example::{Derivation, Example};
use crate::resources::{InitialTemplate, MARKS};

/// Draw attempts allowed per requested modification
const ATTEMPTS_PER_MODIFICATION: usize = 20;

/// Most suggestions produced for one request, whatever amount the client asks for
pub const MAX_SUGGESTIONS: usize = 1000;

pub struct VegaRandomizer<'a> {
    example: Example,
    engine: &'a ValueEngine,
}

impl<'a> VegaRandomizer<'a> {
    pub fn new(example: Example, engine: &'a ValueEngine) -> Self {
        Self { example, engine }
    }

    /// Suggest up to `amount` fresh plots over the context's data fields
    pub fn generate_initial(self, amount: usize) -> Example {
        self.generate_initial_with(amount, &mut rand::thread_rng())
    }

    pub fn generate_initial_with<R: Rng>(mut self, amount: usize, rng: &mut R) -> Example {
        let amount = amount.min(MAX_SUGGESTIONS);
        let fields: Vec<&FieldInfo> = self.example.context.schema.values().collect();
        let mut derivations = Vec::new();

        if !fields.is_empty() {
            let templates = self.engine.resources().store().initial_templates();
            for _ in 0..amount {
                let template = match templates.choose(rng) {
                    Some(template) => template.clone(),
                    None => fallback_template(rng),
                };
                derivations.push(instantiate(&template, &fields, rng));
            }
        }

        tracing::debug!("generated {} initial plots", derivations.len());
        self.example.pred_derivations = derivations;
        self.example
    }

    /// Suggest up to `amount` single-property edits of the current plot
    pub fn generate_modification(self, amount: usize) -> Result<Example> {
        self.generate_modification_with(amount, &mut rand::thread_rng())
    }

    pub fn generate_modification_with<R: Rng>(mut self, amount: usize, rng: &mut R) -> Result<Example> {
        let engine = self.engine;
        let paths = engine.resources().paths();
        let plot = self.example.context.context.clone();
        let amount = amount.min(MAX_SUGGESTIONS);
        let mut derivations = Vec::new();

        if !paths.is_empty() {
            for _ in 0..amount.saturating_mul(ATTEMPTS_PER_MODIFICATION) {
                if derivations.len() >= amount {
                    break;
                }
                let Some(path) = paths.get_index(rng.gen_range(0..paths.len())) else {
                    continue;
                };
                let Some(value) = engine
                    .get_values_with(path.segments(), None, rng)?
                    .into_iter()
                    .next()
                else {
                    continue;
                };

                let mut modified = plot.clone();
                set_path(&mut modified, path.segments(), value.value.clone());
                if modified == plot {
                    continue;
                }
                derivations.push(Derivation::new(
                    format!("(set {} {})", path.dotted(), value.value),
                    modified,
                ));
            }
        }

        tracing::debug!("generated {} modifications", derivations.len());
        self.example.pred_derivations = derivations;
        Ok(self.example)
    }
}

/// A random mark with an `x` and a `y` channel taking any field
fn fallback_template<R: Rng>(rng: &mut R) -> InitialTemplate {
    let mark = MARKS.choose(rng).copied().unwrap_or("point");
    InitialTemplate {
        mark: mark.to_string(),
        encoding: [("x", "any"), ("y", "any")]
            .into_iter()
            .map(|(c, m)| (c.to_string(), m.to_string()))
            .collect(),
    }
}

fn instantiate<R: Rng>(
    template: &InitialTemplate,
    fields: &[&FieldInfo],
    rng: &mut R,
) -> Derivation {
    let mut channels: Vec<(&String, &String)> = template.encoding.iter().collect();
    channels.sort();

    let mut encoding = Map::new();
    let mut formula = format!("(initial {}", template.mark);
    for (channel, wanted) in channels {
        let fitting: Vec<&FieldInfo> = fields
            .iter()
            .copied()
            .filter(|f| f.measurement() == wanted.as_str())
            .collect();
        let pool = if fitting.is_empty() { fields } else { &fitting[..] };
        let Some(field) = pool.choose(rng) else { continue };

        encoding.insert(
            channel.clone(),
            json!({ "field": field.name, "type": field.measurement() }),
        );
        formula.push_str(&format!(" ({} {})", channel, field.name));
    }
    formula.push(')');

    Derivation::new(
        formula,
        json!({ "mark": template.mark, "encoding": Value::Object(encoding) }),
    )
}

/// Write `value` at `path`, replacing non-objects on the way with objects
fn set_path(target: &mut Value, path: &[String], value: Value) {
    match path.split_first() {
        None => *target = value,
        Some((head, rest)) => {
            if !target.is_object() {
                *target = Value::Object(Map::new());
            }
            if let Value::Object(object) = target {
                set_path(object.entry(head.clone()).or_insert(Value::Null), rest, value);
            }
        }
    }
}
