//! Value Rules
//!
//! Domain overrides evaluated in order for one declared type of one schema
//! node. The first rule that applies owns synthesis; for checking, a rule may
//! decline (`None`) and let the next applicable rule decide.
//!
//! Default order: color, field, font, enum, boolean, number, generic.

use rand::{Rng, RngCore};
use regex::Regex;

use crate::schema::{SchemaNode, SchemaType};
use crate::value::{TypedValue, ValueTag};

/// Placeholder emitted for free-form strings
pub const STRING_PLACEHOLDER: &str = "XXYYZZ";

pub const COLOR_POOL: [&str; 3] = ["red", "blue", "green"];
pub const FONT_POOL: [&str; 3] = ["times", "monaco", "cursive"];

/// One prioritized predicate/action pair
pub trait ValueRule: Send + Sync {
    fn name(&self) -> &'static str;

    /// Whether this rule governs `schema_type` at `node`
    fn applies(&self, schema_type: &SchemaType, node: &SchemaNode) -> bool;

    /// Verdict on a supplied value; `None` defers to the next rule
    fn check(&self, schema_type: &SchemaType, node: &SchemaNode, value: &TypedValue) -> Option<bool>;

    /// Candidate values for an empty slot
    fn synthesize(
        &self,
        schema_type: &SchemaType,
        node: &SchemaNode,
        rng: &mut dyn RngCore,
    ) -> Vec<TypedValue>;
}

/// The standard rule chain
pub fn default_rules() -> Vec<Box<dyn ValueRule>> {
    vec![
        Box::new(ColorRule::new()),
        Box::new(FieldRule),
        Box::new(FontRule::new()),
        Box::new(EnumRule),
        Box::new(BooleanRule),
        Box::new(NumberRule),
        Box::new(GenericRule),
    ]
}

fn is_string(schema_type: &SchemaType) -> bool {
    *schema_type == SchemaType::String
}

/// Color-named string slots only accept color-tagged values
pub struct ColorRule {
    name_pattern: Regex,
}

impl Default for ColorRule {
    fn default() -> Self {
        Self::new()
    }
}

impl ColorRule {
    pub fn new() -> Self {
        Self {
            name_pattern: Regex::new(r"(?:color|Color)$|^(?:fill|stroke|background)$").unwrap(),
        }
    }

    pub fn is_color_field(&self, name: &str) -> bool {
        self.name_pattern.is_match(name)
    }
}

impl ValueRule for ColorRule {
    fn name(&self) -> &'static str {
        "color"
    }

    fn applies(&self, schema_type: &SchemaType, node: &SchemaNode) -> bool {
        is_string(schema_type) && self.is_color_field(node.last_segment())
    }

    fn check(&self, _: &SchemaType, _: &SchemaNode, value: &TypedValue) -> Option<bool> {
        Some(value.schema_type == ValueTag::Color)
    }

    fn synthesize(&self, _: &SchemaType, _: &SchemaNode, _: &mut dyn RngCore) -> Vec<TypedValue> {
        COLOR_POOL
            .iter()
            .map(|c| TypedValue::new(*c, ValueTag::Color))
            .collect()
    }
}

/// `field` slots reference data fields and only accept field-tagged values.
/// Nothing is synthesized: field names come from the active data schema.
pub struct FieldRule;

impl ValueRule for FieldRule {
    fn name(&self) -> &'static str {
        "field"
    }

    fn applies(&self, schema_type: &SchemaType, node: &SchemaNode) -> bool {
        is_string(schema_type) && node.last_segment() == "field"
    }

    fn check(&self, _: &SchemaType, _: &SchemaNode, value: &TypedValue) -> Option<bool> {
        Some(value.schema_type == ValueTag::Field)
    }

    fn synthesize(&self, _: &SchemaType, _: &SchemaNode, _: &mut dyn RngCore) -> Vec<TypedValue> {
        Vec::new()
    }
}

/// Font slots get a fixed pool of font names; checking falls through
pub struct FontRule {
    name_pattern: Regex,
}

impl Default for FontRule {
    fn default() -> Self {
        Self::new()
    }
}

impl FontRule {
    pub fn new() -> Self {
        Self {
            name_pattern: Regex::new(r"(?:font|Font)$").unwrap(),
        }
    }
}

impl ValueRule for FontRule {
    fn name(&self) -> &'static str {
        "font"
    }

    fn applies(&self, schema_type: &SchemaType, node: &SchemaNode) -> bool {
        is_string(schema_type) && self.name_pattern.is_match(node.last_segment())
    }

    fn check(&self, _: &SchemaType, _: &SchemaNode, _: &TypedValue) -> Option<bool> {
        None
    }

    fn synthesize(&self, _: &SchemaType, _: &SchemaNode, _: &mut dyn RngCore) -> Vec<TypedValue> {
        FONT_POOL
            .iter()
            .map(|f| TypedValue::new(*f, ValueTag::String))
            .collect()
    }
}

/// Enumerated string slots accept exactly their literals, whatever the tag
pub struct EnumRule;

impl ValueRule for EnumRule {
    fn name(&self) -> &'static str {
        "enum"
    }

    fn applies(&self, schema_type: &SchemaType, node: &SchemaNode) -> bool {
        is_string(schema_type) && node.is_enum()
    }

    fn check(&self, _: &SchemaType, node: &SchemaNode, value: &TypedValue) -> Option<bool> {
        let enums = node.enums.as_ref()?;
        Some(enums.contains(&value.text()))
    }

    fn synthesize(&self, _: &SchemaType, node: &SchemaNode, _: &mut dyn RngCore) -> Vec<TypedValue> {
        node.enums
            .iter()
            .flatten()
            .map(|e| TypedValue::new(e.as_str(), ValueTag::Enum))
            .collect()
    }
}

pub struct BooleanRule;

impl ValueRule for BooleanRule {
    fn name(&self) -> &'static str {
        "boolean"
    }

    fn applies(&self, schema_type: &SchemaType, _: &SchemaNode) -> bool {
        *schema_type == SchemaType::Boolean
    }

    fn check(&self, _: &SchemaType, _: &SchemaNode, _: &TypedValue) -> Option<bool> {
        None
    }

    fn synthesize(&self, _: &SchemaType, _: &SchemaNode, _: &mut dyn RngCore) -> Vec<TypedValue> {
        vec![
            TypedValue::new(true, ValueTag::Boolean),
            TypedValue::new(false, ValueTag::Boolean),
        ]
    }
}

/// Numbers: one integer in [0, 50) and one multiple of 0.1 in [0.1, 1.0)
pub struct NumberRule;

impl ValueRule for NumberRule {
    fn name(&self) -> &'static str {
        "number"
    }

    fn applies(&self, schema_type: &SchemaType, _: &SchemaNode) -> bool {
        *schema_type == SchemaType::Number
    }

    fn check(&self, _: &SchemaType, _: &SchemaNode, _: &TypedValue) -> Option<bool> {
        None
    }

    fn synthesize(&self, _: &SchemaType, _: &SchemaNode, rng: &mut dyn RngCore) -> Vec<TypedValue> {
        let whole: i64 = rng.gen_range(0..50);
        let tenths: i64 = rng.gen_range(1..10);
        vec![
            TypedValue::new(whole, ValueTag::Number),
            TypedValue::new(tenths as f64 / 10.0, ValueTag::Number),
        ]
    }
}

/// Fallback: the tag must name the declared type
pub struct GenericRule;

impl ValueRule for GenericRule {
    fn name(&self) -> &'static str {
        "generic"
    }

    fn applies(&self, _: &SchemaType, _: &SchemaNode) -> bool {
        true
    }

    fn check(&self, schema_type: &SchemaType, _: &SchemaNode, value: &TypedValue) -> Option<bool> {
        value.schema_type.is(schema_type).then_some(true)
    }

    fn synthesize(&self, schema_type: &SchemaType, _: &SchemaNode, _: &mut dyn RngCore) -> Vec<TypedValue> {
        match schema_type {
            SchemaType::String => vec![TypedValue::new(STRING_PLACEHOLDER, ValueTag::String)],
            _ => Vec::new(),
        }
    }
}
