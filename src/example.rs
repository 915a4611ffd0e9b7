//! Examples, derivations and command responses

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::context::VegaContext;

/// One candidate produced by a parser or the randomizer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Derivation {
    pub formula: String,
    /// The resulting Vega-Lite spec
    pub value: Value,
    pub score: f64,
}

impl Derivation {
    pub fn new(formula: impl Into<String>, value: Value) -> Self {
        Self {
            formula: formula.into(),
            value,
            score: 0.0,
        }
    }

    pub fn with_score(mut self, score: f64) -> Self {
        self.score = score;
        self
    }
}

/// Outcome of parsing an utterance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParseStatus {
    /// No derivation
    Nothing,
    /// At least one derivation from the core grammar
    Core,
}

impl ParseStatus {
    pub fn of(derivations: &[Derivation]) -> Self {
        if derivations.is_empty() {
            Self::Nothing
        } else {
            Self::Core
        }
    }
}

/// One parse request and, once parsed, its ranked derivations
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Example {
    /// Session id of the requester
    pub id: String,
    pub utterance: String,
    pub context: VegaContext,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_value: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_formula: Option<Value>,
    /// Highest score first
    #[serde(default)]
    pub pred_derivations: Vec<Derivation>,
}

impl Example {
    pub fn new(id: impl Into<String>, utterance: impl Into<String>, context: VegaContext) -> Self {
        Self {
            id: id.into(),
            utterance: utterance.into().trim().to_string(),
            context,
            target_value: None,
            target_formula: None,
            pred_derivations: Vec::new(),
        }
    }

    /// Copy of the first `amount` derivations (all when `None`), never more
    /// than are available
    pub fn top_derivations(&self, amount: Option<usize>) -> Vec<Derivation> {
        let size = self.pred_derivations.len();
        let take = amount.map_or(size, |a| a.min(size));
        self.pred_derivations[..take].to_vec()
    }
}

/// Per-command statistics reported back to the client
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueryStats {
    pub command: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<ParseStatus>,
}

impl QueryStats {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            ..Self::default()
        }
    }
}

/// What a command hands back
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Response {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ex: Option<Example>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub lines: Vec<String>,
    pub stats: QueryStats,
}

impl Response {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            stats: QueryStats::new(command),
            ..Self::default()
        }
    }

    /// Derivations of the carried example, if any
    pub fn derivations(&self) -> &[Derivation] {
        self.ex
            .as_ref()
            .map(|ex| ex.pred_derivations.as_slice())
            .unwrap_or(&[])
    }
}
