//! Collaborator seams
//!
//! The semantic parser and the online learner live outside this crate; the
//! router only talks to them through these traits.

use crate::error::{Result, VegaError};
use crate::example::{Example, Response};

/// Turns an utterance in context into ranked derivations
pub trait SemanticParser: Send + Sync {
    /// Fill `example.pred_derivations`, highest score first. `learning` is set
    /// when the example carries a target the parser should learn towards.
    fn parse(&self, example: &mut Example, learning: bool) -> Result<()>;

    /// Evaluate a raw parser expression typed into the console session
    fn execute_expression(&self, session_id: &str, line: &str) -> Result<Response> {
        let _ = (session_id, line);
        Err(VegaError::ExpressionUnsupported)
    }
}

/// Updates model parameters from an accepted example
pub trait OnlineLearner: Send + Sync {
    fn online_learn_example(&self, example: &Example);
}

/// A parser that never produces derivations
#[derive(Debug, Clone, Copy, Default)]
pub struct NullParser;

impl SemanticParser for NullParser {
    fn parse(&self, example: &mut Example, _learning: bool) -> Result<()> {
        example.pred_derivations.clear();
        Ok(())
    }
}
