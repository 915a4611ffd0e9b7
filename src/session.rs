//! Per-client session state

use serde::Serialize;

use crate::context::VegaContext;
use crate::example::Example;

/// Session id whose lines come from a terminal rather than a client
pub const CONSOLE_SESSION: &str = "stdin";

#[derive(Debug, Clone, Serialize)]
pub struct Session {
    pub id: String,
    /// Replaced wholesale by `q` and `random`
    pub context: VegaContext,
    /// Commands that carried a context
    pub query_count: u64,
    pub last_utterance: Option<String>,
}

impl Session {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            context: VegaContext::default(),
            query_count: 0,
            last_utterance: None,
        }
    }

    /// Record that `example` was parsed in this session
    pub fn update_context(&mut self, example: &Example) {
        self.query_count += 1;
        if !example.utterance.is_empty() {
            self.last_utterance = Some(example.utterance.clone());
        }
    }
}
