//! Session Command Router
//!
//! Dispatches `[command, payload]` JSON commands against per-session state.
//!
//! | command  | payload keys                                   | result                          |
//! |----------|------------------------------------------------|---------------------------------|
//! | `q`      | utterance, context, schema, random?, amount?   | parsed example, bounded         |
//! | `random` | amount, context, schema                        | synthesized example             |
//! | `accept` | utterance, context, targetValue, targetFormula?| none; feeds the online learner  |
//! | `reject` | anything                                       | none                            |
//! | `example`| amount?                                        | shuffled accepted-example lines |
//! | `log`    | anything                                       | none                            |
//!
//! Unknown commands are logged and ignored. A malformed payload fails only
//! the command that carried it.
//!
//! Each session sits behind its own mutex, so commands for one session run
//! one at a time while different sessions proceed in parallel.

use dashmap::DashMap;
use parking_lot::Mutex;
use rand::seq::SliceRandom;
use serde::de::{DeserializeOwned, IgnoredAny};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::sync::Arc;

use crate::config::VegaConfig;
use crate::context::VegaContext;
use crate::engine::ValueEngine;
use crate::error::{Result, VegaError};
use crate::example::{Example, ParseStatus, Response};
use crate::parser::{OnlineLearner, SemanticParser};
use crate::querylog::QueryLog;
use crate::randomizer::VegaRandomizer;
use crate::resources::VegaResources;
use crate::session::{Session, CONSOLE_SESSION};

// `IgnoredAny` fields must be present but are read from the raw payload
#[derive(Debug, Deserialize)]
struct QueryPayload {
    utterance: String,
    #[serde(rename = "context")]
    _context: IgnoredAny,
    #[serde(rename = "schema")]
    _schema: IgnoredAny,
    #[serde(default)]
    random: bool,
    #[serde(default)]
    amount: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct RandomPayload {
    amount: usize,
    #[serde(rename = "context")]
    _context: IgnoredAny,
    #[serde(rename = "schema")]
    _schema: IgnoredAny,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AcceptPayload {
    utterance: String,
    #[serde(rename = "context")]
    _context: IgnoredAny,
    target_value: Value,
    #[serde(default)]
    target_formula: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
struct ExamplePayload {
    #[serde(default)]
    amount: Option<usize>,
}

/// Routing switches
#[derive(Debug, Clone)]
pub struct RouterOptions {
    pub online_learn_examples: bool,
    /// Parser expressions are accepted from every session
    pub allow_regular_commands: bool,
    /// The console session gets no expression bypass
    pub only_interactive: bool,
}

impl Default for RouterOptions {
    fn default() -> Self {
        Self {
            online_learn_examples: true,
            allow_regular_commands: false,
            only_interactive: false,
        }
    }
}

pub struct SessionCommandRouter {
    resources: Arc<VegaResources>,
    engine: ValueEngine,
    parser: Arc<dyn SemanticParser>,
    learner: Option<Arc<dyn OnlineLearner>>,
    query_log: Option<QueryLog>,
    options: RouterOptions,
    sessions: DashMap<String, Arc<Mutex<Session>>>,
}

impl SessionCommandRouter {
    pub fn new(resources: Arc<VegaResources>, parser: Arc<dyn SemanticParser>) -> Self {
        Self {
            engine: ValueEngine::new(Arc::clone(&resources)),
            resources,
            parser,
            learner: None,
            query_log: None,
            options: RouterOptions::default(),
            sessions: DashMap::new(),
        }
    }

    /// Router with options and command log taken from `config`
    pub fn from_config(
        config: &VegaConfig,
        resources: Arc<VegaResources>,
        parser: Arc<dyn SemanticParser>,
    ) -> Result<Self> {
        let mut router = Self::new(resources, parser).with_options(RouterOptions {
            online_learn_examples: config.learning.online_learn_examples,
            allow_regular_commands: config.session.allow_regular_commands,
            only_interactive: config.session.only_interactive,
        });
        if let Some(path) = &config.log.query_log {
            router.query_log = Some(QueryLog::open(path)?);
        }
        Ok(router)
    }

    pub fn with_learner(mut self, learner: Arc<dyn OnlineLearner>) -> Self {
        self.learner = Some(learner);
        self
    }

    pub fn with_query_log(mut self, query_log: QueryLog) -> Self {
        self.query_log = Some(query_log);
        self
    }

    pub fn with_options(mut self, options: RouterOptions) -> Self {
        self.options = options;
        self
    }

    pub fn engine(&self) -> &ValueEngine {
        &self.engine
    }

    /// Snapshot of a session's state, if it has been seen
    pub fn session(&self, session_id: &str) -> Option<Session> {
        // Release the shard guard before waiting on the session lock
        let session = self
            .sessions
            .get(session_id)
            .map(|entry| Arc::clone(entry.value()))?;
        let snapshot = session.lock().clone();
        Some(snapshot)
    }

    /// Handle one raw input line from `session_id`
    pub fn process_query(&self, session_id: &str, line: &str) -> Result<Response> {
        let line = line.trim();
        let _span = tracing::info_span!("handle_query", session = %session_id).entered();
        tracing::info!("query {}", line);

        let is_console = session_id == CONSOLE_SESSION;
        let expression_allowed = if is_console {
            !self.options.only_interactive
        } else {
            self.options.allow_regular_commands
        };
        if expression_allowed && line.starts_with('(') {
            return self.parser.execute_expression(session_id, line);
        }

        let command = if is_console {
            console_query(line)
        } else {
            serde_json::from_str(line)?
        };
        self.handle_command(session_id, &command)
    }

    /// Handle one decoded `[command, payload]` value
    pub fn handle_command(&self, session_id: &str, args: &Value) -> Result<Response> {
        if let Some(log) = &self.query_log {
            log.record(session_id, args)?;
        }

        let (command, kv) = match args.as_array().map(Vec::as_slice) {
            Some([Value::String(command)]) => (command.as_str(), &Value::Null),
            Some([Value::String(command), kv, ..]) => (command.as_str(), kv),
            _ => return Err(VegaError::InvalidCommand(args.to_string())),
        };
        let mut response = Response::new(command);

        match command {
            "q" => self.query(session_id, kv, &mut response)?,
            "random" => self.random(session_id, kv, &mut response)?,
            "accept" => self.accept(session_id, kv)?,
            "reject" => {}
            "example" => self.example(kv, &mut response)?,
            "log" => {}
            _ => tracing::warn!("Invalid command: {}", args),
        }

        Ok(response)
    }

    fn query(&self, session_id: &str, kv: &Value, response: &mut Response) -> Result<()> {
        let payload: QueryPayload = decode("q", kv)?;
        let session = self.session_handle(session_id);
        let mut session = session.lock();

        session.context = self.context_from("q", kv)?;
        let mut ex = example_from_utterance(&payload.utterance, &session);
        self.parser.parse(&mut ex, false)?;

        let size = ex.pred_derivations.len();
        response.stats.size = Some(size);
        response.stats.status = Some(ParseStatus::of(&ex.pred_derivations));
        session.update_context(&ex);
        tracing::info!("parse stats: {:?}", response.stats);

        if payload.random {
            ex.pred_derivations.shuffle(&mut rand::thread_rng());
        }
        ex.pred_derivations = ex.top_derivations(payload.amount);
        response.ex = Some(ex);
        Ok(())
    }

    fn random(&self, session_id: &str, kv: &Value, response: &mut Response) -> Result<()> {
        let payload: RandomPayload = decode("random", kv)?;
        let session = self.session_handle(session_id);
        let mut session = session.lock();

        let context = self.context_from("random", kv)?;
        let initial = context.is_initial_context();
        session.context = context;

        let ex = example_from_utterance("", &session);
        let randomizer = VegaRandomizer::new(ex, &self.engine);
        let ex = if initial {
            randomizer.generate_initial(payload.amount)
        } else {
            randomizer.generate_modification(payload.amount)?
        };

        response.stats.size = Some(ex.pred_derivations.len());
        response.ex = Some(ex);
        Ok(())
    }

    fn accept(&self, session_id: &str, kv: &Value) -> Result<()> {
        let payload: AcceptPayload = decode("accept", kv)?;
        let session = self.session_handle(session_id);
        let session = session.lock();

        let mut ex = example_from_utterance(&payload.utterance, &session);
        ex.target_value = Some(payload.target_value);
        ex.target_formula = payload.target_formula;
        ex.context = self.context_from("accept", kv)?;
        self.parser.parse(&mut ex, true)?;

        if self.options.online_learn_examples {
            if let Some(learner) = &self.learner {
                learner.online_learn_example(&ex);
            }
        }
        Ok(())
    }

    fn example(&self, kv: &Value, response: &mut Response) -> Result<()> {
        let payload: ExamplePayload = match kv {
            Value::Null => ExamplePayload::default(),
            kv => decode("example", kv)?,
        };

        let mut examples = self.resources.store().examples().to_vec();
        examples.shuffle(&mut rand::thread_rng());
        if let Some(amount) = payload.amount {
            examples.truncate(amount);
        }

        response.lines = examples
            .iter()
            .map(serde_json::to_string)
            .collect::<serde_json::Result<_>>()?;
        Ok(())
    }

    fn session_handle(&self, session_id: &str) -> Arc<Mutex<Session>> {
        let entry = self
            .sessions
            .entry(session_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(Session::new(session_id))));
        Arc::clone(entry.value())
    }

    fn context_from(&self, command: &str, kv: &Value) -> Result<VegaContext> {
        let empty = Map::new();
        let map = kv.as_object().unwrap_or(&empty);
        VegaContext::from_client_request(map, self.resources.excluded_context_paths())
            .map_err(|source| VegaError::MalformedPayload {
                command: command.to_string(),
                source,
            })
    }
}

fn decode<T: DeserializeOwned>(command: &str, kv: &Value) -> Result<T> {
    T::deserialize(kv).map_err(|source| VegaError::MalformedPayload {
        command: command.to_string(),
        source,
    })
}

fn example_from_utterance(utterance: &str, session: &Session) -> Example {
    Example::new(session.id.clone(), utterance, session.context.clone())
}

/// Wrap a console line as a `q` command over a two-field test table
fn console_query(line: &str) -> Value {
    json!(["q", {
        "utterance": line,
        "context": {},
        "schema": {
            "a": { "name": "a", "type": "string", "uniqueCount": 3, "count": 9, "probablyYears": false, "source": true },
            "b": { "name": "b", "type": "integer", "uniqueCount": 6, "count": 9, "probablyYears": false, "source": true }
        }
    }])
}
