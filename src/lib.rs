//! Interactive Vega-Lite Backend
//!
//! The core of a conversational chart-authoring service: clients send
//! `[command, payload]` JSON commands carrying an utterance and the plot in
//! progress, and get back ranked candidate plots.
//!
//! ## Features
//!
//! - **Schema Paths**: Distinct property paths of the Vega-Lite grammar and a
//!   matcher from partial paths to schema nodes
//! - **Value Engine**: Type-checks tagged values against grammar positions and
//!   synthesizes plausible values, with color/field/font/enum overrides
//! - **Command Router**: `q`, `random`, `accept`, `reject`, `example` and `log`
//!   against per-session context, with bounded and optionally shuffled results
//!
//! ## Architecture
//!
//! ```text
//! schema document ─► SchemaTree ─► SchemaPathIndex ─┐
//!                                └► EnumIndex ───────┼─► VegaResources (Arc, read-only)
//! colors / templates / query log ─► ResourceStore ──┘          │
//!                                                              ▼
//! client command ─► SessionCommandRouter ─► SemanticParser (q, accept)
//!                                       └─► VegaRandomizer ─► ValueEngine (random)
//! ```

pub mod config;
pub mod context;
pub mod engine;
pub mod enums;
pub mod error;
pub mod example;
pub mod parser;
pub mod paths;
pub mod querylog;
pub mod randomizer;
pub mod resources;
pub mod router;
pub mod schema;
pub mod session;
pub mod tree;
pub mod value;

pub use config::VegaConfig;
pub use context::{FieldInfo, VegaContext};
pub use engine::{ValueEngine, ValueRule};
pub use enums::EnumIndex;
pub use error::{Result, VegaError};
pub use example::{Derivation, Example, ParseStatus, QueryStats, Response};
pub use parser::{NullParser, OnlineLearner, SemanticParser};
pub use paths::{PathMatch, SchemaPathIndex};
pub use querylog::QueryLog;
pub use randomizer::VegaRandomizer;
pub use resources::{InitialTemplate, ResourceStore, VegaResources};
pub use router::{RouterOptions, SessionCommandRouter};
pub use schema::{SchemaNode, SchemaType, SimplePath};
pub use session::{Session, CONSOLE_SESSION};
pub use tree::SchemaTree;
pub use value::{TypedValue, ValueTag};
