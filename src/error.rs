//! Error types for the value engine and command router

use thiserror::Error;

/// Result type for engine and session operations
pub type Result<T> = std::result::Result<T, VegaError>;

/// Engine, resource and command errors
#[derive(Error, Debug)]
pub enum VegaError {
    #[error("Schema not found for path: {path}")]
    SchemaNotFound { path: String },

    #[error("Malformed schema: {0}")]
    MalformedSchema(String),

    #[error("Malformed payload for command {command}: {source}")]
    MalformedPayload {
        command: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid command: {0}")]
    InvalidCommand(String),

    #[error("Parser error: {0}")]
    Parser(String),

    #[error("Parser expressions are not supported by this parser")]
    ExpressionUnsupported,

    #[error("Failed to load resource {path}: {message}")]
    Resource { path: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Config(#[from] config_crate::ConfigError),
}

