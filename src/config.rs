//! Configuration management for the interactive Vega-Lite backend
//!
//! Supports loading configuration from:
//! - Default values
//! - Config file (vega.toml)
//! - Environment variables (VEGA__*)
//!
//! ## Example config file (vega.toml):
//! ```toml
//! [resources]
//! vega_schema = "./data/vega-lite-v2.json"
//! color_file = "./data/css-colors.json"
//! initial_templates = "./data/templates.json"
//! query_path = "./int-output/query.log"
//! excluded_paths = ["vconcat", "hconcat", "layer", "data"]
//!
//! [session]
//! int_output_path = "./int-output"
//! only_interactive = false
//!
//! [learning]
//! online_learn_examples = true
//!
//! [log]
//! query_log = "./int-output/query.log"
//! ```

use config_crate::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::PathBuf;

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VegaConfig {
    /// Grammar and resource files
    #[serde(default)]
    pub resources: ResourceConfig,

    /// Session handling
    #[serde(default)]
    pub session: SessionConfig,

    /// Online learning
    #[serde(default)]
    pub learning: LearningConfig,

    /// Command log
    #[serde(default)]
    pub log: LogConfig,
}

/// Resource locations and path filtering
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceConfig {
    /// File containing the Vega-Lite JSON schema
    #[serde(default)]
    pub vega_schema: Option<PathBuf>,

    /// File containing all the colors (a JSON object keyed by color name)
    #[serde(default)]
    pub color_file: Option<PathBuf>,

    /// File containing initial plot templates
    #[serde(default)]
    pub initial_templates: Option<PathBuf>,

    /// Log of past queries to draw accepted examples from
    #[serde(default)]
    pub query_path: Option<PathBuf>,

    /// Path segments to exclude from the simple path set
    #[serde(default = "default_excluded_paths")]
    pub excluded_paths: HashSet<String>,

    /// Context keys that are stripped from client contexts
    #[serde(default)]
    pub excluded_context_paths: HashSet<String>,

    /// Verbosity of the value engine (0 = quiet)
    #[serde(default)]
    pub verbose: u8,
}

/// Session configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Directory for resource dumps
    #[serde(default)]
    pub int_output_path: Option<PathBuf>,

    /// Route every console line through the command protocol, even
    /// parser expressions
    #[serde(default)]
    pub only_interactive: bool,

    /// Accept parser expressions from every session, not just the console
    #[serde(default)]
    pub allow_regular_commands: bool,
}

/// Learning configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LearningConfig {
    /// Forward accepted examples to the online learner
    #[serde(default = "default_true")]
    pub online_learn_examples: bool,
}

/// Command log configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LogConfig {
    /// Append-only log of every received command
    #[serde(default)]
    pub query_log: Option<PathBuf>,
}

// Default value functions
fn default_excluded_paths() -> HashSet<String> {
    [
        "vconcat", "hconcat", "layer", "spec", "repeat", "condition", "selection", "data", "facet",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_true() -> bool {
    true
}

impl Default for ResourceConfig {
    fn default() -> Self {
        Self {
            vega_schema: None,
            color_file: None,
            initial_templates: None,
            query_path: None,
            excluded_paths: default_excluded_paths(),
            excluded_context_paths: HashSet::new(),
            verbose: 0,
        }
    }
}

impl Default for LearningConfig {
    fn default() -> Self {
        Self {
            online_learn_examples: true,
        }
    }
}

/// Platform directories for this project (XDG on Linux)
pub fn project_dirs() -> Option<directories::ProjectDirs> {
    directories::ProjectDirs::from("org", "vega-interactive", "vega-interactive")
}

impl VegaConfig {
    /// Load configuration from default locations
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(None)
    }

    /// Load configuration from a specific file
    pub fn load_from(config_path: Option<&str>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();

        let config_locations = ["vega.toml", ".vega.toml", "config/vega.toml"];

        for location in config_locations {
            builder = builder.add_source(File::with_name(location).required(false));
        }

        // Load from XDG config directory
        if let Some(config_dir) = project_dirs() {
            let xdg_config = config_dir.config_dir().join("vega.toml");
            if xdg_config.exists() {
                builder = builder.add_source(File::from(xdg_config).required(false));
            }
        }

        if let Some(path) = config_path {
            builder = builder.add_source(File::with_name(path).required(true));
        }

        // Load from environment variables (VEGA__*)
        builder = builder.add_source(
            Environment::with_prefix("VEGA")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        config.try_deserialize()
    }

    /// Save configuration to a file
    pub fn save(&self, path: &str) -> std::io::Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(path, content)
    }

    /// Directory the resource dumps are written to, if any
    pub fn dump_dir(&self) -> Option<PathBuf> {
        self.session.int_output_path.as_ref().map(|p| {
            if p.is_absolute() {
                p.clone()
            } else {
                std::env::current_dir().unwrap_or_default().join(p)
            }
        })
    }
}
