//! Schema Path Tool
//!
//! Inspect the path index and value engine of a configured grammar.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use serde_json::Value;
use tracing_subscriber::EnvFilter;
use vega_interactive::{TypedValue, ValueEngine, ValueTag, VegaConfig, VegaResources};

#[derive(Parser)]
#[command(name = "vega-paths")]
#[command(about = "Inspect schema paths and check or synthesize values")]
struct Cli {
    /// Config file (defaults to vega.toml lookup)
    #[arg(short, long)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write node, path and enum dumps
    Dump {
        /// Output directory (defaults to session.int_output_path)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Fuzzy-search the distinct simple paths
    Search {
        query: String,
        #[arg(short, long, default_value_t = 10)]
        limit: usize,
    },

    /// Check a tagged value against a dotted path
    Check {
        /// Dotted path, e.g. encoding.x.field
        path: String,
        /// JSON literal; bare words are taken as strings
        value: String,
        /// Value tag (string, number, boolean, color, field, enum, ...)
        #[arg(short, long, default_value = "string")]
        tag: String,
    },

    /// Draw synthesized values for a dotted path
    Values {
        path: String,
        #[arg(short, long, default_value_t = 5)]
        draws: usize,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let config = VegaConfig::load_from(cli.config.as_deref())?;
    let resources = Arc::new(VegaResources::load(&config.resources)?);

    match cli.command {
        Commands::Dump { output } => {
            let dir = output
                .or_else(|| config.dump_dir())
                .ok_or_else(|| anyhow::anyhow!("no output directory given or configured"))?;
            resources.dump(&dir)?;
            println!("✅ Wrote dumps to {}", dir.display());
        }

        Commands::Search { query, limit } => {
            for hit in resources.paths().search(&query, limit) {
                println!("{:>5}  {}", hit.score, hit.path.dotted());
            }
        }

        Commands::Check { path, value, tag } => {
            let tag = ValueTag::parse(&tag).ok_or_else(|| anyhow::anyhow!("unknown tag {}", tag))?;
            let literal = serde_json::from_str(&value).unwrap_or(Value::String(value));
            let engine = ValueEngine::new(resources);
            let accepted = engine.check_type(&split(&path), &TypedValue::new(literal, tag))?;
            println!("{}", if accepted { "✅ accepted" } else { "❌ rejected" });
        }

        Commands::Values { path, draws } => {
            let engine = ValueEngine::new(resources);
            let segments = split(&path);
            for _ in 0..draws {
                match engine.get_values(&segments, None)?.first() {
                    Some(value) => println!("{}", value),
                    None => println!("(nothing)"),
                }
            }
        }
    }

    Ok(())
}

fn split(path: &str) -> Vec<String> {
    path.split('.').filter(|s| !s.is_empty()).map(String::from).collect()
}
