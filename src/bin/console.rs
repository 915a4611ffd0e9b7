//! Interactive Console
//!
//! Reads one command per line from stdin and prints each response as JSON.
//! As the `stdin` session, plain lines become `q` commands over a two-field
//! test table; with `--session` lines are raw `[command, payload]` JSON.

use std::io::BufRead;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;
use vega_interactive::{
    NullParser, SessionCommandRouter, VegaConfig, VegaResources, CONSOLE_SESSION,
};

#[derive(Parser)]
#[command(name = "vega-console")]
#[command(about = "Drive the command router from a terminal")]
struct Cli {
    /// Config file (defaults to vega.toml lookup)
    #[arg(short, long)]
    config: Option<String>,

    /// Session id to send commands as
    #[arg(short, long, default_value = CONSOLE_SESSION)]
    session: String,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
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
    if let Some(dir) = config.dump_dir() {
        resources.dump(&dir)?;
    }

    let router = SessionCommandRouter::from_config(&config, resources, Arc::new(NullParser))?;

    let stdin = std::io::stdin();
    for line in stdin.lock().lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        match router.process_query(&cli.session, &line) {
            Ok(response) => println!("{}", serde_json::to_string_pretty(&response)?),
            Err(e) => eprintln!("Error: {}", e),
        }
    }

    Ok(())
}
