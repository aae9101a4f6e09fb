//! Command-line interface.

pub mod commands;
pub mod output;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use commands::{endpoints::EndpointsArgs, run::RunArgs, schema::SchemaArgs};

#[derive(Parser, Debug)]
#[command(name = "docsignals")]
#[command(about = "Compute per-document signals locally or on a remote service", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file (defaults to .docsignals/config.yaml and local.yaml)
    #[arg(short, long, global = true, env = "DOCSIGNALS_CONFIG")]
    pub config: Option<PathBuf>,

    /// Output in JSON format
    #[arg(short, long, global = true)]
    pub json: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Compute a signal over a JSON array of documents, one JSON line per Item
    Run(RunArgs),

    /// Print a signal's output schema
    Schema(SchemaArgs),

    /// List the operations offered by the remote service
    Endpoints(EndpointsArgs),
}

/// Print the error chain and exit with status 1
pub fn handle_error(err: &anyhow::Error, json_mode: bool) -> ! {
    if json_mode {
        let causes: Vec<String> = err.chain().skip(1).map(ToString::to_string).collect();
        let body = serde_json::json!({
            "error": err.to_string(),
            "causes": causes,
        });
        eprintln!("{body}");
    } else {
        eprintln!("Error: {err:#}");
    }
    std::process::exit(1)
}
