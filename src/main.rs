//! docsignals CLI entry point.

use anyhow::Result;
use clap::Parser;

use docsignals::cli::{commands, handle_error, Cli, Commands};
use docsignals::infrastructure::config::ConfigLoader;
use docsignals::infrastructure::logging::LoggerImpl;

async fn run(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => ConfigLoader::load_from_file(path)?,
        None => ConfigLoader::load()?,
    };
    let _logger = LoggerImpl::init(&config.logging)?;

    match cli.command {
        Commands::Run(args) => commands::run::execute(args, &config).await,
        Commands::Schema(args) => commands::schema::execute(&args, &config, cli.json),
        Commands::Endpoints(args) => {
            commands::endpoints::execute(&args, &config, cli.json).await
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let json_mode = cli.json;

    if let Err(err) = run(cli).await {
        handle_error(&err, json_mode);
    }
}
