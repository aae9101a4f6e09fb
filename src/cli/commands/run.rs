//! Implementation of the `docsignals run` command.

use anyhow::{Context, Result};
use clap::Args;
use futures::StreamExt;
use std::path::{Path, PathBuf};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracing::info;

use super::{parse_options, registry, remote_client};
use crate::domain::models::{BatchSize, Config, Document, ExecutionConfig, Parallelism};
use crate::services::{Dispatcher, ExecutionTarget, LocalExecutor};

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Signal to compute (pii, binary_classification, perplexity)
    pub signal: String,

    /// JSON file holding an array of documents, or "-" for stdin
    #[arg(long, short)]
    pub input: PathBuf,

    /// Offload the computation to the remote service
    #[arg(long)]
    pub remote: bool,

    /// Batch size selector: negative for a single unchunked batch
    #[arg(long, allow_negative_numbers = true)]
    pub batch_size: Option<i64>,

    /// Parallelism selector: negative for every available core
    #[arg(long, allow_negative_numbers = true)]
    pub parallelism: Option<i64>,

    /// Signal options as a JSON object
    #[arg(long)]
    pub options: Option<String>,
}

async fn read_documents(path: &Path) -> Result<Vec<Document>> {
    let raw = if path == Path::new("-") {
        let mut buffer = Vec::new();
        tokio::io::stdin()
            .read_to_end(&mut buffer)
            .await
            .context("Failed to read documents from stdin")?;
        buffer
    } else {
        tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?
    };
    serde_json::from_slice(&raw).context("Input must be a JSON array of documents")
}

pub async fn execute(args: RunArgs, config: &Config) -> Result<()> {
    let documents = read_documents(&args.input).await?;
    let options = parse_options(args.options.as_deref())?;
    let mut signal = registry(config).build(&args.signal, &options)?;

    let overrides = ExecutionConfig::new(
        BatchSize::from_selector(args.batch_size)?,
        Parallelism::from_selector(args.parallelism)?,
    );
    let local = LocalExecutor::from_config(&config.local)?.with_overrides(overrides);

    let (target, remote) = if args.remote {
        (ExecutionTarget::Remote, Some(remote_client(config)?))
    } else {
        (ExecutionTarget::Local, None)
    };
    let dispatcher = Dispatcher::new(local, remote);

    let mut items = dispatcher
        .compute(signal.as_mut(), &documents, target)
        .await
        .with_context(|| format!("Signal '{}' could not start", args.signal))?;

    let mut stdout = tokio::io::stdout();
    let mut written = 0usize;
    while let Some(item) = items.next().await {
        let item = item.with_context(|| {
            format!("Signal '{}' failed after {written} items", args.signal)
        })?;
        let mut line = serde_json::to_string(&item.to_json())?;
        line.push('\n');
        stdout.write_all(line.as_bytes()).await?;
        written += 1;
    }
    stdout.flush().await?;

    info!(signal = %args.signal, items = written, %target, "Run complete");
    Ok(())
}
