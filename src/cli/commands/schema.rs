//! Implementation of the `docsignals schema` command.

use anyhow::Result;
use clap::Args;
use serde::Serialize;

use super::{parse_options, registry};
use crate::cli::output::{output, CommandOutput};
use crate::domain::models::{Config, Field};
use crate::domain::ports::SignalCapability;

#[derive(Args, Debug)]
pub struct SchemaArgs {
    /// Signal name
    pub signal: String,

    /// Signal options as a JSON object
    #[arg(long)]
    pub options: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SchemaOutput {
    pub signal: String,
    pub remote_operation: Option<String>,
    pub fields: Field,
}

impl CommandOutput for SchemaOutput {
    fn to_human(&self) -> String {
        let fields = serde_json::to_string_pretty(&self.fields).unwrap_or_default();
        let remote = self.remote_operation.as_deref().unwrap_or("not supported");
        format!(
            "Signal: {}\nRemote operation: {remote}\nFields:\n{fields}",
            self.signal
        )
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

pub fn execute(args: &SchemaArgs, config: &Config, json_mode: bool) -> Result<()> {
    let options = parse_options(args.options.as_deref())?;
    let signal = registry(config).build(&args.signal, &options)?;

    let remote_operation = match signal.capability() {
        SignalCapability::Local => None,
        SignalCapability::Remote { operation } => Some(operation),
        SignalCapability::Composite { remote_operation } => remote_operation,
    };

    output(
        &SchemaOutput {
            signal: signal.name().to_string(),
            remote_operation,
            fields: signal.fields(),
        },
        json_mode,
    );
    Ok(())
}
