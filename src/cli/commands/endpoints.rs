//! Implementation of the `docsignals endpoints` command.

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;

use super::remote_client;
use crate::cli::output::{output, table, truncate, CommandOutput};
use crate::domain::models::Config;
use crate::infrastructure::remote::RemoteEndpoint;

#[derive(Args, Debug)]
pub struct EndpointsArgs {}

#[derive(Debug, Serialize)]
pub struct EndpointsOutput {
    pub base_url: String,
    pub endpoints: Vec<RemoteEndpoint>,
}

impl CommandOutput for EndpointsOutput {
    fn to_human(&self) -> String {
        if self.endpoints.is_empty() {
            return format!("No endpoints offered by {}", self.base_url);
        }
        let mut table = table(["Operation", "Description"]);
        for endpoint in &self.endpoints {
            table.add_row(vec![
                endpoint.name.clone(),
                truncate(endpoint.description.as_deref().unwrap_or("-"), 60),
            ]);
        }
        format!("Endpoints at {}\n{table}", self.base_url)
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

pub async fn execute(_args: &EndpointsArgs, config: &Config, json_mode: bool) -> Result<()> {
    let client = remote_client(config)?;
    let endpoints = client
        .list_endpoints()
        .await
        .with_context(|| format!("Failed to list endpoints at {}", client.base_url()))?;

    output(
        &EndpointsOutput {
            base_url: client.base_url().to_string(),
            endpoints,
        },
        json_mode,
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_human_output_lists_operations() {
        let out = EndpointsOutput {
            base_url: "http://localhost:8000".to_string(),
            endpoints: vec![
                RemoteEndpoint {
                    name: "pii".to_string(),
                    description: Some("PII spans".to_string()),
                },
                RemoteEndpoint {
                    name: "perplexity".to_string(),
                    description: None,
                },
            ],
        };
        let human = out.to_human();
        assert!(human.contains("pii"));
        assert!(human.contains("perplexity"));
        assert_eq!(out.to_json()["endpoints"][1]["name"], "perplexity");
    }
}
