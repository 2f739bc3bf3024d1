//! glpi - command line access to a GLPI instance
//!
//! # Configuration
//!
//! Set the following environment variables (or use a `.env` file):
//!
//! - `GLPI_URL`: REST API base URL
//! - `GLPI_USER_TOKEN`: personal API token
//! - `GLPI_APP_TOKEN`: API client application token
//!
//! # Usage
//!
//! ```bash
//! glpi get computers 12
//! glpi search computers name=printer status_name=active
//! glpi set tickets 42 status=6
//! ```

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

use glpi::{config, Glpi, GlpiError};

#[derive(Parser, Debug)]
#[command(name = "glpi", version, about = "Query and update GLPI items")]
struct Cli {
    /// Skip TLS certificate verification (self-signed installations)
    #[arg(long, global = true)]
    insecure: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print one item as JSON
    Get {
        /// Resource type (tickets, computers, states, locations)
        resource: String,
        /// Item id
        id: u64,
    },
    /// Search items; each FIELD=VALUE becomes a `contains` rule
    Search {
        /// Resource type
        resource: String,
        /// Filters as FIELD=VALUE
        filters: Vec<String>,
    },
    /// Update fields of one item
    Set {
        /// Resource type
        resource: String,
        /// Item id
        id: u64,
        /// Assignments as FIELD=VALUE
        #[arg(required = true)]
        assignments: Vec<String>,
    },
}

fn split_pair(raw: &str) -> Result<(&str, &str)> {
    match raw.split_once('=') {
        Some((field, value)) if !field.is_empty() => Ok((field, value)),
        _ => bail!("expected FIELD=VALUE, got {:?}", raw),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (ignore errors if not found)
    dotenvy::dotenv().ok();

    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("glpi=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = config::Config::from_env().context("Failed to load configuration")?;
    if cli.insecure {
        config = config.with_accept_invalid_certs(true);
    }
    tracing::debug!("Configuration loaded, base_url: {}", config.base_url);

    let glpi = Glpi::new(&config).context("Failed to create GLPI client")?;
    let secrets = [config.user_token(), config.app_token()];

    run(cli.command, &glpi, &secrets)
        .await
        .map_err(|e| redact(e, &secrets))
}

/// Rebuilds an error chain with every token masked.
fn redact(err: anyhow::Error, secrets: &[&str]) -> anyhow::Error {
    anyhow!(GlpiError::sanitize_message(&format!("{:#}", err), secrets))
}

async fn run(command: Command, glpi: &Glpi, secrets: &[&str]) -> Result<()> {
    match command {
        Command::Get { resource, id } => {
            let record = glpi.resource(&resource)?.get(id).await?;
            println!("{}", record);
        }
        Command::Search { resource, filters } => {
            let pairs = filters
                .iter()
                .map(|raw| split_pair(raw))
                .collect::<Result<Vec<_>>>()?;
            let records = glpi.resource(&resource)?.filter_by(&pairs).await?;
            tracing::info!(count = records.len(), "Search finished");
            for record in records {
                println!("{}", record);
            }
        }
        Command::Set {
            resource,
            id,
            assignments,
        } => {
            let mut record = glpi.resource(&resource)?.get(id).await?;
            for raw in &assignments {
                let (field, value) = split_pair(raw)?;
                record.write(field, value);
            }
            record.save().await.map_err(|e| {
                let message = e.sanitized_display(secrets);
                tracing::error!(error = %message, "Update rejected");
                anyhow!("Failed to update {} {}: {}", resource, id, message)
            })?;
            tracing::info!(resource = %resource, id = id, "Item updated");
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_insecure_flag_is_global() {
        let cli = Cli::try_parse_from(["glpi", "get", "computers", "3", "--insecure"]).unwrap();
        assert!(cli.insecure);
        let cli = Cli::try_parse_from(["glpi", "get", "computers", "3"]).unwrap();
        assert!(!cli.insecure);
    }

    #[test]
    fn test_redact_masks_tokens_in_chain() {
        let err = anyhow!("sent user_token u-123").context("Failed to update tickets 4");
        let message = redact(err, &["u-123", "a-456"]).to_string();
        assert!(!message.contains("u-123"));
        assert!(message.starts_with("Failed to update tickets 4: "));
    }

    #[test]
    fn test_split_pair() {
        assert_eq!(split_pair("status=6").unwrap(), ("status", "6"));
        assert_eq!(split_pair("comment=a=b").unwrap(), ("comment", "a=b"));
        assert!(split_pair("=6").is_err());
        assert!(split_pair("status").is_err());
    }
}
