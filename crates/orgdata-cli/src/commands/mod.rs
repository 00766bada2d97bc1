//! Command execution

mod query;
mod watch;

pub use query::{run_query, EmployeeArgs, EmployeeKey};

use crate::{Cli, CliConfig, Commands};
use anyhow::{Context, Result};
use orgdata_core::{FileDataSource, Service};

/// Execute the parsed command line
///
/// # Errors
/// Returns an error if the source is misconfigured, the document cannot be
/// loaded, or output fails.
pub async fn execute(cli: Cli, config: &CliConfig) -> Result<()> {
    let source = FileDataSource::new(&config.source)
        .context("data file is required; use --data, ORGDATA_PATH or a config file")?;

    if matches!(cli.command, Commands::Watch) {
        return watch::execute(&source).await;
    }

    let service = Service::with_source(&source)
        .await
        .with_context(|| format!("failed to load {source}"))?;

    let stdout = std::io::stdout();
    run_query(&service, &cli.command, cli.format, &mut stdout.lock())
}
