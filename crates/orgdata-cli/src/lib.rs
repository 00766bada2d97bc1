//! # orgdata-cli
//!
//! Command-line queries against an organizational directory document.
//!
//! ## Commands
//!
//! - `orgdata employee <key>` - Look up an employee by uid, email, Slack or GitHub id
//! - `orgdata teams <uid>` - Direct teams of an employee
//! - `orgdata orgs <uid>` - Every group an employee belongs to
//! - `orgdata path <name>` - Path from an entity to its root
//! - `orgdata tree <name>` - Descendants of an entity
//! - `orgdata version` - Data version of the loaded document
//! - `orgdata watch` - Keep the document loaded and reload on change
//!
//! ## Configuration
//!
//! Settings come from an optional TOML file (`--config`), overridden by flags:
//!
//! - `--data` / `ORGDATA_PATH` - Path of the JSON document
//! - `--log-format` - `text` or `json`
//! - `RUST_LOG` - Log filter (default: `info`)

#![allow(clippy::print_stdout)]

pub mod commands;
pub mod config;

pub use config::{CliConfig, LogFormat};

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// orgdata - organizational directory queries
#[derive(Debug, Parser)]
#[command(name = "orgdata")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// TOML configuration file
    #[arg(long, short = 'c')]
    pub config: Option<PathBuf>,

    /// Path of the JSON document
    #[arg(long, env = "ORGDATA_PATH")]
    pub data: Option<PathBuf>,

    /// Log line format
    #[arg(long, value_enum)]
    pub log_format: Option<LogFormat>,

    /// Output format
    #[arg(long, value_enum, default_value = "text")]
    pub format: OutputFormat,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Effective configuration: file settings with flag overrides
    ///
    /// # Errors
    /// Returns an error if the configuration file cannot be read.
    pub fn config(&self) -> anyhow::Result<CliConfig> {
        let mut config = match &self.config {
            Some(path) => CliConfig::load(path)?,
            None => CliConfig::new(),
        };
        if let Some(path) = &self.data {
            config = config.with_data_path(path);
        }
        if let Some(format) = self.log_format {
            config = config.with_log_format(format);
        }
        Ok(config)
    }
}

/// CLI subcommands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Look up an employee
    Employee(commands::EmployeeArgs),
    /// Direct teams of an employee
    Teams {
        /// Employee uid
        uid: String,
    },
    /// Every group an employee belongs to
    Orgs {
        /// Employee uid
        uid: String,
    },
    /// Path from an entity up to its root
    Path {
        /// Entity name
        name: String,
        /// Entity type: team, org, pillar or team_group
        #[arg(long = "type", default_value = "team")]
        entity_type: String,
    },
    /// Descendants of an entity
    Tree {
        /// Entity name
        name: String,
    },
    /// Data version of the loaded document
    Version,
    /// Keep the document loaded and reload on change until interrupted
    Watch,
}

/// Output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text
    #[default]
    Text,
    /// Pretty-printed JSON
    Json,
}
