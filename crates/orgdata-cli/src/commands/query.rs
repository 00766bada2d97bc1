//! Query commands against a loaded service

use crate::{Commands, OutputFormat};
use anyhow::{bail, Result};
use clap::Args;
use orgdata_core::{HierarchyNode, Service};
use serde::Serialize;
use std::io::Write;

/// How the employee key is interpreted
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum EmployeeKey {
    /// Employee uid
    #[default]
    Uid,
    /// Email address, case-insensitive
    Email,
    /// Slack user id
    Slack,
    /// GitHub id
    Github,
}

/// Arguments for the employee command
#[derive(Debug, Args)]
pub struct EmployeeArgs {
    /// Lookup key
    pub key: String,

    /// Kind of key
    #[arg(long, value_enum, default_value = "uid")]
    pub by: EmployeeKey,
}

fn print_json<T: Serialize>(out: &mut impl Write, value: &T) -> Result<()> {
    serde_json::to_writer_pretty(&mut *out, value)?;
    writeln!(out)?;
    Ok(())
}

fn print_tree(out: &mut impl Write, node: &HierarchyNode, depth: usize) -> Result<()> {
    writeln!(out, "{}{} ({})", "  ".repeat(depth), node.name, node.entity_type)?;
    for child in &node.children {
        print_tree(out, child, depth + 1)?;
    }
    Ok(())
}

/// Run a query command and write its result
///
/// # Errors
/// Returns an error for unknown employees or entities, or if writing fails.
pub fn run_query(
    service: &Service,
    command: &Commands,
    format: OutputFormat,
    out: &mut impl Write,
) -> Result<()> {
    let json = format == OutputFormat::Json;

    match command {
        Commands::Employee(args) => {
            let employee = match args.by {
                EmployeeKey::Uid => Some(service.require_employee(&args.key)?),
                EmployeeKey::Email => service.employee_by_email(&args.key),
                EmployeeKey::Slack => service.employee_by_slack_id(&args.key),
                EmployeeKey::Github => service.employee_by_github_id(&args.key),
            };
            let Some(employee) = employee else {
                bail!("employee not found: {}", args.key);
            };
            if json {
                return print_json(out, &employee);
            }
            writeln!(out, "{} <{}>", employee.full_name, employee.email)?;
            writeln!(out, "  uid:   {}", employee.uid)?;
            writeln!(out, "  title: {}", employee.job_title)?;
            if let Some(manager) = employee.manager_uid() {
                writeln!(out, "  manager: {manager}")?;
            }
            for team in service.teams_for_uid(&employee.uid) {
                writeln!(out, "  team:  {team}")?;
            }
        }
        Commands::Teams { uid } => {
            let teams = service.teams_for_uid(uid);
            if json {
                return print_json(out, &teams);
            }
            for team in teams {
                writeln!(out, "{team}")?;
            }
        }
        Commands::Orgs { uid } => {
            let orgs = service.user_organizations(uid);
            if json {
                return print_json(out, &orgs);
            }
            for org in orgs {
                writeln!(out, "{} ({})", org.name, org.org_type)?;
            }
        }
        Commands::Path { name, entity_type } => {
            let path = service.hierarchy_path(name, entity_type);
            if path.is_empty() {
                bail!("{entity_type} not found: {name}");
            }
            if json {
                return print_json(out, &path);
            }
            let line: Vec<String> = path
                .iter()
                .map(|e| format!("{} ({})", e.name, e.entity_type))
                .collect();
            writeln!(out, "{}", line.join(" -> "))?;
        }
        Commands::Tree { name } => {
            let Some(tree) = service.descendants_tree(name) else {
                bail!("entity not found: {name}");
            };
            if json {
                return print_json(out, &tree);
            }
            print_tree(out, &tree, 0)?;
        }
        Commands::Version => {
            let version = service.version();
            if json {
                return print_json(
                    out,
                    &serde_json::json!({
                        "cli_version": orgdata_core::VERSION,
                        "data": version,
                        "metadata": service.metadata(),
                    }),
                );
            }
            writeln!(out, "orgdata {}", orgdata_core::VERSION)?;
            writeln!(out, "loaded:    {}", version.load_time.to_rfc3339())?;
            writeln!(out, "employees: {}", version.employee_count)?;
            writeln!(out, "orgs:      {}", version.org_count)?;
            if let Some(metadata) = service.metadata() {
                writeln!(out, "data version: {}", metadata.data_version)?;
            }
        }
        Commands::Watch => bail!("watch is not a query"),
    }
    Ok(())
}
