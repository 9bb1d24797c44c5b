//! Command line interface.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use gitsql_core::{
    Analyzer, Catalog, Context, DataType, Expression, LogicalPlan, TREE_ENTRIES_TABLE_NAME,
};

use crate::config::{Config, CONFIG_FILE_NAME};
use crate::output::{write_rows, OutputFormat};

#[derive(Parser, Debug)]
#[command(name = "gitsql")]
#[command(about = "Query repository trees as SQL tables", long_about = None)]
pub struct Args {
    /// Configuration file
    #[arg(short, long, default_value = CONFIG_FILE_NAME)]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// List the tables and their schemas
    Tables,

    /// Stream the rows of a table
    Scan {
        /// Table name
        table: String,

        /// Only walk these trees (repeatable)
        #[arg(long = "tree-hash")]
        tree_hashes: Vec<String>,

        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
        format: OutputFormat,
    },

    /// Check a JSON logical plan against the validation rules
    Validate {
        /// Plan file
        plan: PathBuf,
    },
}

impl Command {
    /// Whether the command reads repositories.
    pub fn needs_dataset(&self) -> bool {
        !matches!(self, Command::Validate { .. })
    }
}

/// Execute a command
pub fn execute(command: Command, config: &Config) -> anyhow::Result<ExitCode> {
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    match command {
        Command::Tables => cmd_tables(&mut out, config)?,
        Command::Scan {
            table,
            tree_hashes,
            format,
        } => cmd_scan(&mut out, config, &table, &tree_hashes, format)?,
        Command::Validate { plan } => {
            if !cmd_validate(&mut out, &plan)? {
                return Ok(ExitCode::FAILURE);
            }
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn catalog(config: &Config) -> Catalog {
    Catalog::with_default_tables(Arc::new(config.dataset()))
}

pub fn cmd_tables<W: Write>(out: &mut W, config: &Config) -> anyhow::Result<()> {
    for table in catalog(config).tables() {
        writeln!(out, "{}", table)?;
    }
    Ok(())
}

pub fn cmd_scan<W: Write>(
    out: &mut W,
    config: &Config,
    table: &str,
    tree_hashes: &[String],
    format: OutputFormat,
) -> anyhow::Result<()> {
    let catalog = catalog(config);
    let table = catalog.table(table)?;
    let ctx = Context::new(next_query_id());

    let filters: Vec<Expression> = tree_hash_filter(table.name(), tree_hashes)
        .into_iter()
        .collect();
    let mut rows = table.with_project_and_filters(&ctx, &[], &filters)?;
    let count = write_rows(out, table.schema(), &mut rows, format)?;
    tracing::info!(table = table.name(), rows = count, "scan finished");
    Ok(())
}

/// `tree_hash = H` for one hash, `tree_hash IN (...)` for several.
fn tree_hash_filter(table: &str, hashes: &[String]) -> Option<Expression> {
    if table != TREE_ENTRIES_TABLE_NAME {
        return None;
    }
    let column = Expression::column(table, "tree_hash", 1, DataType::Text);
    match hashes {
        [] => None,
        [hash] => Some(Expression::equals(column, Expression::literal(hash.as_str()))),
        many => Some(Expression::in_list(
            column,
            Expression::tuple(
                many.iter()
                    .map(|h| Expression::literal(h.as_str()))
                    .collect(),
            ),
        )),
    }
}

/// Prints `ok` or the first validation error. Returns whether the plan is
/// valid.
pub fn cmd_validate<W: Write>(out: &mut W, path: &Path) -> anyhow::Result<bool> {
    let content = std::fs::read_to_string(path)?;
    let plan: LogicalPlan = serde_json::from_str(&content)?;
    let ctx = Context::new(next_query_id());

    match Analyzer::with_default_rules().validate(&ctx, &plan) {
        Ok(()) => {
            writeln!(out, "ok")?;
            Ok(true)
        }
        Err(err) => {
            writeln!(out, "{}", err)?;
            Ok(false)
        }
    }
}

fn next_query_id() -> String {
    format!("gitsql-{}", std::process::id())
}
