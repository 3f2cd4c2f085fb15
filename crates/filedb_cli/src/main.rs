//! filedb CLI
//!
//! Command-line maintenance tools for filedb stores.
//!
//! # Commands
//!
//! - `inspect` - Display the counter, record files and index sizes
//! - `verify` - Check every index and the counter against the records
//! - `reindex` - Rebuild every index and realign the counter
//! - `find` - Print one record as JSON
//! - `list` - Print index entries

mod commands;
mod index_arg;

use clap::{Parser, Subcommand, ValueEnum};
use filedb_core::BodyFormat;
use index_arg::IndexArg;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// filedb command-line store tools.
#[derive(Parser)]
#[command(name = "filedb")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the store directory
    #[arg(global = true, short, long)]
    path: Option<PathBuf>,

    /// Index declaration, `Field[!][:Included,...]` (`!` marks it unique)
    #[arg(global = true, short, long = "index", value_name = "INDEX")]
    indexes: Vec<IndexArg>,

    /// Record body format
    #[arg(global = true, short, long, value_enum, default_value_t = Format::Json)]
    format: Format,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Json,
    Cbor,
}

impl From<Format> for BodyFormat {
    fn from(format: Format) -> Self {
        match format {
            Format::Json => BodyFormat::Json,
            Format::Cbor => BodyFormat::Cbor,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Display the counter, record files and index sizes
    Inspect {
        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Check every index and the counter against the records
    Verify {
        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Delete and rebuild every index, then realign the counter
    Reindex,

    /// Print one record as JSON
    Find {
        /// Record ID
        id: u64,
    },

    /// Print index entries for a field, optionally only those with a value
    List {
        /// Indexed field
        field: String,

        /// Value to match
        value: Option<String>,
    },

    /// Show version information
    Version,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let target = || -> Result<commands::Target, Box<dyn std::error::Error>> {
        let path = cli.path.clone().ok_or("store path required (--path)")?;
        Ok(commands::Target {
            path,
            indexes: cli.indexes.iter().map(IndexArg::to_config).collect(),
            format: cli.format.into(),
        })
    };

    match &cli.command {
        Commands::Inspect { json } => commands::inspect::run(&target()?, *json)?,
        Commands::Verify { json } => {
            if !commands::verify::run(&target()?, *json)? {
                return Ok(ExitCode::FAILURE);
            }
        }
        Commands::Reindex => commands::reindex::run(&target()?)?,
        Commands::Find { id } => commands::find::run(&target()?, *id)?,
        Commands::List { field, value } => {
            commands::list::run(&target()?, field, value.as_deref())?;
        }
        Commands::Version => {
            println!("filedb CLI v{}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(ExitCode::SUCCESS)
}
