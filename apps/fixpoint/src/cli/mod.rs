//! # Fixpoint CLI Module
//!
//! This module implements the CLI interface for Fixpoint.
//!
//! ## Available Commands
//!
//! - `genealogy` - Compute ancestors and descendants of a family file
//! - `friends` - Run the symmetric friends scenario
//! - `check-confluence` - Compare FIFO and LIFO runs of a family file

mod commands;

use crate::scenarios::friends::parse_pair;
use clap::{Parser, Subcommand};
use fixpoint_core::FixpointError;
use std::path::PathBuf;

pub use commands::*;

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// Fixpoint - convergent reactive entity-graph runtime
///
/// Declare entities, relations and links; run until nothing changes.
#[derive(Parser, Debug)]
#[command(name = "fixpoint")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output (print run counters)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress banner output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to a TOML config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Dispatch order: "fifo" or "lifo" (overrides the config file)
    #[arg(long, global = true)]
    pub dispatch: Option<String>,

    /// Fail runs that execute more tasks than this (overrides the config file)
    #[arg(long, global = true)]
    pub max_tasks: Option<u64>,

    /// Output in JSON format (for programmatic access)
    #[arg(long, global = true)]
    pub json_mode: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Compute the ancestor closure of a family file
    Genealogy {
        /// Path to the family file (TOML)
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Befriend pairs of people and print the symmetric result
    Friends {
        /// A friendship, as "name,name" (repeatable)
        #[arg(short, long = "pair", value_parser = parse_pair, required = true)]
        pairs: Vec<(String, String)>,
    },

    /// Run a family file under FIFO and LIFO dispatch and compare
    CheckConfluence {
        /// Path to the family file (TOML)
        #[arg(short, long)]
        file: PathBuf,
    },
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

/// Execute the CLI with parsed arguments.
pub fn execute(cli: Cli) -> Result<(), FixpointError> {
    let config = load_config(cli.config.as_deref())?
        .with_overrides(cli.dispatch.as_deref(), cli.max_tasks)?;
    let output = Output {
        json_mode: cli.json_mode,
        verbose: cli.verbose,
    };

    tracing::debug!(runtime = ?config.runtime, "configuration loaded");

    match cli.command {
        Commands::Genealogy { file } => cmd_genealogy(&file, config.runtime, output),
        Commands::Friends { pairs } => cmd_friends(&pairs, config.runtime, output),
        Commands::CheckConfluence { file } => cmd_check_confluence(&file, config.runtime, output),
    }
}
