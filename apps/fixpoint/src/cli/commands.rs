//! # CLI Command Implementations
//!
//! This module contains the actual implementations of CLI commands.

use crate::config::AppConfig;
use crate::scenarios::{friends, genealogy};
use fixpoint_core::{FixpointError, RunReport, RuntimeConfig};
use serde::Serialize;
use std::path::{Path, PathBuf};

// =============================================================================
// FILE SIZE LIMITS
// =============================================================================

/// Maximum size of a family file (10 MB).
const MAX_FAMILY_FILE_SIZE: u64 = 10 * 1024 * 1024;

/// Maximum size of a config file (1 MB).
const MAX_CONFIG_FILE_SIZE: u64 = 1024 * 1024;

/// Validate file size before reading.
fn validate_file_size(path: &Path, max_size: u64) -> Result<(), FixpointError> {
    let metadata = std::fs::metadata(path)
        .map_err(|e| FixpointError::IoError(format!("Cannot read file metadata: {}", e)))?;

    if metadata.len() > max_size {
        return Err(FixpointError::Config(format!(
            "File size {} bytes exceeds maximum allowed {} bytes",
            metadata.len(),
            max_size
        )));
    }
    Ok(())
}

/// Validate file path.
///
/// Canonicalizes the path (resolving symlinks and "..") and ensures it
/// names an existing regular file.
fn validate_file_path(path: &Path) -> Result<PathBuf, FixpointError> {
    let canonical = path.canonicalize().map_err(|e| {
        FixpointError::IoError(format!("Invalid file path '{}': {}", path.display(), e))
    })?;

    if !canonical.is_file() {
        return Err(FixpointError::IoError(format!(
            "Path '{}' is not a regular file",
            path.display()
        )));
    }

    Ok(canonical)
}

/// Read a UTF-8 text file after path and size validation.
pub fn read_text_file(path: &Path, max_size: u64) -> Result<String, FixpointError> {
    let validated_path = validate_file_path(path)?;
    validate_file_size(&validated_path, max_size)?;

    std::fs::read_to_string(&validated_path)
        .map_err(|e| FixpointError::IoError(format!("Read file: {}", e)))
}

/// Load the config file, or defaults when none is given.
pub fn load_config(path: Option<&Path>) -> Result<AppConfig, FixpointError> {
    match path {
        Some(path) => {
            tracing::info!("Loading config from {:?}", path);
            AppConfig::parse(&read_text_file(path, MAX_CONFIG_FILE_SIZE)?)
        }
        None => Ok(AppConfig::default()),
    }
}

/// Load and parse a family file.
pub fn load_family(path: &Path) -> Result<genealogy::FamilyFile, FixpointError> {
    tracing::info!("Loading family from {:?}", path);
    genealogy::FamilyFile::parse(&read_text_file(path, MAX_FAMILY_FILE_SIZE)?)
}

// =============================================================================
// OUTPUT
// =============================================================================

/// Output switches shared by all commands.
#[derive(Debug, Clone, Copy, Default)]
pub struct Output {
    pub json_mode: bool,
    pub verbose: bool,
}

fn print_json<T: Serialize>(value: &T) -> Result<(), FixpointError> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|e| FixpointError::IoError(format!("Serialize output: {}", e)))?;
    println!("{}", text);
    Ok(())
}

fn print_run(run: &RunReport) {
    println!();
    println!("Tasks:        {}", run.tasks_executed);
    println!("Handlers:     {}", run.handlers_run);
    println!("Callbacks:    {}", run.callbacks_run);
    println!("Propagations: {}", run.propagations);
    println!("Entities:     {}", run.entities);
    if run.pending_queries > 0 {
        println!("Pending:      {}", run.pending_queries);
    }
}

fn join(names: &[String]) -> String {
    if names.is_empty() {
        "-".to_string()
    } else {
        names.join(", ")
    }
}

// =============================================================================
// GENEALOGY COMMAND
// =============================================================================

/// Compute the ancestor closure of a family file.
pub fn cmd_genealogy(
    file: &Path,
    runtime: RuntimeConfig,
    output: Output,
) -> Result<(), FixpointError> {
    let family = load_family(file)?;
    let report = genealogy::run(&family, runtime)?;

    if output.json_mode {
        return print_json(&report);
    }

    println!("Genealogy");
    println!("=========");
    for person in &report.people {
        let dog = if person.likes_dogs { " (likes dogs)" } else { "" };
        println!("{}{}", person.name, dog);
        println!("  parents:     {}", join(&person.parents));
        println!("  children:    {}", join(&person.children));
        println!("  ancestors:   {}", join(&person.ancestors));
        println!("  descendants: {}", join(&person.descendants));
    }
    if output.verbose {
        print_run(&report.run);
    }

    Ok(())
}

// =============================================================================
// FRIENDS COMMAND
// =============================================================================

/// Befriend pairs and print the symmetric result.
pub fn cmd_friends(
    pairs: &[(String, String)],
    runtime: RuntimeConfig,
    output: Output,
) -> Result<(), FixpointError> {
    let report = friends::run(pairs, runtime)?;

    if output.json_mode {
        return print_json(&report);
    }

    println!("Friends");
    println!("=======");
    for person in &report.people {
        println!("{}", person.name);
        println!("  friends: {}", join(&person.friends));
        println!("  circle:  {}", join(&person.circle));
    }
    if output.verbose {
        print_run(&report.run);
    }

    Ok(())
}

// =============================================================================
// CHECK-CONFLUENCE COMMAND
// =============================================================================

/// Compare FIFO and LIFO runs of a family file.
///
/// Differing final states are reported as an error so that scripts can
/// rely on the exit code.
pub fn cmd_check_confluence(
    file: &Path,
    runtime: RuntimeConfig,
    output: Output,
) -> Result<(), FixpointError> {
    let family = load_family(file)?;
    let report = genealogy::check_confluence(&family, runtime)?;

    if output.json_mode {
        print_json(&report)?;
    } else {
        println!("Confluence Check");
        println!("================");
        println!("FIFO tasks: {}", report.fifo.tasks_executed);
        println!("LIFO tasks: {}", report.lifo.tasks_executed);
        if report.identical {
            println!("Result:     identical final states");
        } else {
            println!("Result:     final states differ for {}", join(&report.differences));
        }
    }

    report.ensure_identical()
}
