//! # Fixpoint - Reactive Entity-Graph Runtime
//!
//! The main binary for the Fixpoint runtime.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │             apps/fixpoint (THE BINARY)          │
//! │                                                 │
//! │  ┌─────────────┐  ┌────────────┐  ┌──────────┐  │
//! │  │    CLI      │  │   Config   │  │ Scenarios│  │
//! │  │   (clap)    │  │   (toml)   │  │          │  │
//! │  └──────┬──────┘  └─────┬──────┘  └────┬─────┘  │
//! │         └───────────────┼──────────────┘        │
//! │                         ▼                       │
//! │                ┌────────────────┐               │
//! │                │ fixpoint-core  │               │
//! │                │  (THE LOGIC)   │               │
//! │                └────────────────┘               │
//! └─────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```bash
//! fixpoint genealogy -f family.toml
//! fixpoint friends -p ann,bea -p bea,cid --json-mode
//! fixpoint check-confluence -f family.toml --max-tasks 100000
//! ```

use clap::Parser;
use fixpoint::cli;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

fn main() {
    // Initialize tracing. FIXPOINT_LOG_FORMAT=json enables machine-parseable output.
    // Logs go to stderr so that --json-mode output stays parseable.
    let log_format = std::env::var("FIXPOINT_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "fixpoint=info,fixpoint_core=info".into());

    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }

    // Parse CLI arguments
    let cli = cli::Cli::parse();

    // Display startup banner
    if !cli.quiet && !cli.json_mode {
        print_banner();
    }

    // Execute command
    if let Err(e) = cli::execute(cli) {
        tracing::error!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Print the Fixpoint startup banner.
fn print_banner() {
    println!(
        r#"
  ┌─┐┬─┐ ┬┌─┐┌─┐┬┌┐┌┌┬┐
  ├┤ │┌┴┬┘├─┘│ │││││ │
  └  ┴┴ └─┴  └─┘┴┘└┘ ┴

  Reactive Entity-Graph Runtime v{}

  Monotonic relations, one fixpoint
"#,
        env!("CARGO_PKG_VERSION")
    );
}
