//! # fixpoint
//!
//! Library half of the Fixpoint binary: CLI definition, config file
//! loading and the bundled scenarios. `main.rs` only sets up logging and
//! calls [`cli::execute`].

pub mod cli;
pub mod config;
pub mod scenarios;
