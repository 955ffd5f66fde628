//! # Runtime Configuration
//!
//! Knobs of a single run. Both are optional; the default is strict FIFO
//! dispatch with no task limit.

use serde::{Deserialize, Serialize};

/// Order in which the scheduler pops pending tasks.
///
/// Any order is legal: the final state of a run is identical for every
/// dispatch order, only the order of side effects changes. FIFO gives
/// reproducible logs and is the default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DispatchOrder {
    /// Oldest pending task first.
    #[default]
    Fifo,
    /// Newest pending task first.
    Lifo,
}

impl DispatchOrder {
    /// Parse the lowercase name used in config files and on the command line.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "fifo" => Some(Self::Fifo),
            "lifo" => Some(Self::Lifo),
            _ => None,
        }
    }
}

/// Runtime configuration for a [`Context`](crate::Context).
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RuntimeConfig {
    /// Queue discipline.
    pub dispatch: DispatchOrder,
    /// Watchdog: fail the run once this many tasks have executed without
    /// reaching quiescence. `None` disables the watchdog.
    pub max_tasks: Option<u64>,
}

impl RuntimeConfig {
    /// Set the dispatch order.
    #[must_use]
    pub fn with_dispatch(mut self, dispatch: DispatchOrder) -> Self {
        self.dispatch = dispatch;
        self
    }

    /// Set the watchdog task limit.
    #[must_use]
    pub fn with_max_tasks(mut self, limit: u64) -> Self {
        self.max_tasks = Some(limit);
        self
    }
}
