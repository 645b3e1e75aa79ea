//! # Runtime Configuration Module
//!
//! Environment overrides for the coroutine runtime, applied on top of the `workers`
//! section of the server configuration.
//!
//! ## Environment Variables
//!
//! ### `CTLR_STACK_SIZE`
//!
//! Stack size of each worker coroutine. Accepts decimal (`65536`) or hexadecimal
//! (`0x10000`). A worker runs the whole request pipeline including the handler, so size it
//! for the deepest handler. Memory use is roughly `stack_size × CTLR_WORKERS`.
//!
//! ### `CTLR_WORKERS`
//!
//! Number of worker coroutines, i.e. the number of requests served concurrently.
//!
//! ```bash
//! export CTLR_STACK_SIZE=0x8000
//! export CTLR_WORKERS=64
//! ctlrouter serve
//! ```

use crate::worker_pool::WorkerPoolConfig;
use std::env;
use tracing::warn;

/// Runtime overrides loaded from environment variables.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RuntimeConfig {
    /// Coroutine stack size in bytes
    pub stack_size: Option<usize>,
    /// Worker coroutine count
    pub workers: Option<usize>,
}

/// Parse a size given in decimal or `0x` hexadecimal
#[must_use]
pub fn parse_size(s: &str) -> Option<usize> {
    let s = s.trim();
    match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => usize::from_str_radix(hex, 16).ok(),
        None => s.parse().ok(),
    }
}

impl RuntimeConfig {
    /// Load configuration from environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as [`RuntimeConfig::from_env`] with a custom variable source
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key: &str| {
            let raw = lookup(key)?;
            let parsed = parse_size(&raw).filter(|&n| n > 0);
            if parsed.is_none() {
                warn!(variable = key, value = %raw, "ignoring invalid runtime override");
            }
            parsed
        };
        Self {
            stack_size: read("CTLR_STACK_SIZE"),
            workers: read("CTLR_WORKERS"),
        }
    }

    /// Override the worker settings that were set in the environment
    pub fn apply(&self, workers: &mut WorkerPoolConfig) {
        if let Some(stack_size) = self.stack_size {
            workers.stack_size = stack_size;
        }
        if let Some(n) = self.workers {
            workers.num_workers = n;
        }
    }
}
