//! # CLI Module
//!
//! Command-line interface of the `ctlrouter` binary.
//!
//! ## Commands
//!
//! ### `serve`
//!
//! Serve the built-in [echo group](crate::echo) until SIGINT or SIGTERM, then stop
//! gracefully:
//!
//! ```bash
//! ctlrouter serve --config ctlrouter.yaml
//! ctlrouter serve --addr 127.0.0.1:8080 --addr [::1]:8080 --auth basic
//! ```
//!
//! Options:
//! - `--config <FILE>` - YAML or TOML configuration (also `CTLR_CONFIG`)
//! - `--addr <ADDR>` - listening address, repeatable; replaces `bind` from the file
//! - `--auth <SCHEME>` - `none`, `cookie`, `basic` or `key`; replaces `auth` from the file
//!
//! Worker settings from the file are overridden by `CTLR_WORKERS` / `CTLR_STACK_SIZE`
//! ([`crate::runtime_config`]); logging is configured by `CTLR_LOG_*` ([`crate::logging`]).
//!
//! ### `routes`
//!
//! Print the echo group's route table:
//!
//! ```bash
//! ctlrouter routes
//! ```
//!
//! ## Usage from Code
//!
//! ```rust,ignore
//! use clap::Parser;
//! use ctlrouter::cli::{run_cli, Cli};
//!
//! run_cli(Cli::parse())?;
//! ```

mod commands;


pub use commands::{load_config, route_listing, run_cli, AuthArg, Cli, Commands};
