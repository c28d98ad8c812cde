//! # orgdir-cli: Organization Directory Command-Line Interface
//!
//! ## Subcommands
//!
//! - `validate`, `project`, `document`: offline, file in, report out.
//! - `publish`, `retract`, `fields`: derived records in Redis.
//! - `save`, `destroy`, `stat`: the organization service, backed by
//!   Postgres or memory plus Redis.
//!
//! Argument parsing lives here; the work is done by the domain crates.

pub mod cache;
pub mod input;
pub mod offline;
pub mod service;
pub mod telemetry;
