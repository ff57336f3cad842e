//! Clotilde Service Library Crate
//!
//! Configuration, command-line flags, the system speech engine and startup
//! wiring for the `clotilde` binary, which is a thin wrapper around this crate.

pub mod app;
pub mod cli;
pub mod config;
pub mod voice;
