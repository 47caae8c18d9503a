//! ArtVault CLI - command orchestration
//!
//! This crate provides the `artvault` binary, the application context that
//! wires the services together, and one function per command.

pub mod commands;
pub mod context;

pub use context::AppContext;
