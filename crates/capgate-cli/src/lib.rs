//! capgate CLI library
//!
//! Simulated host platform for the capability gate: a persisted grant
//! store, a permission dialog subsystem that answers asynchronously, and a
//! toast-style observer, plus the grant store subcommands.

pub mod commands;
pub mod host;
pub mod toast;
