//! logship daemon library.
//!
//! Exposes the daemon internals for integration testing.
//! In production, `logship-daemon` is used as a binary (main.rs).

pub mod cli;
pub mod health;
pub mod logging;
pub mod manager;
pub mod metrics_server;

pub use manager::Manager;
