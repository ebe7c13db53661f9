//! Write-ahead-log integration.
//!
//! The buffer pool never writes a dirty page back to disk before the log
//! records covering it are durable. [`LogManager`] is the hook that rule
//! goes through; the actual log storage and group-commit policy live above
//! this crate.

mod log_manager;

pub use log_manager::LogManager;
