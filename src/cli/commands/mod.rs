//! Command implementations for the CLI.
//!
//! Each command group lives in its own module.

pub mod devices;
pub mod init;
pub mod serve;
