//! Error types for external restart invocations.

use thiserror::Error;

/// Failures running the configured restart command. Logged, never retried.
#[derive(Error, Debug)]
pub enum RestartError {
    #[error("Restart command is empty")]
    EmptyCommand,

    #[error("Failed to run '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("'{program}' exited with {status}")]
    ExitStatus {
        program: String,
        status: std::process::ExitStatus,
    },
}
