//! Error types for the device registry.

use std::path::PathBuf;
use thiserror::Error;

/// Errors returned to callers of the registry.
#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("Cannot open config file {path}: {source}")]
    FileAccess {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// A record line that could not be turned into a device.
///
/// Never returned from `Registry::load`; the offending line is logged and skipped.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("Failed to parse record on line {line}")]
    MalformedRecord { line: usize },

    #[error("Failed to parse disabled record on line {line}")]
    MalformedDisabledRecord { line: usize },

    #[error("Failed to parse MAC address '{mac}' on line {line}: {reason}")]
    InvalidMac {
        line: usize,
        mac: String,
        reason: MacError,
    },
}

impl ParseError {
    /// Source line (1-based) the error refers to.
    pub fn line(&self) -> usize {
        match self {
            ParseError::MalformedRecord { line }
            | ParseError::MalformedDisabledRecord { line }
            | ParseError::InvalidMac { line, .. } => *line,
        }
    }
}

/// Hardware address validation failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MacError {
    #[error("empty address")]
    Empty,

    #[error("expected 6, 8 or 20 octets, found {0}")]
    OctetCount(usize),

    #[error("mixed separators")]
    MixedSeparators,

    #[error("invalid octet '{0}'")]
    InvalidOctet(String),
}

pub type RegistryResult<T> = Result<T, RegistryError>;
