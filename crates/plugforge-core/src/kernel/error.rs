//! # Plugforge Core Kernel Errors
//!
//! Defines the crate-wide [`Error`] type and the [`Result`] alias returned by
//! public registry operations. Subsystem errors (most importantly
//! [`ModuleSystemError`]) convert into it with `?`.
use std::path::PathBuf;
use std::result::Result as StdResult;

use thiserror::Error as ThisError;

use crate::module_system::error::ModuleSystemError;

#[derive(Debug, ThisError)]
pub enum Error {
    /// Specific, typed module system error
    #[error("Module system error: {0}")]
    ModuleSystem(#[from] ModuleSystemError),

    /// Settings or declarations could not be read or parsed
    #[error("Configuration error for '{}': {message}", path.display())]
    Config { path: PathBuf, message: String },

    #[error("I/O error during operation '{operation}' on path '{}': {source}", path.display())]
    Io {
        operation: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Generic error with message
    #[error("Error: {0}")]
    Other(String),
}

/// Shorthand for Result with our Error type
pub type Result<T> = StdResult<T, Error>;

impl From<&str> for Error {
    fn from(msg: &str) -> Self {
        Error::Other(msg.to_string())
    }
}

impl From<String> for Error {
    fn from(msg: String) -> Self {
        Error::Other(msg)
    }
}

impl Error {
    /// Helper to create an I/O error with context
    pub fn io(source: std::io::Error, operation: impl Into<String>, path: PathBuf) -> Self {
        Error::Io {
            operation: operation.into(),
            path,
            source,
        }
    }

    /// Returns the wrapped module system error, if any.
    pub fn as_module_error(&self) -> Option<&ModuleSystemError> {
        match self {
            Error::ModuleSystem(e) => Some(e),
            _ => None,
        }
    }
}
