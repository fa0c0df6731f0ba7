//! # Module System Errors
//!
//! [`ModuleSystemError`] covers every failure the registry can hit: missing
//! or unreadable declarations, modules that cannot be opened, modules that
//! expose nothing usable, and the terminal [`ModuleSystemError::TypeLoadError`]
//! returned when no implementation of a capability could be produced.
//! Only `TypeLoadError` and `InvalidArgument` ever reach a caller; the rest are
//! absorbed into the diagnostics ledger.
use std::path::PathBuf;

use crate::module_system::scope::Scope;

#[derive(Debug, thiserror::Error)]
pub enum ModuleSystemError {
    #[error("Missing {scope} declarations file: {}", path.display())]
    ConfigurationMissing { scope: Scope, path: PathBuf },

    #[error("Invalid declarations file '{}': {message}", path.display())]
    ConfigurationInvalid { path: PathBuf, message: String },

    #[error("Module loading failed for '{}': {source}", path.display())]
    ModuleLoadError {
        path: PathBuf,
        #[source]
        source: Box<ModuleLoadErrorSource>,
    },

    #[error("Module '{}' exposes no capabilities", path.display())]
    ZeroCapabilityModule { path: PathBuf },

    #[error("Unable to provide capability '{capability}'{}: {reason}", module_path.as_ref().map(|p| format!(" (module '{}')", p.display())).unwrap_or_default())]
    TypeLoadError {
        capability: String,
        module_path: Option<PathBuf>,
        reason: String,
    },

    #[error("Invalid argument '{parameter}': {message}")]
    InvalidArgument {
        parameter: &'static str,
        message: String,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum ModuleLoadErrorSource {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("libloading error: {0}")]
    Library(#[from] libloading::Error),
    #[error("missing entry point symbol '{0}'")]
    MissingEntryPoint(String),
    #[error("panic during module registration: {0}")]
    Panic(String),
    #[error("module built for ABI {found}, core requires {required}")]
    IncompatibleAbi { found: String, required: String },
    #[error("Other: {0}")]
    Other(String),
}

impl ModuleSystemError {
    pub fn load(path: impl Into<PathBuf>, source: impl Into<ModuleLoadErrorSource>) -> Self {
        ModuleSystemError::ModuleLoadError {
            path: path.into(),
            source: Box::new(source.into()),
        }
    }

    pub fn type_load(
        capability: impl Into<String>,
        module_path: Option<PathBuf>,
        reason: impl Into<String>,
    ) -> Self {
        ModuleSystemError::TypeLoadError {
            capability: capability.into(),
            module_path,
            reason: reason.into(),
        }
    }
}
