//! # Plugforge Core Kernel
//!
//! Crate-wide error handling ([`Error`](error::Error), [`Result`](error::Result))
//! and the constants shared by the module system: well-known file names,
//! the module entry point symbol and the ABI version modules are checked
//! against.
pub mod constants;
pub mod error;

pub use error::{Error, Result};
