pub mod config;
pub mod kernel;
pub mod module_system;
pub mod utils;

// Re-export key public types for the binary and for modules
pub use config::RegistrySettings;
pub use kernel::error::Error as KernelError;
pub use module_system::{
    Capability, Instance, ModuleRegistrar, ModuleRegistry, ModuleRequest, Scope, SharedRegistry,
};

#[cfg(test)]
mod tests;
