//! # Plugforge Module System
//!
//! Resolves capability identifiers to concrete instances, loading module
//! files on demand and falling back to implementations compiled into the host.
//!
//! ## Key Submodules and Responsibilities:
//!
//! - **[`abi`]**: The self-registration surface a module exports
//!   ([`ModuleRegistrar`], [`declare_module!`](crate::declare_module)).
//! - **[`builtin`]**: Registration table of host-provided implementations.
//! - **[`cache`]**: Canonical records of loaded modules ([`ModuleCache`]).
//! - **[`capability`]**: Type-erased [`Instance`]s and the [`Capability`] trait
//!   binding interface types to identifiers.
//! - **[`declaration`]**: Per-scope capability and module catalogs ([`DeclarationStore`]).
//! - **[`diagnostics`]**: The ledger of absorbed failures ([`DiagnosticsLedger`]).
//! - **[`error`]**: [`ModuleSystemError`] and load failure sources.
//! - **[`loader`]**: Opening module files ([`ModuleLoader`], [`ModuleOpener`]).
//! - **[`record`]**: [`LoadedModule`] and the live [`ModuleHandle`].
//! - **[`registry`]**: The orchestrator hosts talk to ([`ModuleRegistry`]).
//! - **[`scope`]**: Local and application [`Scope`]s.
pub mod abi;
pub mod builtin;
pub mod cache;
pub mod capability;
pub mod declaration;
pub mod diagnostics;
pub mod error;
pub mod loader;
pub mod record;
pub mod registry;
pub mod scope;

pub use abi::{ExportKind, ExportedType, ModuleRegistrar, Visibility};
pub use builtin::BuiltinTable;
pub use cache::ModuleCache;
pub use capability::{Capability, Factory, Instance, downcast_instance, factory, into_instance};
pub use declaration::{
    CapabilityCatalog, CapabilitySource, DeclarationStore, ModuleCatalog, ModuleDeclaration,
};
pub use diagnostics::{DiagnosticsLedger, Incident};
pub use error::{ModuleLoadErrorSource, ModuleSystemError};
pub use loader::{ModuleLoader, ModuleOpener, NativeOpener, OpenedModule};
pub use record::{CacheId, LoadedModule, ModuleHandle};
pub use registry::{ModuleRegistry, ModuleRequest, RegistryBuilder, SharedRegistry};
pub use scope::Scope;

#[cfg(test)]
pub(crate) mod tests;
