#![cfg(test)]

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::module_system::abi::ModuleRegistrar;
use crate::module_system::capability::{Capability, Instance, factory};
use crate::module_system::declaration::{
    CapabilityCatalog, CapabilitySource, ModuleCatalog, ModuleDeclaration,
};
use crate::module_system::error::ModuleSystemError;
use crate::module_system::loader::{ModuleOpener, OpenedModule};

// ===== TEST CAPABILITIES =====

pub trait Renderer: Send + Sync {
    fn render(&self) -> String;
}

impl Capability for dyn Renderer {
    const NAME: &'static str = "IRenderer";
}

pub trait Exporter: Send + Sync {
    fn export(&self) -> Vec<u8>;
}

impl Capability for dyn Exporter {
    const NAME: &'static str = "IExporter";
}

pub struct FastRenderer;

impl Renderer for FastRenderer {
    fn render(&self) -> String {
        "fast".to_string()
    }
}

pub struct SlowRenderer;

impl Renderer for SlowRenderer {
    fn render(&self) -> String {
        "slow".to_string()
    }
}

pub struct BuiltinRenderer;

impl Renderer for BuiltinRenderer {
    fn render(&self) -> String {
        "builtin".to_string()
    }
}

/// Renders its constructor arguments joined by commas.
pub struct EchoRenderer {
    pub arguments: Vec<String>,
}

impl Renderer for EchoRenderer {
    fn render(&self) -> String {
        self.arguments.join(",")
    }
}

pub struct CsvExporter;

impl Exporter for CsvExporter {
    fn export(&self) -> Vec<u8> {
        b"a,b".to_vec()
    }
}

// ===== MODULE REGISTRATION FUNCTIONS =====

pub type RegisterFn = fn(&mut ModuleRegistrar);

pub fn register_fast(registrar: &mut ModuleRegistrar) {
    registrar.stamp_current_abi().set_module_version("1.2.0");
    registrar.export_implementation(
        "Acme.FastRenderer",
        "IRenderer",
        factory(|_| Ok(Arc::new(FastRenderer) as Arc<dyn Renderer>)),
    );
}

pub fn register_slow(registrar: &mut ModuleRegistrar) {
    registrar.stamp_current_abi();
    registrar.export_implementation(
        "Acme.SlowRenderer",
        "IRenderer",
        factory(|_| Ok(Arc::new(SlowRenderer) as Arc<dyn Renderer>)),
    );
}

pub fn register_exporter(registrar: &mut ModuleRegistrar) {
    registrar.stamp_current_abi();
    registrar.export_implementation(
        "Acme.CsvExporter",
        "IExporter",
        factory(|_| Ok(Arc::new(CsvExporter) as Arc<dyn Exporter>)),
    );
}

/// Two implementations of one capability plus a second capability.
pub fn register_suite(registrar: &mut ModuleRegistrar) {
    registrar.stamp_current_abi();
    registrar
        .export_implementation(
            "Acme.SlowRenderer",
            "IRenderer",
            factory(|_| Ok(Arc::new(SlowRenderer) as Arc<dyn Renderer>)),
        )
        .export_implementation(
            "Acme.EchoRenderer",
            "IRenderer",
            factory(|args: &[String]| {
                Ok(Arc::new(EchoRenderer { arguments: args.to_vec() }) as Arc<dyn Renderer>)
            }),
        )
        .export_implementation(
            "Acme.CsvExporter",
            "IExporter",
            factory(|_| Ok(Arc::new(CsvExporter) as Arc<dyn Exporter>)),
        );
}

/// Exposes only an implementation-kind type: no capabilities.
pub fn register_empty(registrar: &mut ModuleRegistrar) {
    registrar.stamp_current_abi();
    registrar.export_type(crate::module_system::abi::ExportedType::implementation(
        "Acme.Helper",
        Vec::new(),
    ));
}

/// Declares the capability but its only factory always fails.
pub fn register_broken(registrar: &mut ModuleRegistrar) {
    registrar.stamp_current_abi();
    registrar.export_implementation(
        "Acme.BrokenRenderer",
        "IRenderer",
        Arc::new(|_: &[String]| -> Result<Instance, String> { Err("constructor failed".to_string()) }),
    );
}

// ===== MOCK OPENER =====

/// In-memory [`ModuleOpener`] mapping paths to registration functions.
#[derive(Clone, Default)]
pub struct MockOpener {
    modules: Arc<Mutex<HashMap<PathBuf, RegisterFn>>>,
    opened: Arc<Mutex<Vec<PathBuf>>>,
}

impl MockOpener {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_module(self, path: impl Into<PathBuf>, register: RegisterFn) -> Self {
        self.modules.lock().unwrap().insert(path.into(), register);
        self
    }

    /// How many times `path` was opened.
    pub fn open_count(&self, path: &Path) -> usize {
        self.opened.lock().unwrap().iter().filter(|p| p.as_path() == path).count()
    }

    pub fn total_opens(&self) -> usize {
        self.opened.lock().unwrap().len()
    }
}

impl ModuleOpener for MockOpener {
    fn open(&self, path: &Path) -> Result<OpenedModule, ModuleSystemError> {
        self.opened.lock().unwrap().push(path.to_path_buf());
        let register = self.modules.lock().unwrap().get(path).copied().ok_or_else(|| {
            ModuleSystemError::load(
                path,
                std::io::Error::new(std::io::ErrorKind::NotFound, "no such mock module"),
            )
        })?;
        let mut registrar = ModuleRegistrar::new();
        register(&mut registrar);
        Ok(OpenedModule::from_registrar(registrar))
    }
}

// ===== DECLARATION FIXTURES =====

pub fn catalog_for(source: &str, capabilities: &[&str]) -> CapabilityCatalog {
    CapabilityCatalog {
        about: Some("test declarations".to_string()),
        app_name: Some("plugforge-tests".to_string()),
        registered_app_id: None,
        interface_sources: vec![CapabilitySource {
            source_name: source.to_string(),
            interfaces: capabilities.iter().map(|c| c.to_string()).collect(),
        }],
    }
}

pub fn modules(declarations: Vec<ModuleDeclaration>) -> ModuleCatalog {
    ModuleCatalog { modules: declarations }
}
