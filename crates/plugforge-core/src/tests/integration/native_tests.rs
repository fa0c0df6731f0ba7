#![cfg(test)]

use std::fs;
use std::sync::Arc;

use crate::module_system::registry::ModuleRegistry;
use crate::module_system::scope::Scope;
use crate::module_system::tests::common::{BuiltinRenderer, Renderer};
use crate::tests::integration::common::Workspace;

#[test]
fn test_unloadable_native_module_falls_back_to_builtin() {
    let ws = Workspace::new();
    ws.declare_json(&ws.app_dir(), "", "IRenderer", "renderer.module", "");
    fs::write(ws.app_dir().join("renderer.module"), b"not a shared library").unwrap();

    let mut settings = ws.settings();
    settings.ignore_local_modules = true;
    let mut registry = ModuleRegistry::bootstrap(settings);
    registry.register_builtin_as::<dyn Renderer, _>("Host.BuiltinRenderer", false, |_| {
        Ok(Arc::new(BuiltinRenderer) as Arc<dyn Renderer>)
    });

    let renderer = registry.get_current_as::<dyn Renderer>().unwrap();
    assert_eq!(renderer.render(), "builtin");
    assert!(registry.cache().is_empty());

    let incidents = registry.drain_diagnostics(true);
    assert_eq!(incidents.len(), 1);
    let incident = incidents.values().next().unwrap();
    assert!(incident.message.contains("renderer.module"));
    assert!(!incident.causes.is_empty());
}

#[test]
fn test_discover_lists_module_files_in_scope() {
    let ws = Workspace::new();
    fs::write(ws.app_dir().join("b.module"), b"").unwrap();
    fs::write(ws.app_dir().join("a.module"), b"").unwrap();
    fs::write(ws.local_dir().join("local.module"), b"").unwrap();
    fs::write(ws.local_dir().join("local.so"), b"").unwrap();

    let registry = ModuleRegistry::new(ws.settings());
    assert_eq!(
        registry.discover_module_files(Scope::Application).unwrap(),
        vec![ws.app_dir().join("a.module"), ws.app_dir().join("b.module")]
    );
    assert_eq!(
        registry.discover_module_files(Scope::Local).unwrap(),
        vec![ws.local_dir().join("local.module")]
    );
}
