#![cfg(test)]

use std::fs;
use std::sync::Arc;

use crate::config::RegistrySettings;
use crate::module_system::registry::ModuleRegistry;
use crate::module_system::scope::Scope;
use crate::module_system::tests::common::{
    MockOpener, Renderer, register_fast, register_slow,
};
use crate::tests::integration::common::Workspace;

fn build(settings: RegistrySettings, opener: &MockOpener) -> ModuleRegistry {
    ModuleRegistry::builder()
        .settings(settings)
        .opener(Box::new(opener.clone()))
        .build()
}

#[test]
fn test_initialize_reads_both_scopes_and_prefers_local() {
    let ws = Workspace::new();
    ws.declare_json(&ws.app_dir(), "", "IRenderer", "fast.module", "");
    ws.declare_json(
        &ws.local_dir(),
        "local_",
        "IRenderer",
        "slow.module",
        r#", "class_name": "Acme.SlowRenderer", "store_once": true"#,
    );
    let opener = MockOpener::new()
        .with_module(ws.app_dir().join("fast.module"), register_fast)
        .with_module(ws.local_dir().join("slow.module"), register_slow);

    let mut registry = build(ws.settings(), &opener);
    assert_eq!(registry.initialize(), 2);
    assert!(registry.declarations().is_scope_loaded(Scope::Local));
    assert!(registry.declarations().is_scope_loaded(Scope::Application));

    let first = registry.get_current_as::<dyn Renderer>().unwrap();
    let second = registry.get_current_as::<dyn Renderer>().unwrap();
    assert_eq!(first.render(), "slow");
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(opener.open_count(&ws.local_dir().join("slow.module")), 1);
    assert_eq!(opener.open_count(&ws.app_dir().join("fast.module")), 0);
    assert!(registry.drain_diagnostics(true).is_empty());
}

#[test]
fn test_ignore_local_modules_skips_local_scope() {
    let ws = Workspace::new();
    ws.declare_json(&ws.app_dir(), "", "IRenderer", "fast.module", "");
    ws.declare_json(&ws.local_dir(), "local_", "IRenderer", "slow.module", "");
    let opener = MockOpener::new()
        .with_module(ws.app_dir().join("fast.module"), register_fast)
        .with_module(ws.local_dir().join("slow.module"), register_slow);

    let mut settings = ws.settings();
    settings.ignore_local_modules = true;
    let mut registry = build(settings, &opener);
    assert_eq!(registry.initialize(), 1);
    assert!(!registry.declarations().is_scope_loaded(Scope::Local));

    assert_eq!(registry.get_current_as::<dyn Renderer>().unwrap().render(), "fast");
}

#[test]
fn test_missing_local_declarations_are_absorbed() {
    let ws = Workspace::new();
    ws.declare_json(&ws.app_dir(), "", "IRenderer", "fast.module", "");
    let opener = MockOpener::new().with_module(ws.app_dir().join("fast.module"), register_fast);

    let mut registry = build(ws.settings(), &opener);
    assert_eq!(registry.initialize(), 1);

    // Both local files are missing.
    let incidents = registry.drain_diagnostics(true);
    assert_eq!(incidents.len(), 2);
    assert!(incidents.keys().all(|k| k.ends_with("Missing local declarations")));

    assert_eq!(registry.get_current_as::<dyn Renderer>().unwrap().render(), "fast");
}

#[test]
fn test_settings_file_drives_bootstrap() {
    let ws = Workspace::new();
    ws.declare_json(&ws.app_dir(), "", "IRenderer", "fast.module", "");
    let settings_path = ws.root.path().join("plugforge.json");
    fs::write(
        &settings_path,
        format!(
            r#"{{ "application_dir": {:?}, "ignore_local_modules": true }}"#,
            ws.app_dir().to_string_lossy()
        ),
    )
    .unwrap();

    let settings = RegistrySettings::from_file(&settings_path).unwrap();
    let opener = MockOpener::new().with_module(ws.app_dir().join("fast.module"), register_fast);
    let mut registry = build(settings, &opener);
    assert_eq!(registry.initialize(), 1);
    assert_eq!(registry.preload_scope(Scope::Application).unwrap(), 1);
    assert_eq!(registry.get_current_as::<dyn Renderer>().unwrap().render(), "fast");
    assert_eq!(opener.total_opens(), 1);
}
