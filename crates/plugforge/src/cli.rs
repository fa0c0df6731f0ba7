use std::path::{Path, PathBuf};

use plugforge_core::module_system::{DiagnosticsLedger, ModuleRegistry, Scope};

/// Print each scope's declared modules with their validity.
pub fn print_declarations(registry: &ModuleRegistry) {
    let declarations = registry.declarations();
    for scope in Scope::ALL {
        let Some(dir) = declarations.scope_dir(scope) else {
            println!("{} scope: not configured", scope);
            continue;
        };
        if !declarations.is_scope_loaded(scope) {
            println!("{} scope ({}): no declarations", scope, dir.display());
            continue;
        }

        println!("{} scope ({}):", scope, dir.display());
        if let Some(catalog) = declarations.capability_catalog(scope) {
            if let Some(app_name) = &catalog.app_name {
                println!("  Application: {}", app_name);
            }
            let app_id = catalog.decoded_app_id();
            if !app_id.is_empty() {
                println!("  Registered id: {}", app_id);
            }
        }
        let modules = declarations.declared_modules(scope);
        if modules.is_empty() {
            println!("  No modules declared.");
        }
        for module in modules {
            let status = if module.is_valid() { "valid" } else { "invalid" };
            let class = module.class_name.as_deref().unwrap_or("<first implementation>");
            println!(
                "  - {} -> {} [{}] class: {}{}",
                module.interface,
                module.module_name,
                status,
                class,
                if module.store_once { ", store once" } else { "" }
            );
            if let Some(path) = module.resolved_path() {
                println!("      path: {}", path.display());
            }
        }
    }
}

pub fn print_module_files(scope: Scope, files: &[PathBuf]) {
    println!("{} scope: {} module file(s)", scope, files.len());
    for file in files {
        println!("  - {}", file.display());
    }
}

/// Report which cached module (if any) now provides `capability`.
pub fn print_provider(registry: &ModuleRegistry, capability: &str, module: Option<&Path>) {
    let provider = registry
        .cache()
        .find_by_capability(capability, module)
        .and_then(|id| registry.cache().get(id));
    match provider {
        Some(record) => println!(
            "Resolved {} from {} (version {})",
            capability,
            record.file_path.display(),
            record.version.as_deref().unwrap_or("unknown")
        ),
        None => println!("Resolved {} from a built-in implementation", capability),
    }
}

/// Drain and print every incident and note.
pub fn print_diagnostics(diagnostics: &DiagnosticsLedger) {
    let mut incidents: Vec<_> = diagnostics.drain_all(true).into_iter().collect();
    incidents.sort_by(|a, b| a.1.recorded_at.cmp(&b.1.recorded_at));

    if incidents.is_empty() {
        println!("No incidents recorded.");
    } else {
        println!("{} incident(s):", incidents.len());
    }
    for (key, incident) in incidents {
        println!("  [{}] {}", key, incident.message);
        for cause in &incident.causes {
            println!("      caused by: {}", cause);
        }
    }
    for note in diagnostics.drain_notes(true) {
        println!("  note: {}", note);
    }
}
