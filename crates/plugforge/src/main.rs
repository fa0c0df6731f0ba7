mod cli;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use log::{debug, error};

use plugforge_core::config::{RegistrySettings, known_module_dirs};
use plugforge_core::kernel::error::Result;
use plugforge_core::module_system::{ModuleRegistry, ModuleRequest, Scope};
use plugforge_core::utils::newest_file_named;

/// Plugforge: capability registry and dynamic module factory
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct CliArgs {
    /// Directory holding local declarations and modules
    #[arg(long, global = true)]
    local_dir: Option<PathBuf>,

    /// Directory holding application declarations and modules
    #[arg(long, global = true)]
    app_dir: Option<PathBuf>,

    /// Settings file (JSON, YAML or TOML); flags override its values
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    /// Ignore the local scope entirely
    #[arg(long, global = true)]
    ignore_local: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List declared modules per scope
    Declarations,
    /// List module files present in each scope directory
    Discover,
    /// Resolve a capability to an implementation
    Resolve {
        /// Capability identifier, e.g. IRenderer
        capability: String,
        /// Use this module file instead of the declared one
        #[arg(long)]
        module: Option<PathBuf>,
        /// Concrete type to instantiate
        #[arg(long)]
        class: Option<String>,
        /// Constructor argument (repeatable)
        #[arg(long = "arg")]
        arguments: Vec<String>,
    },
    /// Read declarations and print every absorbed failure
    Diagnostics,
    /// Find the most recently modified module file of a name in the well-known directories
    Locate {
        file_name: String,
        /// Base directory of the well-known module directories
        #[arg(long, default_value = ".")]
        base: PathBuf,
    },
}

fn load_settings(args: &CliArgs) -> Result<RegistrySettings> {
    let mut settings = match &args.settings {
        Some(path) => RegistrySettings::from_file(path)?,
        None => RegistrySettings::default(),
    };
    if let Some(dir) = &args.local_dir {
        settings.local_dir = Some(dir.clone());
    }
    if let Some(dir) = &args.app_dir {
        settings.application_dir = Some(dir.clone());
    }
    if args.ignore_local {
        settings.ignore_local_modules = true;
    }
    debug!("Effective settings: {:?}", settings);
    Ok(settings)
}

fn run(args: CliArgs) -> Result<ExitCode> {
    let settings = load_settings(&args)?;

    match args.command {
        Commands::Declarations => {
            let registry = ModuleRegistry::bootstrap(settings);
            cli::print_declarations(&registry);
        }
        Commands::Discover => {
            let registry = ModuleRegistry::new(settings);
            for scope in Scope::ALL {
                match registry.discover_module_files(scope) {
                    Ok(files) => cli::print_module_files(scope, &files),
                    Err(e) => println!("{} scope: {}", scope, e),
                }
            }
        }
        Commands::Resolve {
            capability,
            module,
            class,
            arguments,
        } => {
            let mut registry = ModuleRegistry::bootstrap(settings);
            let explicit = module.is_some() || class.is_some() || !arguments.is_empty();
            let outcome = if explicit {
                let request = ModuleRequest {
                    module_path: module.clone(),
                    class_name: class,
                    arguments,
                    store_once: false,
                };
                registry.get_specific(&capability, &request)
            } else {
                registry.get_current(&capability)
            };

            let resolved = match outcome {
                Ok(_) => {
                    cli::print_provider(&registry, &capability, module.as_deref());
                    true
                }
                Err(e) => {
                    eprintln!("Error: {}", e);
                    false
                }
            };
            cli::print_diagnostics(&registry.diagnostics());
            if !resolved {
                return Ok(ExitCode::FAILURE);
            }
        }
        Commands::Diagnostics => {
            let registry = ModuleRegistry::bootstrap(settings);
            cli::print_diagnostics(&registry.diagnostics());
        }
        Commands::Locate { file_name, base } => {
            let dirs = known_module_dirs(&base);
            match newest_file_named(dirs.as_slice(), &file_name) {
                Some(path) => println!("{}", path.display()),
                None => {
                    eprintln!("No '{}' found under {}", file_name, base.display());
                    return Ok(ExitCode::FAILURE);
                }
            }
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let args = CliArgs::parse();
    match run(args) {
        Ok(code) => code,
        Err(e) => {
            error!("plugforge failed: {}", e);
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
