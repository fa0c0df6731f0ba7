//! Example module exposing the `IRenderer` capability.
//!
//! Built as a `cdylib`, the library exports `_module_register`; declaring it
//! as the implementation of `IRenderer` lets a registry load it on demand.
use std::sync::Arc;

use log::info;
use plugforge_core::module_system::{Capability, ModuleRegistrar, factory};

pub const RENDERER_CAPABILITY: &str = "IRenderer";
pub const FAST_RENDERER_CLASS: &str = "Acme.FastRenderer";

/// Renders a frame description to text.
pub trait Renderer: Send + Sync {
    fn name(&self) -> &str;
    fn render(&self, scene: &str) -> String;
}

impl Capability for dyn Renderer {
    const NAME: &'static str = RENDERER_CAPABILITY;
}

/// Renderer that prefixes every frame with its configured quality.
#[derive(Debug, Clone, PartialEq)]
pub struct FastRenderer {
    quality: u8,
}

impl FastRenderer {
    pub const DEFAULT_QUALITY: u8 = 3;

    /// Build from constructor arguments; the first one, if any, is the quality.
    pub fn from_arguments(arguments: &[String]) -> Result<Self, String> {
        let quality = match arguments.first() {
            Some(raw) => raw
                .parse::<u8>()
                .map_err(|e| format!("invalid quality '{}': {}", raw, e))?,
            None => Self::DEFAULT_QUALITY,
        };
        Ok(Self { quality })
    }

    pub fn quality(&self) -> u8 {
        self.quality
    }
}

impl Renderer for FastRenderer {
    fn name(&self) -> &str {
        FAST_RENDERER_CLASS
    }

    fn render(&self, scene: &str) -> String {
        format!("[fast q{}] {}", self.quality, scene)
    }
}

/// Registration function called through `_module_register`.
pub fn register(registrar: &mut ModuleRegistrar) {
    info!("Registering {}", FAST_RENDERER_CLASS);
    registrar.export_implementation(
        FAST_RENDERER_CLASS,
        RENDERER_CAPABILITY,
        factory(|arguments: &[String]| {
            FastRenderer::from_arguments(arguments).map(|r| Arc::new(r) as Arc<dyn Renderer>)
        }),
    );
}

plugforge_core::declare_module!(register);
