//! Type-erased instances and the typed boundary around them.
//!
//! The registry stores every concrete object as an [`Instance`]: an
//! `Arc<dyn Any>` wrapping an `Arc<T>` where `T` is usually a `dyn Trait`.
//! Hosts recover the typed handle with [`downcast_instance`], keyed by the
//! [`Capability`] implemented for that trait object type.
use std::any::Any;
use std::sync::Arc;

/// Type-erased object produced by a factory.
pub type Instance = Arc<dyn Any + Send + Sync>;

/// Constructor registered by a module or by the host for one concrete type.
///
/// Receives the declared constructor arguments.
pub type Factory = Arc<dyn Fn(&[String]) -> Result<Instance, String> + Send + Sync>;

/// Ties a (usually unsized) interface type to its capability identifier.
///
/// ```ignore
/// pub trait Renderer: Send + Sync { fn render(&self) -> String; }
/// impl Capability for dyn Renderer { const NAME: &'static str = "IRenderer"; }
/// ```
pub trait Capability: Send + Sync + 'static {
    /// Fully-qualified capability identifier.
    const NAME: &'static str;
}

/// Wraps a typed handle so it can be stored in the registry.
pub fn into_instance<T>(value: Arc<T>) -> Instance
where
    T: ?Sized + Send + Sync + 'static,
{
    Arc::new(value)
}

/// Recovers the typed handle stored by [`into_instance`].
pub fn downcast_instance<T>(instance: &Instance) -> Option<Arc<T>>
where
    T: ?Sized + Send + Sync + 'static,
{
    instance.downcast_ref::<Arc<T>>().cloned()
}

/// Builds a [`Factory`] from a closure returning a typed handle.
pub fn factory<T, F>(build: F) -> Factory
where
    T: ?Sized + Send + Sync + 'static,
    F: Fn(&[String]) -> Result<Arc<T>, String> + Send + Sync + 'static,
{
    Arc::new(move |args: &[String]| build(args).map(into_instance))
}
