//! # System — Per-Frame Behavior
//!
//! A system is anything that can run against the [`Engine`] once per frame,
//! given the elapsed time in seconds. Closures and functions of shape
//! `FnMut(&mut Engine, f32)` are systems already:
//!
//! ```ignore
//! engine.add_system(|engine: &mut Engine, delta: f32| {
//!     for m in engine.find_entities_with::<(&mut Transform, &Spin)>() {
//!         // ...
//!     }
//! });
//! ```
//!
//! Systems that need private state (a camera controller tracking its speed,
//! say) implement [`System`] on a struct. The engine never looks inside.
//!
//! ## Scheduling
//!
//! Systems run in the order they were added, one at a time, exactly once per
//! [`Engine::run`]. No priorities, no parallelism.

use super::engine::Engine;

/// A unit of behavior driven once per tick by an [`Engine`].
pub trait System {
    fn run(&mut self, engine: &mut Engine, delta: f32);
}

/// Blanket impl: any `FnMut(&mut Engine, f32)` is a `System`.
impl<F: FnMut(&mut Engine, f32)> System for F {
    fn run(&mut self, engine: &mut Engine, delta: f32) {
        (self)(engine, delta);
    }
}

/// A boxed [`System`] plus a short name for diagnostics.
pub(crate) struct NamedSystem {
    #[cfg(any(feature = "diagnostics", test))]
    pub(crate) name: String,
    pub(crate) system: Box<dyn System>,
}

impl NamedSystem {
    pub(crate) fn new<S: System + 'static>(system: S) -> Self {
        Self {
            #[cfg(any(feature = "diagnostics", test))]
            name: short_system_name(std::any::type_name::<S>()),
            system: Box::new(system),
        }
    }
}

/// Strip the module path from a fully-qualified type name, keeping only the
/// last meaningful segment (e.g. `demo::CameraController` → `CameraController`,
/// `{{closure}}` → `<closure>`).
#[cfg(any(feature = "diagnostics", test))]
fn short_system_name(full: &str) -> String {
    let name = full.rsplit("::").next().unwrap_or(full);
    if name.contains("closure") {
        "<closure>".to_string()
    } else {
        name.to_string()
    }
}
