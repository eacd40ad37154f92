//! Macros for declaring process-wide singletons.
//!
//! This module provides a macro-based way to give a singleton exactly one
//! well-defined access point: a module that owns the `static` registry and
//! exposes free functions, instead of scattering globals across the crate.

/// Declares a lazily constructed process-wide singleton in its own module.
///
/// The macro generates a module containing:
/// - The `static` [`LazySingletonRegistry`](crate::LazySingletonRegistry) (module-private)
/// - Free functions delegating to it (`get_instance`, `get`, `is_constructed`, ...)
///
/// The module glob-imports its parent, so the type and factory can be named
/// as they are at the invocation site. Invoke it at module level.
///
/// # Examples
///
/// ```rust
/// use lazy_singleton::define_singleton;
/// use std::sync::Arc;
///
/// pub struct Settings {
///     pub retries: u32,
/// }
///
/// define_singleton!(settings: Settings = || Ok(Settings { retries: 3 }));
///
/// fn main() {
///     let a: Arc<Settings> = settings::get_instance().unwrap();
///     let b: Arc<Settings> = settings::get_instance().unwrap();
///     assert!(Arc::ptr_eq(&a, &b));
///     assert_eq!(a.retries, 3);
/// }
/// ```
///
/// # Failure Policy
///
/// ```rust
/// use lazy_singleton::{define_singleton, FailurePolicy};
///
/// define_singleton!(
///     flaky: String = || Err("backend offline".into()),
///     policy = FailurePolicy::FailPermanently
/// );
///
/// fn main() {
///     assert!(flaky::get_instance().is_err());
///     assert!(flaky::get_instance().is_err());
///     assert_eq!(flaky::attempts(), 1);
/// }
/// ```
#[macro_export]
macro_rules! define_singleton {
    ($name:ident : $ty:ty = $factory:expr) => {
        $crate::define_singleton!($name: $ty = $factory, policy = $crate::FailurePolicy::Retry);
    };
    ($name:ident : $ty:ty = $factory:expr, policy = $policy:expr) => {
        #[allow(dead_code)]
        pub mod $name {
            #[allow(unused_imports)]
            use super::*;

            use std::sync::Arc;

            // The single shared slot (module-private)
            static REGISTRY: $crate::LazySingletonRegistry<$ty> =
                $crate::LazySingletonRegistry::with_policy($factory, $policy);

            /// Borrow the underlying registry, e.g. to pass it as a `Singleton`.
            pub fn registry() -> &'static $crate::LazySingletonRegistry<$ty> {
                &REGISTRY
            }

            /// Returns the shared instance, constructing it on first use.
            pub fn get_instance() -> Result<Arc<$ty>, $crate::SingletonError> {
                REGISTRY.get_instance()
            }

            /// Returns the instance if it has already been constructed.
            pub fn get() -> Option<Arc<$ty>> {
                REGISTRY.get()
            }

            /// Whether the instance has been constructed.
            pub fn is_constructed() -> bool {
                REGISTRY.is_constructed()
            }

            /// Number of factory invocations so far.
            pub fn attempts() -> u32 {
                REGISTRY.attempts()
            }

            /// Runs the factory directly; fails once an instance exists.
            pub fn force_construct() -> Result<Arc<$ty>, $crate::SingletonError> {
                REGISTRY.force_construct()
            }

            /// Publishes an externally built value; fails once an instance exists.
            pub fn install(value: $ty) -> Result<Arc<$ty>, $crate::SingletonError> {
                REGISTRY.install(value)
            }

            /// Resolves a decoded copy to the shared instance.
            pub fn resolve(decoded: $ty) -> Result<Arc<$ty>, $crate::SingletonError> {
                REGISTRY.resolve(decoded)
            }

            /// Set a tracing callback for construction events.
            pub fn set_trace_callback(
                callback: impl Fn(&$crate::SingletonEvent) + Send + Sync + 'static,
            ) {
                REGISTRY.set_trace_callback(callback)
            }

            /// Clear the tracing callback.
            pub fn clear_trace_callback() {
                REGISTRY.clear_trace_callback()
            }
        }
    };
}
