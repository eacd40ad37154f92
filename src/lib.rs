//! # Lazy Singleton
//!
//! Thread-safe, lazily constructed singletons.
//! Exactly one construction, no matter how many threads race on first access.
//!
//! The core type, [`LazySingletonRegistry`], uses double-checked locking: a
//! lock-free `Acquire` read on the fast path, and a mutex plus re-check on the
//! slow path, with the finished instance published by a `Release` store. A
//! caller never observes a partially constructed instance.
//!
//! ## Quick Start
//!
//! ```rust
//! use lazy_singleton::LazySingletonRegistry;
//! use std::sync::Arc;
//!
//! static GREETING: LazySingletonRegistry<String> =
//!     LazySingletonRegistry::new(|| Ok("Hello, World!".to_string()));
//!
//! let message: Arc<String> = GREETING.get_instance().unwrap();
//! assert_eq!(&*message, "Hello, World!");
//! ```
//!
//! ## Features
//!
//! - **Thread-safe**: one construction under concurrent first access
//! - **Retry or fail permanently**: chosen per registry with [`FailurePolicy`]
//! - **Guarded bypass paths**: [`install`](LazySingletonRegistry::install) and
//!   [`force_construct`](LazySingletonRegistry::force_construct) refuse a second instance;
//!   deserialization resolves to the shared instance
//! - **Tracing support**: optional per-registry callback plus `tracing` records
//!
//! ## Main Items
//!
//! - [`LazySingletonRegistry`] - double-checked lazy singleton
//! - [`EagerSingleton`] / [`DeferredSingleton`] - alternative strategies
//! - [`Singleton`] - the access trait all strategies share
//! - [`define_singleton!`] - a module-scoped access point around a `static` registry
//! - [`construct_within`] - bound a blocking construction step

mod lazy_registry;
mod macros;
#[cfg(feature = "serde")]
mod resolve;
mod singleton_error;
mod singleton_event;
mod singleton_trait;
mod strategies;
mod timeout;

// Re-export the main public API
pub use lazy_registry::{FailurePolicy, Factory, LazySingletonRegistry};
pub use singleton_error::{BoxError, ConstructionTimeout, SingletonError};
pub use singleton_event::{SingletonEvent, TraceCallback};
pub use singleton_trait::Singleton;
pub use strategies::{DeferredSingleton, EagerSingleton};
pub use timeout::construct_within;
