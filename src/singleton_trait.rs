//! Core trait shared by every singleton strategy.
//!
//! Consumers that need a handle to a shared resource depend on `Singleton`
//! rather than on a concrete strategy, so a lazily built instance can be
//! swapped for an eager or deferred one without touching call sites.

use std::sync::Arc;

use crate::SingletonError;

/// Access to a single shared instance.
///
/// Implementors guarantee that every successful call returns the same
/// allocation (`Arc::ptr_eq` holds between any two results) and that the
/// instance is fully initialized before any caller can observe it.
pub trait Singleton {
    /// The shared resource type.
    type Instance: Send + Sync + 'static;

    /// Returns the shared instance, constructing it first if the strategy is lazy.
    ///
    /// # Errors
    ///
    /// Only fallible strategies return an error; see [`SingletonError`].
    fn get_instance(&self) -> Result<Arc<Self::Instance>, SingletonError>;

    /// Whether the instance exists yet. Never constructs.
    fn is_constructed(&self) -> bool;

    /// Retrieve a cloned value of the instance.
    ///
    /// # Errors
    ///
    /// Same as [`get_instance`](Self::get_instance).
    fn get_cloned(&self) -> Result<Self::Instance, SingletonError>
    where
        Self::Instance: Clone,
    {
        let arc = self.get_instance()?;
        Ok((*arc).clone())
    }
}
