//! Singleton strategies that need no hand-written locking.
//!
//! - [`EagerSingleton`] builds its instance up front, before any thread can race on it.
//! - [`DeferredSingleton`] builds on first reference and leans on [`OnceLock`]
//!   to serialize that first run.
//!
//! A third shape needs no runtime support at all: a closed, single-variant
//! `enum` whose only value is created by the compiler.
//!
//! ```
//! #[derive(Debug, Clone, Copy, PartialEq, Eq)]
//! enum Clock {
//!     Instance,
//! }
//!
//! impl Clock {
//!     fn ticks_per_second(self) -> u32 {
//!         1_000
//!     }
//! }
//!
//! assert_eq!(Clock::Instance.ticks_per_second(), 1_000);
//! ```

use std::{
    fmt,
    sync::{Arc, OnceLock},
};

use tracing::debug;

use crate::{BoxError, Singleton, SingletonError};

// -------------------------------------------------------------------------------------------------
// Eager
// -------------------------------------------------------------------------------------------------

/// A singleton constructed when it is defined.
///
/// Trivially correct: the instance exists before the value can be shared, so
/// no access ever needs to synchronize.
pub struct EagerSingleton<T> {
    instance: Arc<T>,
}

impl<T> EagerSingleton<T> {
    pub fn new(value: T) -> Self {
        EagerSingleton {
            instance: Arc::new(value),
        }
    }

    /// Builds the instance now, surfacing a factory failure immediately.
    pub fn try_new(factory: impl FnOnce() -> Result<T, BoxError>) -> Result<Self, SingletonError> {
        let value = factory().map_err(|source| SingletonError::Construction {
            type_name: std::any::type_name::<T>(),
            attempt: 1,
            source,
        })?;
        debug!(
            type_name = std::any::type_name::<T>(),
            "eager singleton constructed"
        );
        Ok(Self::new(value))
    }

    /// Borrow the instance without touching the reference count.
    pub fn instance(&self) -> &Arc<T> {
        &self.instance
    }
}

impl<T> fmt::Debug for EagerSingleton<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EagerSingleton")
            .field("type_name", &std::any::type_name::<T>())
            .finish_non_exhaustive()
    }
}

impl<T: Send + Sync + 'static> Singleton for EagerSingleton<T> {
    type Instance = T;

    fn get_instance(&self) -> Result<Arc<T>, SingletonError> {
        Ok(Arc::clone(&self.instance))
    }

    fn is_constructed(&self) -> bool {
        true
    }
}

// -------------------------------------------------------------------------------------------------
// Deferred
// -------------------------------------------------------------------------------------------------

/// A singleton constructed on first reference through [`OnceLock`].
///
/// The factory is infallible; the standard library runs it exactly once and
/// blocks concurrent first callers until it returns.
pub struct DeferredSingleton<T, F = fn() -> T> {
    cell: OnceLock<Arc<T>>,
    factory: F,
}

impl<T, F> DeferredSingleton<T, F> {
    pub const fn new(factory: F) -> Self {
        DeferredSingleton {
            cell: OnceLock::new(),
            factory,
        }
    }

    /// Returns the instance if it has been built.
    pub fn get(&self) -> Option<Arc<T>> {
        self.cell.get().cloned()
    }
}

impl<T, F> DeferredSingleton<T, F>
where
    F: Fn() -> T,
{
    /// Returns the shared instance, building it on first use.
    pub fn instance(&self) -> Arc<T> {
        Arc::clone(self.cell.get_or_init(|| {
            debug!(
                type_name = std::any::type_name::<T>(),
                "deferred singleton constructed"
            );
            Arc::new((self.factory)())
        }))
    }
}

impl<T, F> fmt::Debug for DeferredSingleton<T, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeferredSingleton")
            .field("type_name", &std::any::type_name::<T>())
            .field("constructed", &self.cell.get().is_some())
            .finish_non_exhaustive()
    }
}

impl<T, F> Singleton for DeferredSingleton<T, F>
where
    T: Send + Sync + 'static,
    F: Fn() -> T,
{
    type Instance = T;

    fn get_instance(&self) -> Result<Arc<T>, SingletonError> {
        Ok(self.instance())
    }

    fn is_constructed(&self) -> bool {
        self.cell.get().is_some()
    }
}
