//! Double-checked lazy construction of a single shared instance.
//!
//! A [`LazySingletonRegistry`] owns one slot. The slot is read without locking;
//! only callers that find it empty take the construction lock, re-check it,
//! and run the factory. The finished instance is published with a `Release`
//! store that pairs with the fast path's `Acquire` load, so a reader that sees
//! the pointer also sees every write the factory made.
//!
//! # Examples
//!
//! ```
//! use lazy_singleton::LazySingletonRegistry;
//! use std::sync::Arc;
//!
//! struct Settings {
//!     endpoint: String,
//! }
//!
//! static SETTINGS: LazySingletonRegistry<Settings> = LazySingletonRegistry::new(|| {
//!     Ok(Settings {
//!         endpoint: "https://api.example.com".to_string(),
//!     })
//! });
//!
//! let a = SETTINGS.get_instance().unwrap();
//! let b = SETTINGS.get_instance().unwrap();
//! assert!(Arc::ptr_eq(&a, &b));
//! assert_eq!(a.endpoint, "https://api.example.com");
//! ```

use std::{
    cell::RefCell,
    fmt,
    marker::PhantomData,
    ptr,
    sync::{
        atomic::{AtomicPtr, AtomicU32, Ordering},
        Arc, Mutex, MutexGuard, PoisonError,
    },
};

use tracing::{debug, error, trace, warn};

use crate::singleton_event::TraceSlot;
use crate::{BoxError, Singleton, SingletonError, SingletonEvent};

/// Factory type used when a registry is declared without naming one,
/// which is what `static` items need.
pub type Factory<T> = fn() -> Result<T, BoxError>;

/// What a registry does after its factory fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Leave the slot empty and run the factory again on a later call.
    /// Of the callers that were already waiting when an attempt failed, exactly
    /// one retries; the others receive [`SingletonError::WaitedOnFailure`].
    #[default]
    Retry,
    /// Record the first failure; every later caller gets [`SingletonError::Poisoned`].
    FailPermanently,
}

// -------------------------------------------------------------------------------------------------
// Re-entrancy tracking
// -------------------------------------------------------------------------------------------------

thread_local! {
    /// Addresses of the registries this thread is currently constructing or installing into.
    static CONSTRUCTING: RefCell<Vec<usize>> = const { RefCell::new(Vec::new()) };
}

/// Marks a registry as "being built by this thread" until dropped.
struct ConstructionScope {
    key: usize,
}

impl ConstructionScope {
    fn enter(key: usize, type_name: &'static str) -> Result<Self, SingletonError> {
        CONSTRUCTING.with_borrow_mut(|active| {
            if active.contains(&key) {
                return Err(SingletonError::Reentrant { type_name });
            }
            active.push(key);
            Ok(ConstructionScope { key })
        })
    }
}

impl Drop for ConstructionScope {
    fn drop(&mut self) {
        CONSTRUCTING.with_borrow_mut(|active| {
            if let Some(pos) = active.iter().rposition(|k| *k == self.key) {
                active.remove(pos);
            }
        });
    }
}

// -------------------------------------------------------------------------------------------------
// Registry
// -------------------------------------------------------------------------------------------------

#[derive(Debug)]
struct FailedAttempt {
    attempt: u32,
    reason: String,
}

#[derive(Debug)]
struct SlotState {
    attempts: u32,
    /// Set under `FailurePolicy::FailPermanently` only.
    failure: Option<String>,
    last_failure: Option<FailedAttempt>,
}

/// Outcome of a slow-path operation plus the event to emit once the
/// construction scope has been left.
type Traced<T> = (Result<Arc<T>, SingletonError>, Option<SingletonEvent>);

/// Holds at most one lazily constructed instance of `T`.
///
/// Exactly one factory run succeeds no matter how many threads race on first
/// access, and every caller receives the same `Arc<T>`. Once published the
/// instance is never replaced; it is released only when the registry itself is
/// dropped, which for a `static` registry means never.
pub struct LazySingletonRegistry<T, F = Factory<T>> {
    /// Raw pointer from `Arc::into_raw`, null until published. The slot owns one strong count.
    slot: AtomicPtr<T>,
    state: Mutex<SlotState>,
    /// Failed factory runs so far. Written under `state`, read before locking.
    failures: AtomicU32,
    factory: F,
    policy: FailurePolicy,
    trace: TraceSlot,
    _owns: PhantomData<Arc<T>>,
}

impl<T, F> LazySingletonRegistry<T, F> {
    /// Creates an empty registry that retries after failed construction.
    pub const fn new(factory: F) -> Self {
        Self::with_policy(factory, FailurePolicy::Retry)
    }

    /// Creates an empty registry with an explicit failure policy.
    pub const fn with_policy(factory: F, policy: FailurePolicy) -> Self {
        LazySingletonRegistry {
            slot: AtomicPtr::new(ptr::null_mut()),
            state: Mutex::new(SlotState {
                attempts: 0,
                failure: None,
                last_failure: None,
            }),
            failures: AtomicU32::new(0),
            factory,
            policy,
            trace: TraceSlot::new(),
            _owns: PhantomData,
        }
    }

    pub fn policy(&self) -> FailurePolicy {
        self.policy
    }

    /// Returns the instance if it has been published. Never constructs and never locks.
    pub fn get(&self) -> Option<Arc<T>> {
        let ptr = self.slot.load(Ordering::Acquire);
        if ptr.is_null() {
            None
        } else {
            // SAFETY: a non-null slot value was published by `publish` and stays valid for `&self`.
            Some(unsafe { clone_published(ptr) })
        }
    }

    /// Whether the instance has been published.
    pub fn is_constructed(&self) -> bool {
        !self.slot.load(Ordering::Acquire).is_null()
    }

    /// Number of times the factory has been invoked, successful or not.
    pub fn attempts(&self) -> u32 {
        self.lock_state().attempts
    }

    /// Set a tracing callback for slow-path and bypass events.
    pub fn set_trace_callback(&self, callback: impl Fn(&SingletonEvent) + Send + Sync + 'static) {
        self.trace.set(callback);
    }

    /// Clear the tracing callback.
    pub fn clear_trace_callback(&self) {
        self.trace.clear();
    }

    /// Publishes an externally built value as the instance.
    ///
    /// This is a guarded entry point: once an instance exists every call fails
    /// with [`SingletonError::InvariantViolation`]. A failure recorded under
    /// [`FailurePolicy::FailPermanently`] is cleared by a successful install.
    pub fn install(&self, value: T) -> Result<Arc<T>, SingletonError> {
        let (result, event) = self.install_scoped(value);
        self.emit(event);
        result
    }

    fn install_scoped(&self, value: T) -> Traced<T> {
        let _scope = match self.enter_construction() {
            Ok(scope) => scope,
            Err(err) => return (Err(err), None),
        };
        let mut state = self.lock_state();
        if self.is_constructed() {
            drop(state);
            return self.reject_bypass();
        }

        let instance = self.publish(value);
        state.failure = None;
        state.last_failure = None;
        drop(state);

        debug!(type_name = Self::type_name(), "singleton installed");
        (
            Ok(instance),
            Some(SingletonEvent::Installed {
                type_name: Self::type_name(),
            }),
        )
    }

    fn type_name() -> &'static str {
        std::any::type_name::<T>()
    }

    fn lock_state(&self) -> MutexGuard<'_, SlotState> {
        // A factory panic poisons the lock after `attempts` was bumped and before anything
        // was published, which is a consistent state to continue from.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn enter_construction(&self) -> Result<ConstructionScope, SingletonError> {
        ConstructionScope::enter(self as *const Self as usize, Self::type_name())
    }

    /// Must be called with the state lock held and the slot empty.
    fn publish(&self, value: T) -> Arc<T> {
        let instance = Arc::new(value);
        let raw = Arc::into_raw(Arc::clone(&instance)).cast_mut();
        self.slot.store(raw, Ordering::Release);
        instance
    }

    fn reject_bypass(&self) -> Traced<T> {
        error!(
            type_name = Self::type_name(),
            "refused to create a second singleton instance"
        );
        (
            Err(SingletonError::InvariantViolation {
                type_name: Self::type_name(),
            }),
            Some(SingletonEvent::BypassRejected {
                type_name: Self::type_name(),
            }),
        )
    }

    /// Runs the trace callback. Callers must have left their construction scope
    /// and released the state lock, so the callback may use the registry freely.
    fn emit(&self, event: Option<SingletonEvent>) {
        if let Some(event) = event {
            self.trace.emit(&event);
        }
    }
}

impl<T, F> LazySingletonRegistry<T, F>
where
    F: Fn() -> Result<T, BoxError>,
{
    /// Returns the shared instance, constructing it on first use.
    ///
    /// # Errors
    ///
    /// - [`SingletonError::Construction`] if the factory fails
    /// - [`SingletonError::WaitedOnFailure`] if this call waited through a failed attempt
    ///   and another waiter already retried without success
    /// - [`SingletonError::Poisoned`] if an earlier attempt failed under
    ///   [`FailurePolicy::FailPermanently`]
    /// - [`SingletonError::Reentrant`] if called from inside this registry's own factory
    ///
    /// # Panics
    ///
    /// A panicking factory propagates to the caller that ran it. The attempt
    /// is counted and nothing is published, so the next caller retries.
    pub fn get_instance(&self) -> Result<Arc<T>, SingletonError> {
        if let Some(instance) = self.get() {
            return Ok(instance);
        }
        self.get_instance_slow()
    }

    #[cold]
    fn get_instance_slow(&self) -> Result<Arc<T>, SingletonError> {
        let (result, event) = self.get_instance_scoped();
        self.emit(event);
        result
    }

    fn get_instance_scoped(&self) -> Traced<T> {
        // Failures recorded after this load happened while we were waiting.
        let failures_seen = self.failures.load(Ordering::Acquire);

        let _scope = match self.enter_construction() {
            Ok(scope) => scope,
            Err(err) => return (Err(err), None),
        };
        let state = self.lock_state();

        // Another thread may have finished while we waited for the lock.
        if let Some(instance) = self.get() {
            drop(state);
            trace!(
                type_name = Self::type_name(),
                "instance published while waiting for the construction lock"
            );
            return (
                Ok(instance),
                Some(SingletonEvent::Contended {
                    type_name: Self::type_name(),
                }),
            );
        }

        // One waiter retries on behalf of everyone blocked behind a failed attempt.
        // Once that retry has failed too, the rest report it instead of running the
        // factory again.
        let failed_meanwhile = self
            .failures
            .load(Ordering::Relaxed)
            .wrapping_sub(failures_seen);
        if failed_meanwhile > 1 {
            if let Some(last) = &state.last_failure {
                return (
                    Err(SingletonError::WaitedOnFailure {
                        type_name: Self::type_name(),
                        attempt: last.attempt,
                        reason: last.reason.clone(),
                    }),
                    None,
                );
            }
        }

        self.construct_locked(state)
    }

    /// Runs the factory directly, bypassing the fast path.
    ///
    /// Guarded like [`install`](Self::install): fails with
    /// [`SingletonError::InvariantViolation`] once an instance exists.
    pub fn force_construct(&self) -> Result<Arc<T>, SingletonError> {
        let (result, event) = self.force_construct_scoped();
        self.emit(event);
        result
    }

    fn force_construct_scoped(&self) -> Traced<T> {
        let _scope = match self.enter_construction() {
            Ok(scope) => scope,
            Err(err) => return (Err(err), None),
        };
        let state = self.lock_state();
        if self.is_constructed() {
            drop(state);
            return self.reject_bypass();
        }
        self.construct_locked(state)
    }

    /// Resolves a decoded copy of `T` to the shared instance.
    ///
    /// The decoded value is dropped; the caller receives the shared instance,
    /// which is constructed through the factory if it does not exist yet.
    pub fn resolve(&self, decoded: T) -> Result<Arc<T>, SingletonError> {
        drop(decoded);
        let instance = self.get_instance()?;
        debug!(
            type_name = Self::type_name(),
            "decoded copy resolved to the shared instance"
        );
        self.trace.emit(&SingletonEvent::Resolved {
            type_name: Self::type_name(),
        });
        Ok(instance)
    }

    fn construct_locked(&self, mut state: MutexGuard<'_, SlotState>) -> Traced<T> {
        let type_name = Self::type_name();

        if let Some(reason) = &state.failure {
            let err = SingletonError::Poisoned {
                type_name,
                reason: reason.clone(),
            };
            return (Err(err), None);
        }

        state.attempts = state.attempts.saturating_add(1);
        let attempt = state.attempts;

        match (self.factory)() {
            Ok(value) => {
                let instance = self.publish(value);
                state.last_failure = None;
                drop(state);

                debug!(type_name, attempt, "singleton constructed");
                (
                    Ok(instance),
                    Some(SingletonEvent::Constructed { type_name, attempt }),
                )
            }
            Err(source) => {
                let reason = source.to_string();
                if self.policy == FailurePolicy::FailPermanently {
                    state.failure = Some(reason.clone());
                }
                state.last_failure = Some(FailedAttempt { attempt, reason });
                self.failures.fetch_add(1, Ordering::Release);
                drop(state);

                warn!(type_name, attempt, error = %source, "singleton construction failed");
                (
                    Err(SingletonError::Construction {
                        type_name,
                        attempt,
                        source,
                    }),
                    Some(SingletonEvent::ConstructionFailed { type_name, attempt }),
                )
            }
        }
    }
}

/// Clones the `Arc` whose raw pointer is stored in a registry slot.
///
/// # Safety
///
/// `ptr` must be a non-null value loaded from a live registry's slot.
unsafe fn clone_published<T>(ptr: *mut T) -> Arc<T> {
    // SAFETY: the slot holds one strong count that is only released in `Drop`,
    // which cannot run while the caller borrows the registry.
    unsafe {
        Arc::increment_strong_count(ptr);
        Arc::from_raw(ptr)
    }
}

impl<T, F> Drop for LazySingletonRegistry<T, F> {
    fn drop(&mut self) {
        let ptr = *self.slot.get_mut();
        if !ptr.is_null() {
            // SAFETY: `ptr` came from `Arc::into_raw` in `publish` and this is the only release
            // of the slot's strong count.
            drop(unsafe { Arc::from_raw(ptr) });
        }
    }
}

impl<T, F> fmt::Debug for LazySingletonRegistry<T, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LazySingletonRegistry")
            .field("type_name", &Self::type_name())
            .field("constructed", &self.is_constructed())
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl<T, F> Singleton for LazySingletonRegistry<T, F>
where
    T: Send + Sync + 'static,
    F: Fn() -> Result<T, BoxError>,
{
    type Instance = T;

    fn get_instance(&self) -> Result<Arc<T>, SingletonError> {
        LazySingletonRegistry::get_instance(self)
    }

    fn is_constructed(&self) -> bool {
        LazySingletonRegistry::is_constructed(self)
    }
}

// -------------------------------------------------------------------------------------------------
// Tests
// -------------------------------------------------------------------------------------------------
