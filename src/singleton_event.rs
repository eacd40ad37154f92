use std::sync::{Arc, Mutex, PoisonError};

/// Events emitted by a singleton registry on its slow and bypass paths.
///
/// These events are passed to the tracing callback set via `set_trace_callback`.
/// Reads served by the lock-free fast path emit nothing.
///
/// # Examples
///
/// ```rust
/// use lazy_singleton::SingletonEvent;
///
/// let event = SingletonEvent::Constructed { type_name: "i32", attempt: 1 };
/// assert_eq!(event.to_string(), "constructed { type_name: i32, attempt: 1 }");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SingletonEvent {
    /// The factory succeeded and the instance was published.
    Constructed {
        type_name: &'static str,
        /// 1-based factory invocation that succeeded
        attempt: u32,
    },

    /// The factory failed or panicked.
    ConstructionFailed {
        type_name: &'static str,
        attempt: u32,
    },

    /// A slow-path caller found the instance already published once it held the lock.
    Contended { type_name: &'static str },

    /// An externally built value was published through `install`.
    Installed { type_name: &'static str },

    /// A decoded copy was discarded in favour of the shared instance.
    Resolved { type_name: &'static str },

    /// A bypass path tried to create a second instance and was refused.
    BypassRejected { type_name: &'static str },
}

impl std::fmt::Display for SingletonEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SingletonEvent::Constructed { type_name, attempt } => {
                write!(
                    f,
                    "constructed {{ type_name: {}, attempt: {} }}",
                    type_name, attempt
                )
            }
            SingletonEvent::ConstructionFailed { type_name, attempt } => {
                write!(
                    f,
                    "construction failed {{ type_name: {}, attempt: {} }}",
                    type_name, attempt
                )
            }
            SingletonEvent::Contended { type_name } => {
                write!(f, "contended {{ type_name: {} }}", type_name)
            }
            SingletonEvent::Installed { type_name } => {
                write!(f, "installed {{ type_name: {} }}", type_name)
            }
            SingletonEvent::Resolved { type_name } => {
                write!(f, "resolved {{ type_name: {} }}", type_name)
            }
            SingletonEvent::BypassRejected { type_name } => {
                write!(f, "bypass rejected {{ type_name: {} }}", type_name)
            }
        }
    }
}

/// Shared form of a trace callback.
pub type TraceCallback = Arc<dyn Fn(&SingletonEvent) + Send + Sync>;

/// Per-registry storage for the optional trace callback.
///
/// The callback is cloned out of the lock before it runs. Registries emit only
/// after releasing their construction lock and leaving their re-entrancy scope,
/// so a callback may call any method of the registry it observes, including
/// retrying construction after a failure.
pub(crate) struct TraceSlot {
    callback: Mutex<Option<TraceCallback>>,
}

impl TraceSlot {
    pub(crate) const fn new() -> Self {
        TraceSlot {
            callback: Mutex::new(None),
        }
    }

    pub(crate) fn set(&self, callback: impl Fn(&SingletonEvent) + Send + Sync + 'static) {
        let mut guard = self.callback.lock().unwrap_or_else(PoisonError::into_inner);
        *guard = Some(Arc::new(callback));
    }

    pub(crate) fn clear(&self) {
        let mut guard = self.callback.lock().unwrap_or_else(PoisonError::into_inner);
        *guard = None;
    }

    pub(crate) fn emit(&self, event: &SingletonEvent) {
        let callback = self
            .callback
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        if let Some(callback) = callback {
            callback(event);
        }
    }
}
