use std::time::Duration;

use thiserror::Error;

/// Boxed error returned by singleton factories.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors surfaced by singleton access and construction.
#[derive(Debug, Error)]
pub enum SingletonError {
    /// The factory failed. Nothing was published; with [`FailurePolicy::Retry`]
    /// the next caller runs the factory again.
    ///
    /// [`FailurePolicy::Retry`]: crate::FailurePolicy::Retry
    #[error("failed to construct {type_name} (attempt {attempt})")]
    Construction {
        type_name: &'static str,
        attempt: u32,
        #[source]
        source: BoxError,
    },

    /// This call waited on the construction lock through a failed attempt,
    /// and the one retry made on behalf of such waiters failed as well.
    /// Carries that retry's attempt number and error message.
    #[error("construction of {type_name} failed while waiting (attempt {attempt}): {reason}")]
    WaitedOnFailure {
        type_name: &'static str,
        attempt: u32,
        reason: String,
    },

    /// An earlier attempt failed under [`FailurePolicy::FailPermanently`].
    ///
    /// [`FailurePolicy::FailPermanently`]: crate::FailurePolicy::FailPermanently
    #[error("construction of {type_name} failed permanently: {reason}")]
    Poisoned {
        type_name: &'static str,
        reason: String,
    },

    /// A bypass path tried to create a second instance.
    ///
    /// This is a programming error, not a recoverable condition.
    #[error("a second instance of {type_name} was requested after construction")]
    InvariantViolation { type_name: &'static str },

    /// The factory called back into its own registry on the same thread.
    #[error("re-entrant construction of {type_name}")]
    Reentrant { type_name: &'static str },
}

impl SingletonError {
    /// Type name of the singleton this error refers to.
    pub fn type_name(&self) -> &'static str {
        match self {
            SingletonError::Construction { type_name, .. }
            | SingletonError::WaitedOnFailure { type_name, .. }
            | SingletonError::Poisoned { type_name, .. }
            | SingletonError::InvariantViolation { type_name }
            | SingletonError::Reentrant { type_name } => type_name,
        }
    }
}

/// Returned (boxed) by [`construct_within`](crate::construct_within) when a
/// construction step does not finish in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("construction did not complete within {limit:?}")]
pub struct ConstructionTimeout {
    pub limit: Duration,
}
