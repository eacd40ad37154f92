//! Bounding a blocking construction step.

use std::{
    sync::mpsc::{self, RecvTimeoutError},
    thread,
    time::Duration,
};

use tracing::warn;

use crate::{BoxError, ConstructionTimeout};

/// Runs `step` on a worker thread and waits at most `limit` for it.
///
/// Meant to be called from inside a singleton factory whose work can block
/// indefinitely, e.g. on I/O. On expiry the factory sees a boxed
/// [`ConstructionTimeout`]; the worker keeps running detached and its late
/// result is dropped.
///
/// # Examples
///
/// ```
/// use lazy_singleton::{construct_within, BoxError, LazySingletonRegistry};
/// use std::time::Duration;
///
/// static REMOTE: LazySingletonRegistry<String> = LazySingletonRegistry::new(|| {
///     construct_within(Duration::from_secs(1), || Ok("connected".to_string()))
/// });
///
/// assert_eq!(&*REMOTE.get_instance().unwrap(), "connected");
/// ```
pub fn construct_within<T, F>(limit: Duration, step: F) -> Result<T, BoxError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, BoxError> + Send + 'static,
{
    let (tx, rx) = mpsc::sync_channel(1);
    thread::Builder::new()
        .name("singleton-construct".into())
        .spawn(move || {
            // The receiver is gone once the caller gave up.
            let _ = tx.send(step());
        })?;

    match rx.recv_timeout(limit) {
        Ok(result) => result,
        Err(RecvTimeoutError::Timeout) => {
            warn!(?limit, "construction step timed out");
            Err(ConstructionTimeout { limit }.into())
        }
        Err(RecvTimeoutError::Disconnected) => Err("construction step panicked".into()),
    }
}
