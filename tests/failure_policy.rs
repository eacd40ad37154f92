//! Integration tests for construction failures.
//!
//! `FailurePolicy::Retry` lets exactly one of the callers blocked behind a failed
//! attempt run the factory again; the others get that retry's outcome.
//! `FailurePolicy::FailPermanently` hands every later caller the recorded failure.

use lazy_singleton::{BoxError, FailurePolicy, LazySingletonRegistry, SingletonError};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::{Duration, Instant};

fn first_attempt_fails(calls: &AtomicUsize) -> Result<String, BoxError> {
    let call = calls.fetch_add(1, Ordering::SeqCst);
    thread::sleep(Duration::from_millis(20));
    if call == 0 {
        Err("resource unavailable".into())
    } else {
        Ok(format!("built on call {}", call + 1))
    }
}

#[test]
fn test_retry_after_single_failure() {
    let calls = AtomicUsize::new(0);
    let registry = LazySingletonRegistry::new(|| first_attempt_fails(&calls));

    let err = registry.get_instance().unwrap_err();
    assert!(matches!(err, SingletonError::Construction { attempt: 1, .. }));
    assert!(registry.get().is_none());

    let value = registry.get_instance().unwrap();
    assert_eq!(&*value, "built on call 2");
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[test]
fn test_waiters_retry_exactly_once() {
    let calls = AtomicUsize::new(0);
    let registry = LazySingletonRegistry::new(|| first_attempt_fails(&calls));
    let barrier = Barrier::new(8);

    let results: Vec<Result<Arc<String>, SingletonError>> = thread::scope(|s| {
        let handles: Vec<_> = (0..8)
            .map(|_| {
                s.spawn(|| {
                    barrier.wait();
                    registry.get_instance()
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    let errors = results.iter().filter(|r| r.is_err()).count();
    let successes: Vec<&Arc<String>> = results.iter().filter_map(|r| r.as_ref().ok()).collect();

    assert_eq!(errors, 1);
    assert_eq!(successes.len(), 7);
    assert!(successes.iter().all(|s| Arc::ptr_eq(s, successes[0])));
    assert_eq!(registry.attempts(), 2);
}

#[test]
fn test_waiters_do_not_repeat_a_failing_factory() {
    let calls = AtomicUsize::new(0);
    let registry = LazySingletonRegistry::new(|| {
        calls.fetch_add(1, Ordering::SeqCst);
        thread::sleep(Duration::from_millis(50));
        Err::<String, BoxError>("upstream down".into())
    });
    let barrier = Barrier::new(10);

    let started = Instant::now();
    let results: Vec<Result<Arc<String>, SingletonError>> = thread::scope(|s| {
        let handles: Vec<_> = (0..10)
            .map(|_| {
                s.spawn(|| {
                    barrier.wait();
                    registry.get_instance()
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });
    let elapsed = started.elapsed();

    let construction = results
        .iter()
        .filter(|r| matches!(r, Err(SingletonError::Construction { .. })))
        .count();
    let waited = results
        .iter()
        .filter(|r| {
            matches!(r, Err(SingletonError::WaitedOnFailure { attempt: 2, reason, .. })
                if reason == "upstream down")
        })
        .count();

    assert_eq!(registry.attempts(), 2);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert_eq!(construction, 2);
    assert_eq!(waited, 8);
    // Two factory runs, not ten.
    assert!(elapsed < Duration::from_millis(400), "took {:?}", elapsed);

    // A fresh call after the storm runs the factory again.
    assert!(matches!(
        registry.get_instance(),
        Err(SingletonError::Construction { attempt: 3, .. })
    ));
}

#[test]
fn test_fail_permanently_reaches_waiters() {
    let calls = AtomicUsize::new(0);
    let registry = LazySingletonRegistry::with_policy(
        || first_attempt_fails(&calls),
        FailurePolicy::FailPermanently,
    );
    let barrier = Barrier::new(8);

    let results: Vec<Result<Arc<String>, SingletonError>> = thread::scope(|s| {
        let handles: Vec<_> = (0..8)
            .map(|_| {
                s.spawn(|| {
                    barrier.wait();
                    registry.get_instance()
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    let construction = results
        .iter()
        .filter(|r| matches!(r, Err(SingletonError::Construction { .. })))
        .count();
    let poisoned = results
        .iter()
        .filter(|r| {
            matches!(r, Err(SingletonError::Poisoned { reason, .. })
                if reason == "resource unavailable")
        })
        .count();

    assert_eq!(construction, 1);
    assert_eq!(poisoned, 7);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(registry.policy(), FailurePolicy::FailPermanently);
}

#[test]
fn test_error_keeps_factory_source() {
    use std::error::Error as _;

    let registry = LazySingletonRegistry::new(|| {
        Err::<u8, BoxError>(Box::new(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "config file missing",
        )))
    });

    let err = registry.get_instance().unwrap_err();
    let source = err.source().unwrap();
    assert_eq!(source.to_string(), "config file missing");
    assert!(source.downcast_ref::<std::io::Error>().is_some());
    assert_eq!(err.type_name(), "u8");
}
