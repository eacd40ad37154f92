//! Integration tests for concurrent first access.
//!
//! Every test races many threads on an empty registry and checks that a single
//! construction happened and that every caller got the same fully built instance.

use lazy_singleton::{BoxError, LazySingletonRegistry};
use serial_test::serial;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

static CONSTRUCTIONS: AtomicUsize = AtomicUsize::new(0);

#[derive(Debug)]
struct Connection {
    id: usize,
}

static CONNECTION: LazySingletonRegistry<Connection> = LazySingletonRegistry::new(|| {
    let id = CONSTRUCTIONS.fetch_add(1, Ordering::SeqCst) + 1;
    thread::sleep(Duration::from_millis(10));
    Ok(Connection { id })
});

#[test]
#[serial]
fn test_hundred_threads_one_construction() {
    let barrier = Arc::new(Barrier::new(100));

    let handles: Vec<_> = (0..100)
        .map(|_| {
            let barrier = barrier.clone();
            thread::spawn(move || {
                barrier.wait();
                CONNECTION.get_instance().unwrap()
            })
        })
        .collect();

    let results: Vec<Arc<Connection>> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    assert_eq!(CONSTRUCTIONS.load(Ordering::SeqCst), 1);
    assert_eq!(results.len(), 100);
    assert!(results.iter().all(|r| Arc::ptr_eq(r, &results[0])));
    assert_eq!(results[0].id, 1);
    assert_eq!(CONNECTION.attempts(), 1);
}

#[test]
#[serial]
fn test_idempotent_from_threads_that_never_constructed() {
    let first = CONNECTION.get_instance().unwrap();

    let handles: Vec<_> = (0..8)
        .map(|_| {
            thread::spawn(|| {
                (0..100)
                    .map(|_| CONNECTION.get_instance().unwrap())
                    .collect::<Vec<_>>()
            })
        })
        .collect();

    for handle in handles {
        for instance in handle.join().unwrap() {
            assert!(Arc::ptr_eq(&instance, &first));
        }
    }
    assert_eq!(CONSTRUCTIONS.load(Ordering::SeqCst), 1);
}

/// Fields are tied together so a torn read would break `is_consistent`.
#[derive(Debug)]
struct Ledger {
    seed: u64,
    doubled: u64,
    sum: u64,
    entries: Vec<u64>,
}

impl Ledger {
    fn build(seed: u64) -> Ledger {
        let entries: Vec<u64> = (0..64).map(|i| seed + i).collect();
        Ledger {
            seed,
            doubled: seed * 2,
            sum: entries.iter().sum(),
            entries,
        }
    }

    fn is_consistent(&self) -> bool {
        self.doubled == self.seed * 2
            && self.entries.len() == 64
            && self.sum == self.entries.iter().sum::<u64>()
    }
}

#[test]
fn test_no_partially_constructed_instance_is_observed() {
    for round in 0..200u64 {
        let builds = AtomicUsize::new(0);
        let registry: LazySingletonRegistry<Ledger, _> = LazySingletonRegistry::new(|| {
            builds.fetch_add(1, Ordering::SeqCst);
            Ok::<_, BoxError>(Ledger::build(round + 1))
        });
        let barrier = Barrier::new(8);

        thread::scope(|s| {
            for _ in 0..8 {
                s.spawn(|| {
                    barrier.wait();
                    for _ in 0..50 {
                        if let Some(ledger) = registry.get() {
                            assert!(ledger.is_consistent());
                        }
                        let ledger = registry.get_instance().unwrap();
                        assert!(ledger.is_consistent());
                        assert_eq!(ledger.seed, round + 1);
                    }
                });
            }
        });

        assert_eq!(builds.load(Ordering::SeqCst), 1);
    }
}

#[test]
fn test_registries_are_independent() {
    let a = LazySingletonRegistry::new(|| Ok::<_, BoxError>(1i32));
    let b = LazySingletonRegistry::new(|| Ok::<_, BoxError>(2i32));

    assert_eq!(*a.get_instance().unwrap(), 1);
    assert!(!b.is_constructed());
    assert_eq!(*b.get_instance().unwrap(), 2);
}
