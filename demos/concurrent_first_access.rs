//! Concurrent first access example for lazy-singleton.
//!
//! Demonstrates:
//! - 100 threads racing on an empty registry
//! - A factory that sleeps, widening the race window
//! - Exactly one construction, one shared instance
//!
//! Run with: `cargo run --example concurrent_first_access`

use lazy_singleton::LazySingletonRegistry;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

static CONSTRUCTIONS: AtomicUsize = AtomicUsize::new(0);

#[derive(Debug)]
struct ConnectionPool {
    size: usize,
}

static POOL: LazySingletonRegistry<ConnectionPool> = LazySingletonRegistry::new(|| {
    CONSTRUCTIONS.fetch_add(1, Ordering::SeqCst);
    thread::sleep(Duration::from_millis(10));
    Ok(ConnectionPool { size: 8 })
});

fn main() {
    println!("=== lazy-singleton: Concurrent First Access ===\n");

    let barrier = Arc::new(Barrier::new(100));
    let handles: Vec<_> = (0..100)
        .map(|_| {
            let barrier = barrier.clone();
            thread::spawn(move || {
                barrier.wait();
                POOL.get_instance().unwrap()
            })
        })
        .collect();

    let pools: Vec<Arc<ConnectionPool>> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    println!("   Threads:        {}", pools.len());
    println!("   Constructions:  {}", CONSTRUCTIONS.load(Ordering::SeqCst));
    println!(
        "   All identical:  {}",
        pools.iter().all(|p| Arc::ptr_eq(p, &pools[0]))
    );
    println!("   Pool size:      {}", pools[0].size);

    println!("\n=== Done ===");
}
