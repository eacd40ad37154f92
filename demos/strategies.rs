//! Strategy comparison example for lazy-singleton.
//!
//! Demonstrates:
//! - Lazy, eager, and deferred singletons behind the `Singleton` trait
//! - Retry vs. fail-permanently after a failed construction
//! - Deserialization resolving to the shared instance
//!
//! Run with: `cargo run --example strategies`

use lazy_singleton::{
    BoxError, DeferredSingleton, EagerSingleton, FailurePolicy, LazySingletonRegistry, Singleton,
};
use serde::de::DeserializeSeed;
use std::sync::atomic::{AtomicUsize, Ordering};

fn describe(label: &str, source: &impl Singleton<Instance = String>) {
    let before = source.is_constructed();
    let value = source.get_instance().unwrap();
    println!("   {:<9} constructed before: {:<5} value: {}", label, before, value);
}

fn main() {
    println!("=== lazy-singleton: Strategies ===\n");

    // -------------------------------------------------------------------------
    // 1. Three strategies, one access trait
    // -------------------------------------------------------------------------
    println!("1. Strategies...");

    let lazy = LazySingletonRegistry::new(|| Ok::<_, BoxError>("lazy".to_string()));
    let eager = EagerSingleton::new("eager".to_string());
    let deferred = DeferredSingleton::new(|| "deferred".to_string());

    describe("lazy", &lazy);
    describe("eager", &eager);
    describe("deferred", &deferred);

    // -------------------------------------------------------------------------
    // 2. Failure policies
    // -------------------------------------------------------------------------
    println!("\n2. Failure policies...");

    let calls = AtomicUsize::new(0);
    let flaky = || {
        if calls.fetch_add(1, Ordering::SeqCst) % 2 == 0 {
            Err::<u32, BoxError>("transient".into())
        } else {
            Ok(1)
        }
    };

    let retrying = LazySingletonRegistry::new(&flaky);
    println!("   retry, call 1: {:?}", retrying.get_instance().map(|v| *v));
    println!("   retry, call 2: {:?}", retrying.get_instance().map(|v| *v));

    let strict = LazySingletonRegistry::with_policy(&flaky, FailurePolicy::FailPermanently);
    println!("   strict, call 1: {:?}", strict.get_instance().map(|v| *v));
    println!("   strict, call 2: {:?}", strict.get_instance().map(|v| *v));

    // -------------------------------------------------------------------------
    // 3. Deserialization resolves to the shared instance
    // -------------------------------------------------------------------------
    println!("\n3. Deserialization...");

    let shared = lazy.get_instance().unwrap();
    let mut de = serde_json::Deserializer::from_str(r#""a forged copy""#);
    let restored = (&lazy).deserialize(&mut de).unwrap();
    println!("   restored value: {}", restored);
    println!("   same instance?  {}", std::sync::Arc::ptr_eq(&shared, &restored));

    println!("\n=== Done ===");
}
