//! Basic usage example for lazy-singleton.
//!
//! Demonstrates:
//! - Declaring a singleton with `define_singleton!`
//! - Lazy construction on first `get_instance()`
//! - Identity of every handle (`Arc::ptr_eq`)
//! - Guarded bypass paths refusing a second instance
//!
//! Run with: `cargo run --example basic_usage`

use lazy_singleton::{define_singleton, BoxError};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub name: String,
    pub version: u32,
    pub debug_mode: bool,
}

fn load_config() -> Result<AppConfig, BoxError> {
    println!("   (factory running)");
    Ok(AppConfig {
        name: "MyApp".to_string(),
        version: 1,
        debug_mode: true,
    })
}

define_singleton!(config: AppConfig = load_config);

fn main() {
    println!("=== lazy-singleton: Basic Usage ===\n");

    // -------------------------------------------------------------------------
    // 1. Nothing is built until first access
    // -------------------------------------------------------------------------
    println!("1. Before first access...");
    println!("   Constructed: {}", config::is_constructed());

    // -------------------------------------------------------------------------
    // 2. First access runs the factory
    // -------------------------------------------------------------------------
    println!("\n2. First get_instance()...");
    let first: Arc<AppConfig> = config::get_instance().unwrap();
    println!("   {:?}", first);

    // -------------------------------------------------------------------------
    // 3. Later accesses are lock-free reads of the same instance
    // -------------------------------------------------------------------------
    println!("\n3. Second get_instance()...");
    let second = config::get_instance().unwrap();
    println!("   Same instance? {}", Arc::ptr_eq(&first, &second));
    println!("   Factory attempts: {}", config::attempts());

    // -------------------------------------------------------------------------
    // 4. Bypass paths are refused
    // -------------------------------------------------------------------------
    println!("\n4. Trying to install a second instance...");
    match config::install(AppConfig {
        name: "Impostor".to_string(),
        version: 2,
        debug_mode: false,
    }) {
        Ok(_) => println!("   Unexpectedly installed!"),
        Err(e) => println!("   Refused: {}", e),
    }

    println!("\n=== Done ===");
}
