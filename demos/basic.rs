//! Basic example demonstrating per-call-site throttling.
//!
//! A hot loop reports progress, but only every 25th iteration actually logs.
//! Run with `RUST_LOG=debug` to also see the registry's own diagnostics.

use call_throttle::{Policy, ThrottleRegistry, WorkItemId};
use tracing::info;
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    println!("=== Basic Throttling Example ===\n");

    let registry = ThrottleRegistry::new();
    let progress = WorkItemId::named("demo.progress");
    let every_25th = Policy::modulo(25).expect("modulus is non-zero");

    println!("Processing 100 items, logging progress for 1 in 25:");
    for item in 1..=100 {
        registry.throttle(progress, every_25th.clone(), || {
            info!(item, "processing");
        });
    }

    println!("\nWarning about a deprecated option at most twice:");
    for attempt in 1..=5 {
        call_throttle::global().throttle_here(Policy::quota(2), || {
            info!(attempt, "option `legacy_mode` is deprecated");
        });
    }

    let snapshot = registry.metrics().snapshot();
    println!("\n=== Example Complete ===");
    println!(
        "Progress reports: {} fired, {} suppressed (fire rate {:.0}%)",
        snapshot.calls_fired,
        snapshot.calls_suppressed,
        snapshot.fire_rate() * 100.0
    );
}
