//! Side-by-side comparison of the four throttling policies.
//!
//! Each policy sees the same stream of 40 calls, spread over roughly two
//! seconds, and prints which calls it let through.

use call_throttle::{Policy, ThrottleRegistry, WorkItemId};
use std::thread;
use std::time::Duration;
use tracing::info;

fn main() {
    tracing_subscriber::fmt().with_target(false).init();

    println!("=== Policy Comparison Example ===\n");

    let registry = ThrottleRegistry::builder()
        .with_seed(7)
        .build()
        .expect("default shard configuration is valid");

    let policies = [
        ("modulo(10)", Policy::modulo(10).expect("modulus is non-zero")),
        (
            "count_per_window(3, 500ms)",
            Policy::count_per_window(3, Duration::from_millis(500))
                .expect("window parameters are non-zero"),
        ),
        (
            "probabilistic(8)",
            Policy::probabilistic(8).expect("sides is non-zero"),
        ),
        ("quota(4)", Policy::quota(4)),
    ];

    let mut fired: Vec<Vec<usize>> = vec![Vec::new(); policies.len()];

    for call in 1..=40 {
        for (idx, (name, policy)) in policies.iter().enumerate() {
            let slot = &mut fired[idx];
            registry.throttle(WorkItemId::named(name), policy.clone(), || {
                info!(policy = name, call, "fired");
                slot.push(call);
            });
        }
        thread::sleep(Duration::from_millis(50));
    }

    println!();
    for ((name, _), calls) in policies.iter().zip(&fired) {
        println!("{:<28} fired {:>2}x: {:?}", name, calls.len(), calls);
    }

    println!("\n=== Example Complete ===");
    println!("Notice: only the quota never recovers; the window resets every 500ms.");
}
