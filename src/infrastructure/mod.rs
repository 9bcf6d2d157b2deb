//! Infrastructure layer - external adapters and integrations.
//!
//! This layer provides adapters for:
//! - Clock abstraction (system time vs mock)
//! - Random sources (thread-local, seeded)
//! - Storage implementations (sharded maps)
//! - The public `ThrottleRegistry` service and its global instance

pub mod clock;
pub mod random;
pub mod storage;
pub mod throttle_registry;

/// Mock implementations for testing.
///
/// This module is only available when the `test-helpers` feature is enabled,
/// or during test builds. It provides controllable test doubles for clocks,
/// random rolls and captured log output.
///
/// To use these mocks in integration tests, add to your `Cargo.toml`:
/// ```toml
/// [dev-dependencies]
/// call-throttle = { version = "*", features = ["test-helpers"] }
/// ```
#[cfg(any(test, feature = "test-helpers"))]
pub mod mocks;
