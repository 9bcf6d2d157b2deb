//! Mock implementations for testing.
//!
//! This module provides test doubles for infrastructure adapters,
//! enabling deterministic testing of throttling decisions.

pub mod clock;
pub mod layer;
pub mod random;

pub use clock::MockClock;
pub use layer::{CapturedEvent, MockCaptureLayer};
pub use random::ScriptedRandom;
