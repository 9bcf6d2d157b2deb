//! Application layer - orchestration of domain logic.
//!
//! This layer coordinates the domain logic and manages the runtime behavior:
//! - Policy registry (storage of per-work-item state)
//! - Throttler (decision making and action dispatch)
//! - Metrics (process-level counters)
//!
//! ## Ports
//!
//! The application layer defines ports (traits) that infrastructure
//! adapters must implement. This keeps the application layer independent
//! from infrastructure details.

pub mod limiter;
pub mod metrics;
pub mod ports;
pub mod registry;
