//! Domain layer - pure business logic with no external dependencies.
//!
//! This layer contains the core concepts of the throttling engine:
//! - Throttling policies and their counters
//! - Work-item identities
//! - Per-entry call statistics
//!
//! All types in this layer are pure and easily testable.

pub mod policy;
pub mod stats;
pub mod work_item;
