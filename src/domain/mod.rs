//! Domain layer - pure logic with no I/O.
//!
//! This layer contains the core concepts and invariants of log dispatch:
//! - Severity levels and structured entries
//! - Throttling key computation
//! - Throttling rules and their decision table
//! - Template rendering
//!
//! All types in this layer are pure and easily testable.

pub mod entry;
pub mod level;
pub mod rule;
pub mod template;
pub mod throttling_key;
