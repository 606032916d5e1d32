//! Throttling key computation.
//!
//! A throttling key correlates "duplicate-looking" entries. It is derived from:
//! - Level
//! - Message
//! - Exception type and details
//! - Machine name and environment
//!
//! Entries with the same key share one throttling tracker.

use crate::domain::entry::LogEntry;
use crate::domain::level::Level;
use ahash::RandomState;
use std::fmt;
use std::hash::{BuildHasher, Hash, Hasher};

// Fixed seeds keep keys stable across processes and runs.
const SEEDS: [u64; 4] = [
    0x243f_6a88_85a3_08d3,
    0x1319_8a2e_0370_7344,
    0xa409_3822_299f_31d0,
    0x082e_fa98_ec4e_6c89,
];

/// Deterministic integer identifying a class of log entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ThrottlingKey(u64);

impl ThrottlingKey {
    /// Compute a key from its components.
    ///
    /// Each string is hashed with its length terminator, so moving text between
    /// adjacent fields produces a different key.
    pub fn new(
        level: Level,
        message: &str,
        exception_type: &str,
        exception_details: &str,
        machine_name: &str,
        environment: &str,
    ) -> Self {
        let mut hasher =
            RandomState::with_seeds(SEEDS[0], SEEDS[1], SEEDS[2], SEEDS[3]).build_hasher();

        level.hash(&mut hasher);
        message.hash(&mut hasher);
        exception_type.hash(&mut hasher);
        exception_details.hash(&mut hasher);
        machine_name.hash(&mut hasher);
        environment.hash(&mut hasher);

        ThrottlingKey(hasher.finish())
    }

    /// Compute the key of an entry.
    pub fn for_entry(entry: &LogEntry) -> Self {
        Self::new(
            entry.level,
            &entry.message,
            &entry.exception_type,
            &entry.exception_details,
            &entry.machine_name,
            &entry.environment,
        )
    }

    /// Create a key from a raw hash value.
    pub fn from_u64(raw: u64) -> Self {
        ThrottlingKey(raw)
    }

    /// Get the raw hash value.
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ThrottlingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}
