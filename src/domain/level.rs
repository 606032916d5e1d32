//! Severity levels for log entries.
//!
//! Levels are totally ordered. `None` sits above every loggable level so that a
//! minimum of `None` disables a logger, and it is never loggable itself.
//! `Audit` is the tier routed to the dedicated audit sink when one exists.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Ordered severity of a log entry.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum Level {
    /// Fine-grained diagnostic output
    Trace,
    /// Debugging output
    Debug,
    /// Normal operational messages
    #[default]
    Information,
    /// Something unexpected that the application recovered from
    Warning,
    /// A failed operation
    Error,
    /// A failure that threatens the whole application
    Critical,
    /// Audit records, eligible for the audit bypass route
    Audit,
    /// Not a loggable level
    None,
}

impl Level {
    /// All levels in ascending order.
    pub const ALL: [Level; 8] = [
        Level::Trace,
        Level::Debug,
        Level::Information,
        Level::Warning,
        Level::Error,
        Level::Critical,
        Level::Audit,
        Level::None,
    ];

    /// The level's canonical name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Trace => "Trace",
            Level::Debug => "Debug",
            Level::Information => "Information",
            Level::Warning => "Warning",
            Level::Error => "Error",
            Level::Critical => "Critical",
            Level::Audit => "Audit",
            Level::None => "None",
        }
    }

    /// Whether entries of this level can ever be logged.
    pub fn is_loggable(&self) -> bool {
        *self != Level::None
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a string does not name a level.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown log level: {0:?}")]
pub struct ParseLevelError(pub String);

impl FromStr for Level {
    type Err = ParseLevelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Level::ALL
            .iter()
            .copied()
            .find(|level| level.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| ParseLevelError(s.to_string()))
    }
}
