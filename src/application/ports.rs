//! Ports (interfaces) for the application layer.
//!
//! In hexagonal architecture, ports define the interfaces that the application
//! layer needs. Infrastructure adapters implement these ports, and callers plug
//! their own sinks, formatters and enrichers in through them.

use crate::application::error::SinkError;
use crate::domain::entry::LogEntry;
use crate::domain::template::TemplateFormatter;
use async_trait::async_trait;
use std::fmt::Debug;
use std::hash::Hash;
use std::time::Instant;

/// Port for obtaining current time.
///
/// This abstraction allows the application layer to work with time
/// without depending on system clock implementation details.
/// Infrastructure provides concrete implementations (SystemClock, MockClock).
pub trait Clock: Send + Sync + Debug {
    /// Get the current instant.
    fn now(&self) -> Instant;
}

/// Port for concurrent key-value storage.
///
/// Infrastructure provides concrete implementations (ShardedStorage).
pub trait Storage<K, V>: Send + Sync + Debug
where
    K: Hash + Eq + Clone + Send + Sync,
    V: Send + Sync,
{
    /// Atomically read-modify-write the entry for `key`.
    ///
    /// Exactly one of the closures runs while the entry is locked:
    /// `on_vacant` builds the value to insert when the key is absent,
    /// `on_occupied` mutates the existing value otherwise.
    ///
    /// # Returns
    /// The result from whichever closure ran
    fn with_entry_mut<R>(
        &self,
        key: K,
        on_vacant: impl FnOnce() -> (V, R),
        on_occupied: impl FnOnce(&mut V) -> R,
    ) -> R;

    /// Get the number of entries in the storage.
    fn len(&self) -> usize;

    /// Check if the storage is empty.
    fn is_empty(&self) -> bool;

    /// Clear all entries from the storage.
    fn clear(&self);

    /// Remove entries for which the predicate returns false.
    fn retain<F>(&self, f: F)
    where
        F: FnMut(&K, &mut V) -> bool;
}

/// Port for a delivery target of formatted entries.
///
/// Implementations own their transport. Failures are reported to the caller of
/// `Logger::log` and never retried by the dispatcher.
#[async_trait]
pub trait Sink: Send + Sync + Debug {
    /// Deliver one formatted entry.
    async fn deliver(&self, text: &str) -> Result<(), SinkError>;
}

/// Port for rendering an entry to text.
pub trait EntryFormatter: Send + Sync + Debug {
    /// Render an entry. Must not fail.
    fn format(&self, entry: &LogEntry) -> String;
}

impl EntryFormatter for TemplateFormatter {
    fn format(&self, entry: &LogEntry) -> String {
        TemplateFormatter::format(self, entry)
    }
}

/// Port for mutating an entry before it is dispatched.
///
/// Enrichers run in registration order and see each other's changes.
pub trait ContextEnricher: Send + Sync {
    /// Add context to an entry in place.
    fn enrich(&self, entry: &mut LogEntry);
}

impl<F> ContextEnricher for F
where
    F: Fn(&mut LogEntry) + Send + Sync,
{
    fn enrich(&self, entry: &mut LogEntry) {
        self(entry)
    }
}
