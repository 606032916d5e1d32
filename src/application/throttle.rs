//! Throttling evaluator: per-key duplicate suppression.
//!
//! The evaluator owns one rule and the tracker state of every key it has seen
//! under that rule. Reading a tracker, deciding and writing it back is one
//! atomic step per key.

use crate::application::ports::{Clock, Storage};
use crate::domain::entry::LogEntry;
use crate::domain::rule::{ThrottleTracker, ThrottleVerdict, ThrottlingRule, SKIPPED_PROPERTY};
use crate::domain::throttling_key::ThrottlingKey;
use crate::infrastructure::clock::SystemClock;
use crate::infrastructure::storage::ShardedStorage;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Default tracker storage: a sharded map shared through an `Arc`.
pub type TrackerStorage = Arc<ShardedStorage<ThrottlingKey, ThrottleTracker>>;

/// Decides whether entries of a category should be logged.
///
/// # Example
/// ```
/// use log_dispatch::{Level, LogEntry, ThrottlingEvaluator, ThrottlingRule};
/// use std::time::Duration;
///
/// let evaluator = ThrottlingEvaluator::new(ThrottlingRule::new("pairs", Duration::ZERO, 2));
/// let mut entry = LogEntry::new(Level::Error, "upstream timeout");
///
/// assert!(!evaluator.should_log(&mut entry));
/// assert!(evaluator.should_log(&mut entry));
/// assert_eq!(
///     entry.extended_properties.get("ThrottledMessagesSkippedSinceLastLog"),
///     Some("1")
/// );
/// ```
pub struct ThrottlingEvaluator<S = TrackerStorage>
where
    S: Storage<ThrottlingKey, ThrottleTracker>,
{
    rule: ThrottlingRule,
    storage: S,
    clock: Arc<dyn Clock>,
}

impl ThrottlingEvaluator {
    /// Create an evaluator with its own state and the system clock.
    pub fn new(rule: ThrottlingRule) -> Self {
        Self::with_clock(rule, Arc::new(SystemClock::new()))
    }

    /// Create an evaluator with its own state and a custom clock.
    pub fn with_clock(rule: ThrottlingRule, clock: Arc<dyn Clock>) -> Self {
        Self::with_storage(rule, Arc::new(ShardedStorage::new()), clock)
    }
}

impl<S> ThrottlingEvaluator<S>
where
    S: Storage<ThrottlingKey, ThrottleTracker>,
{
    /// Create an evaluator over caller-supplied storage.
    ///
    /// Evaluators handed clones of the same `Arc` storage share trackers: an
    /// entry counted by one is counted by all of them.
    pub fn with_storage(rule: ThrottlingRule, storage: S, clock: Arc<dyn Clock>) -> Self {
        Self {
            rule,
            storage,
            clock,
        }
    }

    /// The rule this evaluator applies.
    pub fn rule(&self) -> &ThrottlingRule {
        &self.rule
    }

    /// Decide one occurrence of `key` and update its tracker.
    pub fn decide(&self, key: ThrottlingKey) -> ThrottleVerdict {
        if !self.rule.is_active() {
            return ThrottleVerdict::Allow { skipped: None };
        }

        let now = self.clock.now();
        let rule = &self.rule;
        self.storage.with_entry_mut(
            key,
            || {
                let (verdict, tracker) = rule.first_occurrence(now);
                (tracker, verdict)
            },
            |tracker| rule.next_occurrence(tracker, now),
        )
    }

    /// Decide whether `entry` should be logged.
    ///
    /// An allowed occurrence that follows earlier ones records how many were
    /// skipped in the entry's extended properties.
    pub fn should_log(&self, entry: &mut LogEntry) -> bool {
        let key = entry.throttling_key();
        match self.decide(key) {
            ThrottleVerdict::Allow { skipped } => {
                if let Some(skipped) = skipped {
                    entry
                        .extended_properties
                        .insert(SKIPPED_PROPERTY, skipped.to_string());
                }
                true
            }
            ThrottleVerdict::Suppress => {
                debug!(
                    rule = self.rule.name(),
                    throttling_key = %key,
                    "entry throttled"
                );
                false
            }
        }
    }

    /// Number of keys with tracker state.
    pub fn tracked_keys(&self) -> usize {
        self.storage.len()
    }

    /// Forget every tracker.
    pub fn reset(&self) {
        self.storage.clear();
    }

    /// Drop trackers whose last logged occurrence is at least `max_idle` old.
    ///
    /// A dropped key is treated as a first occurrence when seen again.
    ///
    /// # Returns
    /// The number of trackers removed
    pub fn prune_idle(&self, max_idle: Duration) -> usize {
        let now = self.clock.now();
        let mut removed = 0;
        self.storage.retain(|_, tracker| {
            let keep = now.saturating_duration_since(tracker.last_logged) < max_idle;
            if !keep {
                removed += 1;
            }
            keep
        });
        if removed > 0 {
            debug!(rule = self.rule.name(), removed, "pruned idle throttling trackers");
        }
        removed
    }
}

impl<S> fmt::Debug for ThrottlingEvaluator<S>
where
    S: Storage<ThrottlingKey, ThrottleTracker>,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ThrottlingEvaluator")
            .field("rule", &self.rule)
            .field("tracked_keys", &self.storage.len())
            .finish()
    }
}
