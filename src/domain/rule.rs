//! Throttling rules and per-key tracker state.
//!
//! A rule combines a minimum interval between logged occurrences with a
//! minimum event threshold. The decision table lives here as pure functions of
//! (rule, tracker, now) so it can be tested without any storage.

use std::time::{Duration, Instant};

/// Extended property recording how many occurrences were skipped before an
/// allowed one.
pub const SKIPPED_PROPERTY: &str = "ThrottledMessagesSkippedSinceLastLog";

/// Threshold value that suppresses the first occurrence of a key even when no
/// event count is configured.
pub const SUPPRESS_FIRST: i64 = -1;

/// Decision made for one occurrence of a throttling key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThrottleVerdict {
    /// Log the entry. Carries the number of occurrences skipped since the last
    /// logged one, when a tracker existed.
    Allow { skipped: Option<u64> },
    /// Drop the entry
    Suppress,
}

impl ThrottleVerdict {
    /// Check if this verdict is Allow.
    pub fn is_allow(&self) -> bool {
        matches!(self, ThrottleVerdict::Allow { .. })
    }

    /// Check if this verdict is Suppress.
    pub fn is_suppress(&self) -> bool {
        matches!(self, ThrottleVerdict::Suppress)
    }
}

/// State remembered for one throttling key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThrottleTracker {
    /// When an occurrence of this key was last allowed (or first seen)
    pub last_logged: Instant,
    /// Occurrences suppressed since `last_logged`
    pub skipped_since_last_log: u64,
}

impl ThrottleTracker {
    /// Create a tracker seeded at `now`.
    pub fn new(now: Instant, skipped: u64) -> Self {
        Self {
            last_logged: now,
            skipped_since_last_log: skipped,
        }
    }
}

/// Duplicate-suppression rule attached to a category.
///
/// # Example
/// ```
/// use log_dispatch::ThrottlingRule;
/// use std::time::{Duration, Instant};
///
/// // Log every third occurrence.
/// let rule = ThrottlingRule::new("every-third", Duration::ZERO, 3);
/// let now = Instant::now();
///
/// let (verdict, mut tracker) = rule.first_occurrence(now);
/// assert!(verdict.is_suppress());
/// assert!(rule.next_occurrence(&mut tracker, now).is_suppress());
/// assert!(rule.next_occurrence(&mut tracker, now).is_allow());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThrottlingRule {
    name: String,
    min_interval: Duration,
    min_event_threshold: i64,
}

impl ThrottlingRule {
    /// Create a rule.
    ///
    /// # Arguments
    /// * `name` - Rule name, unique within a configuration
    /// * `min_interval` - Minimum time between logged occurrences of a key
    /// * `min_event_threshold` - Occurrences needed before one is logged;
    ///   values of 1 or less disable the count condition and `-1` additionally
    ///   suppresses the first occurrence
    pub fn new(name: impl Into<String>, min_interval: Duration, min_event_threshold: i64) -> Self {
        Self {
            name: name.into(),
            min_interval,
            min_event_threshold,
        }
    }

    /// Rule name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Minimum interval between logged occurrences.
    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Minimum event threshold.
    pub fn min_event_threshold(&self) -> i64 {
        self.min_event_threshold
    }

    fn counts_events(&self) -> bool {
        self.min_event_threshold > 1
    }

    fn has_interval(&self) -> bool {
        !self.min_interval.is_zero()
    }

    /// Whether this rule can ever suppress an entry.
    pub fn is_active(&self) -> bool {
        self.counts_events() || self.has_interval()
    }

    /// Decide the first occurrence of a key and build its tracker.
    pub fn first_occurrence(&self, now: Instant) -> (ThrottleVerdict, ThrottleTracker) {
        if !self.is_active() {
            return (ThrottleVerdict::Allow { skipped: None }, ThrottleTracker::new(now, 0));
        }

        if self.min_event_threshold == SUPPRESS_FIRST || self.counts_events() {
            (ThrottleVerdict::Suppress, ThrottleTracker::new(now, 1))
        } else {
            (ThrottleVerdict::Allow { skipped: None }, ThrottleTracker::new(now, 0))
        }
    }

    /// Decide a later occurrence of a key, updating its tracker.
    pub fn next_occurrence(&self, tracker: &mut ThrottleTracker, now: Instant) -> ThrottleVerdict {
        if !self.is_active() {
            return ThrottleVerdict::Allow { skipped: None };
        }

        // An interval past the end of `Instant` never elapses.
        let within_interval = || {
            tracker
                .last_logged
                .checked_add(self.min_interval)
                .map_or(true, |until| now < until)
        };
        let below_threshold = || {
            let needed = self.min_event_threshold - 1;
            i64::try_from(tracker.skipped_since_last_log).map_or(false, |skipped| skipped < needed)
        };

        let suppress = match (self.counts_events(), self.has_interval()) {
            (true, false) => below_threshold(),
            (false, true) => within_interval(),
            // Either condition being satisfied unlocks logging.
            (true, true) => within_interval() && below_threshold(),
            (false, false) => false,
        };

        if suppress {
            tracker.skipped_since_last_log += 1;
            ThrottleVerdict::Suppress
        } else {
            let skipped = tracker.skipped_since_last_log;
            tracker.last_logged = now;
            tracker.skipped_since_last_log = 0;
            ThrottleVerdict::Allow {
                skipped: Some(skipped),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(rule: &ThrottlingRule, times: &[Instant]) -> Vec<bool> {
        let mut tracker: Option<ThrottleTracker> = None;
        times
            .iter()
            .map(|&now| match tracker.as_mut() {
                None => {
                    let (verdict, seeded) = rule.first_occurrence(now);
                    tracker = Some(seeded);
                    verdict.is_allow()
                }
                Some(t) => rule.next_occurrence(t, now).is_allow(),
            })
            .collect()
    }

    #[test]
    fn test_inactive_rule_always_allows() {
        let now = Instant::now();
        for threshold in [-5, 0, 1] {
            let rule = ThrottlingRule::new("off", Duration::ZERO, threshold);
            assert!(!rule.is_active());
            assert_eq!(run(&rule, &[now; 5]), vec![true; 5]);
        }
    }

    #[test]
    fn test_minus_one_without_interval_is_inactive() {
        let rule = ThrottlingRule::new("off", Duration::ZERO, SUPPRESS_FIRST);
        let now = Instant::now();
        assert_eq!(run(&rule, &[now; 3]), vec![true; 3]);
    }

    #[test]
    fn test_threshold_only_logs_every_nth() {
        let rule = ThrottlingRule::new("third", Duration::ZERO, 3);
        let now = Instant::now();

        assert_eq!(
            run(&rule, &[now; 6]),
            vec![false, false, true, false, false, true]
        );
    }

    #[test]
    fn test_threshold_two_alternates() {
        let rule = ThrottlingRule::new("second", Duration::ZERO, 2);
        let now = Instant::now();

        assert_eq!(run(&rule, &[now; 4]), vec![false, true, false, true]);
    }

    #[test]
    fn test_interval_only() {
        let rule = ThrottlingRule::new("5s", Duration::from_secs(5), 0);
        let start = Instant::now();

        let times = [
            start,
            start + Duration::from_secs(1),
            start + Duration::from_secs(5),
            start + Duration::from_secs(6),
        ];
        assert_eq!(run(&rule, &times), vec![true, false, true, false]);
    }

    #[test]
    fn test_interval_with_suppressed_first() {
        let rule = ThrottlingRule::new("quiet-start", Duration::from_secs(5), SUPPRESS_FIRST);
        let start = Instant::now();

        let times = [
            start,
            start + Duration::from_secs(2),
            start + Duration::from_secs(5),
        ];
        assert_eq!(run(&rule, &times), vec![false, false, true]);
    }

    #[test]
    fn test_interval_or_threshold_unlocks() {
        let rule = ThrottlingRule::new("both", Duration::from_secs(60), 3);
        let start = Instant::now();

        // Threshold reached inside the interval
        let times = [start, start, start];
        assert_eq!(run(&rule, &times), vec![false, false, true]);

        // Interval elapsed before the threshold
        let times = [start, start + Duration::from_secs(61)];
        assert_eq!(run(&rule, &times), vec![false, true]);
    }

    #[test]
    fn test_allow_reports_and_resets_skipped() {
        let rule = ThrottlingRule::new("third", Duration::ZERO, 3);
        let now = Instant::now();

        let (_, mut tracker) = rule.first_occurrence(now);
        assert_eq!(rule.next_occurrence(&mut tracker, now), ThrottleVerdict::Suppress);
        assert_eq!(
            rule.next_occurrence(&mut tracker, now),
            ThrottleVerdict::Allow { skipped: Some(2) }
        );
        assert_eq!(tracker.skipped_since_last_log, 0);
    }

    #[test]
    fn test_first_allow_seeds_zero() {
        let rule = ThrottlingRule::new("5s", Duration::from_secs(5), 1);
        let now = Instant::now();

        let (verdict, tracker) = rule.first_occurrence(now);
        assert_eq!(verdict, ThrottleVerdict::Allow { skipped: None });
        assert_eq!(tracker.skipped_since_last_log, 0);
        assert_eq!(tracker.last_logged, now);
    }

    #[test]
    fn test_unbounded_interval_logs_once() {
        let rule = ThrottlingRule::new("forever", Duration::MAX, 0);
        let start = Instant::now();

        let times = [start, start, start + Duration::from_secs(86_400 * 365)];
        assert_eq!(run(&rule, &times), vec![true, false, false]);
    }

    #[test]
    fn test_unbounded_interval_still_honors_threshold() {
        let rule = ThrottlingRule::new("forever", Duration::MAX, 3);
        let now = Instant::now();

        assert_eq!(run(&rule, &[now; 3]), vec![false, false, true]);
    }
}
