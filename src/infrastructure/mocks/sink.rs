//! In-memory sinks for testing dispatch.

use crate::application::error::SinkError;
use crate::application::ports::Sink;
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Sink that records every delivered text.
///
/// Clones share the same record list.
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    records: Arc<Mutex<Vec<String>>>,
}

impl RecordingSink {
    /// Create an empty recording sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// All delivered texts, in delivery order.
    pub fn records(&self) -> Vec<String> {
        self.records
            .lock()
            .expect("RecordingSink mutex poisoned - a test thread panicked while holding the lock")
            .clone()
    }

    /// Number of delivered texts.
    pub fn len(&self) -> usize {
        self.records
            .lock()
            .expect("RecordingSink mutex poisoned - a test thread panicked while holding the lock")
            .len()
    }

    /// Whether nothing has been delivered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl Sink for RecordingSink {
    async fn deliver(&self, text: &str) -> Result<(), SinkError> {
        self.records
            .lock()
            .expect("RecordingSink mutex poisoned - a test thread panicked while holding the lock")
            .push(text.to_string());
        Ok(())
    }
}

/// Sink whose every delivery fails.
///
/// Counts attempts so tests can check it was still called.
#[derive(Debug, Clone)]
pub struct FailingSink {
    message: String,
    attempts: Arc<AtomicUsize>,
}

impl FailingSink {
    /// Create a sink failing with `message`.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            attempts: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Number of delivery attempts so far.
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Sink for FailingSink {
    async fn deliver(&self, _text: &str) -> Result<(), SinkError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(SinkError::new(self.message.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_recording_sink_shares_records() {
        let sink = RecordingSink::new();
        let clone = sink.clone();

        clone.deliver("one").await.unwrap();
        sink.deliver("two").await.unwrap();

        assert_eq!(sink.records(), vec!["one".to_string(), "two".to_string()]);
    }

    #[tokio::test]
    async fn test_failing_sink_counts_attempts() {
        let sink = FailingSink::new("offline");

        let error = sink.deliver("x").await.unwrap_err();
        assert_eq!(error.message(), "offline");
        assert!(sink.deliver("y").await.is_err());
        assert_eq!(sink.attempts(), 2);
    }
}
