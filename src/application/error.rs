//! Error types for configuration, dispatch and sink delivery.
//!
//! Throttled and disabled entries are not errors; they never show up here.

use std::fmt;
use thiserror::Error;

type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// A single sink's delivery failure.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct SinkError {
    message: String,
    #[source]
    source: Option<BoxError>,
}

impl SinkError {
    /// Create an error with a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    /// Create an error wrapping an underlying cause.
    pub fn with_source(message: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// The failure message.
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// One failed delivery inside a [`DeliveryError`].
#[derive(Debug)]
pub struct SinkFailure {
    /// Name of the binding whose sink failed
    pub sink: String,
    /// What the sink reported
    pub error: SinkError,
}

/// Aggregate of every sink that failed during one `log` call.
///
/// Only produced after all deliveries of that call have finished.
#[derive(Debug, Error)]
pub struct DeliveryError {
    failures: Vec<SinkFailure>,
}

impl DeliveryError {
    pub(crate) fn new(failures: Vec<SinkFailure>) -> Self {
        Self { failures }
    }

    /// The individual failures, in binding order.
    pub fn failures(&self) -> &[SinkFailure] {
        &self.failures
    }

    /// Names of the failed sinks, in binding order.
    pub fn failed_sinks(&self) -> impl Iterator<Item = &str> {
        self.failures.iter().map(|failure| failure.sink.as_str())
    }

    /// Number of failed sinks.
    pub fn len(&self) -> usize {
        self.failures.len()
    }

    /// Whether no sink failed.
    pub fn is_empty(&self) -> bool {
        self.failures.is_empty()
    }
}

impl fmt::Display for DeliveryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "delivery failed for {} sink(s)", self.failures.len())?;
        for (index, failure) in self.failures.iter().enumerate() {
            let sep = if index == 0 { ": " } else { "; " };
            write!(f, "{sep}{}: {}", failure.sink, failure.error)?;
        }
        Ok(())
    }
}

/// Errors returned by a `Logger`.
#[derive(Debug, Error)]
pub enum LogError {
    /// The logger was used before `init`
    #[error("logger used before initialization")]
    NotInitialized,

    /// `init` was called on an already initialized logger
    #[error("logger is already initialized")]
    AlreadyInitialized,

    /// One or more sinks failed to deliver an entry
    #[error(transparent)]
    Delivery(#[from] DeliveryError),
}

impl LogError {
    /// Whether this is a usage error that must not be retried.
    pub fn is_usage_error(&self) -> bool {
        matches!(self, LogError::NotInitialized | LogError::AlreadyInitialized)
    }
}

/// Errors raised while resolving a logging configuration.
///
/// All of these surface at setup, before any entry is logged.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unknown sink kind {kind:?} for sink {name:?}")]
    UnknownSinkKind { name: String, kind: String },

    #[error("unknown formatter kind {kind:?} for formatter {name:?}")]
    UnknownFormatterKind { name: String, kind: String },

    #[error("category {category:?} references unknown sink {sink:?}")]
    UnknownSink { category: String, sink: String },

    #[error("category {category:?} references unknown formatter {formatter:?}")]
    UnknownFormatter { category: String, formatter: String },

    #[error("category {category:?} references unknown throttling rule {rule:?}")]
    UnknownThrottlingRule { category: String, rule: String },

    #[error("unknown category {0:?}")]
    UnknownCategory(String),

    #[error("duplicate {kind} name {name:?}")]
    DuplicateName { kind: &'static str, name: String },

    #[error("invalid settings for {component:?}: {message}")]
    InvalidSettings { component: String, message: String },
}
