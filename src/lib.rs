//! # log-dispatch
//!
//! Structured log entry dispatch: enrichment, duplicate throttling, template
//! rendering and concurrent fan-out to sinks, with an audit bypass route.
//!
//! A [`Logger`] is bound to a category. Every [`LogEntry`] handed to it goes
//! through the same pipeline:
//!
//! 1. **Level filter**: entries below the minimum level (or any entry when
//!    logging is disabled) are dropped silently.
//! 2. **Throttling**: a [`ThrottlingEvaluator`] decides per
//!    [`ThrottlingKey`] whether this occurrence is logged or skipped.
//! 3. **Enrichment**: blank application id, environment and machine name are
//!    filled from [`EntryDefaults`], then every [`ContextEnricher`] runs in
//!    registration order.
//! 4. **Routing**: `Audit` entries go only to the audit sink when one is
//!    configured; everything else goes to every category sink.
//! 5. **Delivery**: each sink renders the entry with its own formatter. All
//!    deliveries run concurrently and are joined before `log` returns. Failed
//!    sinks are reported together in one [`DeliveryError`].
//!
//! ## Quick Start
//!
//! ```rust
//! use log_dispatch::{Level, LogEntry, Logger, LoggerSettings, SinkBinding, TemplateFormatter};
//! use log_dispatch::infrastructure::mocks::RecordingSink;
//! use std::sync::Arc;
//!
//! # futures::executor::block_on(async {
//! let sink = RecordingSink::new();
//! let formatter = TemplateFormatter::new("[{level}] {message}");
//!
//! let logger = Logger::new("payments");
//! logger
//!     .init(
//!         LoggerSettings::builder()
//!             .minimum_level(Level::Information)
//!             .sink(SinkBinding::new("memory", Arc::new(sink.clone()), Arc::new(formatter)))
//!             .build(),
//!     )
//!     .unwrap();
//!
//! logger.log(LogEntry::new(Level::Warning, "card declined")).await.unwrap();
//! logger.log(LogEntry::new(Level::Debug, "ignored")).await.unwrap();
//!
//! assert_eq!(sink.records(), vec!["[Warning] card declined".to_string()]);
//! # });
//! ```
//!
//! ## Templates
//!
//! [`TemplateFormatter`] understands three kinds of tokens:
//!
//! | Token | Renders |
//! |-------|---------|
//! | `{message}`, `{level}`, `{machineName}`, ... | One entry field |
//! | `{createTime}` / `{createTime(%Y-%m-%d)}` | Creation time (chrono `strftime`) |
//! | `{extendedProperties({key}={value};)}` | Every extended property, in insertion order |
//! | `{extendedProperties({Tenant}={value})}` | One named property, `-Not defined-` if absent |
//!
//! Formatting never fails. Anything that is not a valid token is copied to the
//! output as-is, and substituted values are never re-scanned.
//!
//! ## Throttling Rules
//!
//! A [`ThrottlingRule`] combines a minimum interval with a minimum event
//! threshold:
//!
//! | Threshold | Interval | Behavior |
//! |-----------|----------|----------|
//! | `<= 1` | zero | Never throttles |
//! | `N > 1` | zero | Logs every Nth occurrence (first one skipped) |
//! | `<= 1` | `d` | Logs at most once per `d` |
//! | `-1` | `d` | Like the row above, but skips the first occurrence |
//! | `N > 1` | `d` | Logs when either `d` elapsed or `N` occurrences were seen |
//!
//! When an occurrence is logged after skipped ones, the number skipped is
//! added to the entry as the `ThrottledMessagesSkippedSinceLastLog` property.
//!
//! Each evaluator owns its own key state, so two categories never throttle
//! each other's entries. Use [`ThrottlingEvaluator::with_storage`] to share
//! state on purpose.
//!
//! ## Configuration
//!
//! Declarative configuration is plain serde data resolved once against a
//! [`ComponentRegistry`]:
//!
//! ```rust
//! use log_dispatch::{ComponentRegistry, LoggingConfig, LoggingConfigDescriptor};
//!
//! let descriptor: LoggingConfigDescriptor = serde_json::from_str(r#"{
//!     "minimum_level": "Warning",
//!     "sinks": [{ "name": "console", "kind": "tracing", "settings": { "level": "warn" } }],
//!     "formatters": [{ "name": "line", "template": "{createTime(%H:%M:%S)} {message}" }],
//!     "throttling_rules": [{ "name": "burst", "min_interval_ms": 5000 }],
//!     "categories": [{
//!         "name": "http",
//!         "sinks": [{ "sink": "console", "formatter": "line" }],
//!         "throttling_rule": "burst"
//!     }]
//! }"#).unwrap();
//!
//! let config = LoggingConfig::resolve(&descriptor, &ComponentRegistry::with_defaults()).unwrap();
//! let logger = config.logger("http").unwrap();
//! assert_eq!(logger.category(), "http");
//! ```
//!
//! Unknown kinds and dangling references are reported as [`ConfigError`]
//! here, never at log time.
//!
//! ## Observability
//!
//! ```rust,no_run
//! # use log_dispatch::Logger;
//! # let logger = Logger::new("http");
//! let snapshot = logger.metrics().snapshot();
//! println!("dispatched: {}", snapshot.entries_dispatched);
//! println!("throttle rate: {:.2}%", snapshot.throttle_rate() * 100.0);
//! ```
//!
//! The crate's own diagnostics (throttled entries, failed deliveries,
//! initialization) are emitted through `tracing`.

// Domain layer - pure logic
pub mod domain;

// Application layer - orchestration
pub mod application;

// Infrastructure layer - external adapters
pub mod infrastructure;

// Re-export commonly used types for convenience
pub use domain::{
    entry::{ExtendedProperties, LogEntry},
    level::{Level, ParseLevelError},
    rule::{ThrottleTracker, ThrottleVerdict, ThrottlingRule, SKIPPED_PROPERTY, SUPPRESS_FIRST},
    template::{TemplateFormatter, DEFAULT_TIME_FORMAT, NOT_DEFINED},
    throttling_key::ThrottlingKey,
};

pub use application::{
    config::{
        BindingDescriptor, Category, CategoryDescriptor, ComponentRegistry, ComponentSettings,
        FormatterDescriptor, LoggingConfig, LoggingConfigBuilder, LoggingConfigDescriptor,
        SinkDescriptor, ThrottlingRuleDescriptor,
    },
    error::{ConfigError, DeliveryError, LogError, SinkError, SinkFailure},
    logger::{EntryDefaults, Logger, LoggerSettings, LoggerSettingsBuilder, SinkBinding},
    metrics::{Metrics, MetricsSnapshot},
    ports::{Clock, ContextEnricher, EntryFormatter, Sink, Storage},
    throttle::{ThrottlingEvaluator, TrackerStorage},
};

pub use infrastructure::{clock::SystemClock, storage::ShardedStorage, tracing_sink::TracingSink};
