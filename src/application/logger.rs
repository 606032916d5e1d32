//! Dispatch orchestrator.
//!
//! A `Logger` is bound to one category. After a one-shot `init` it filters,
//! throttles, enriches and routes each entry, then delivers it to every
//! target sink concurrently and joins all deliveries before returning.

use crate::application::error::{DeliveryError, LogError, SinkFailure};
use crate::application::metrics::Metrics;
use crate::application::ports::{ContextEnricher, EntryFormatter, Sink};
use crate::application::throttle::ThrottlingEvaluator;
use crate::domain::entry::LogEntry;
use crate::domain::level::Level;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Arc, OnceLock};
use tracing::{debug, info, warn};

/// A sink paired with the formatter that renders entries for it.
#[derive(Debug, Clone)]
pub struct SinkBinding {
    name: String,
    sink: Arc<dyn Sink>,
    formatter: Arc<dyn EntryFormatter>,
}

impl SinkBinding {
    /// Bind a sink to a formatter under a name used in error reports.
    pub fn new(
        name: impl Into<String>,
        sink: Arc<dyn Sink>,
        formatter: Arc<dyn EntryFormatter>,
    ) -> Self {
        Self {
            name: name.into(),
            sink,
            formatter,
        }
    }

    /// Binding name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The bound sink.
    pub fn sink(&self) -> &Arc<dyn Sink> {
        &self.sink
    }

    /// The bound formatter.
    pub fn formatter(&self) -> &Arc<dyn EntryFormatter> {
        &self.formatter
    }

    async fn deliver(&self, entry: &LogEntry) -> Result<(), SinkFailure> {
        let text = self.formatter.format(entry);
        self.sink.deliver(&text).await.map_err(|error| {
            warn!(sink = %self.name, error = %error, "sink delivery failed");
            SinkFailure {
                sink: self.name.clone(),
                error,
            }
        })
    }
}

/// Values filled into blank entry fields before enrichers run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EntryDefaults {
    pub application_id: String,
    pub environment: String,
    pub machine_name: String,
}

impl EntryDefaults {
    fn apply(&self, entry: &mut LogEntry) {
        fill_blank(&mut entry.application_id, &self.application_id);
        fill_blank(&mut entry.environment, &self.environment);
        fill_blank(&mut entry.machine_name, &self.machine_name);
    }
}

fn fill_blank(field: &mut String, default: &str) {
    if field.is_empty() && !default.is_empty() {
        default.clone_into(field);
    }
}

/// Everything a logger needs, supplied once through `Logger::init`.
#[derive(Clone)]
pub struct LoggerSettings {
    enabled: bool,
    minimum_level: Level,
    throttling: Option<Arc<ThrottlingEvaluator>>,
    audit_sink: Option<SinkBinding>,
    sinks: Vec<SinkBinding>,
    enrichers: Vec<Arc<dyn ContextEnricher>>,
    defaults: EntryDefaults,
}

impl LoggerSettings {
    /// Start building settings. Logging is enabled at `Information` by default.
    pub fn builder() -> LoggerSettingsBuilder {
        LoggerSettingsBuilder::default()
    }

    /// Whether an entry of `level` passes the level filter.
    pub fn is_enabled(&self, level: Level) -> bool {
        self.enabled && level.is_loggable() && level >= self.minimum_level
    }

    /// The minimum enabled level.
    pub fn minimum_level(&self) -> Level {
        self.minimum_level
    }

    /// The category sinks, in binding order.
    pub fn sinks(&self) -> &[SinkBinding] {
        &self.sinks
    }

    /// The audit sink, if any.
    pub fn audit_sink(&self) -> Option<&SinkBinding> {
        self.audit_sink.as_ref()
    }

    /// The throttling evaluator, if any.
    pub fn throttling(&self) -> Option<&Arc<ThrottlingEvaluator>> {
        self.throttling.as_ref()
    }

    fn targets(&self, level: Level) -> &[SinkBinding] {
        match &self.audit_sink {
            Some(audit) if level == Level::Audit => std::slice::from_ref(audit),
            _ => &self.sinks,
        }
    }
}

impl fmt::Debug for LoggerSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoggerSettings")
            .field("enabled", &self.enabled)
            .field("minimum_level", &self.minimum_level)
            .field("throttling", &self.throttling)
            .field("audit_sink", &self.audit_sink)
            .field("sinks", &self.sinks)
            .field("enrichers", &self.enrichers.len())
            .field("defaults", &self.defaults)
            .finish()
    }
}

/// Builder for [`LoggerSettings`].
pub struct LoggerSettingsBuilder {
    settings: LoggerSettings,
}

impl Default for LoggerSettingsBuilder {
    fn default() -> Self {
        Self {
            settings: LoggerSettings {
                enabled: true,
                minimum_level: Level::Information,
                throttling: None,
                audit_sink: None,
                sinks: Vec::new(),
                enrichers: Vec::new(),
                defaults: EntryDefaults::default(),
            },
        }
    }
}

impl LoggerSettingsBuilder {
    /// Enable or disable logging globally.
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.settings.enabled = enabled;
        self
    }

    /// Set the minimum level. `Level::None` disables every entry.
    pub fn minimum_level(mut self, level: Level) -> Self {
        self.settings.minimum_level = level;
        self
    }

    /// Throttle entries through an evaluator.
    pub fn throttling(mut self, evaluator: Arc<ThrottlingEvaluator>) -> Self {
        self.settings.throttling = Some(evaluator);
        self
    }

    /// Route audit entries to this binding only.
    pub fn audit_sink(mut self, binding: SinkBinding) -> Self {
        self.settings.audit_sink = Some(binding);
        self
    }

    /// Append a category sink.
    pub fn sink(mut self, binding: SinkBinding) -> Self {
        self.settings.sinks.push(binding);
        self
    }

    /// Append several category sinks.
    pub fn sinks(mut self, bindings: impl IntoIterator<Item = SinkBinding>) -> Self {
        self.settings.sinks.extend(bindings);
        self
    }

    /// Append a context enricher. Enrichers run in the order added.
    pub fn enricher(mut self, enricher: impl ContextEnricher + 'static) -> Self {
        self.settings.enrichers.push(Arc::new(enricher));
        self
    }

    /// Append an already shared context enricher.
    pub fn shared_enricher(mut self, enricher: Arc<dyn ContextEnricher>) -> Self {
        self.settings.enrichers.push(enricher);
        self
    }

    /// Set the values used for blank application id, environment and machine name.
    pub fn defaults(mut self, defaults: EntryDefaults) -> Self {
        self.settings.defaults = defaults;
        self
    }

    /// Finish building.
    pub fn build(self) -> LoggerSettings {
        self.settings
    }
}

/// Category-bound dispatch orchestrator.
///
/// # Example
/// ```
/// use log_dispatch::{Level, LogEntry, Logger, LoggerSettings, LogError};
///
/// # async fn run() -> Result<(), LogError> {
/// let logger = Logger::new("orders");
/// assert!(matches!(logger.is_enabled(Level::Error), Err(LogError::NotInitialized)));
///
/// logger.init(LoggerSettings::builder().minimum_level(Level::Warning).build())?;
/// assert!(!logger.is_enabled(Level::Information)?);
///
/// // No sinks bound: the entry is accepted and goes nowhere
/// logger.log(LogEntry::new(Level::Error, "order rejected")).await?;
/// # Ok(())
/// # }
/// ```
pub struct Logger {
    category: String,
    settings: OnceLock<LoggerSettings>,
    metrics: Metrics,
}

impl Logger {
    pub(crate) fn initialized(
        category: impl Into<String>,
        metrics: Metrics,
        settings: LoggerSettings,
    ) -> Self {
        let logger = Self {
            category: category.into(),
            settings: OnceLock::from(settings),
            metrics,
        };
        info!(category = %logger.category, "logger created from configuration");
        logger
    }

    /// Create an uninitialized logger for a category.
    pub fn new(category: impl Into<String>) -> Self {
        Self::with_metrics(category, Metrics::new())
    }

    /// Create an uninitialized logger reporting into shared metrics.
    pub fn with_metrics(category: impl Into<String>, metrics: Metrics) -> Self {
        Self {
            category: category.into(),
            settings: OnceLock::new(),
            metrics,
        }
    }

    /// Initialize the logger. Succeeds once per instance.
    pub fn init(&self, settings: LoggerSettings) -> Result<(), LogError> {
        let sinks = settings.sinks.len();
        let audit = settings.audit_sink.is_some();
        let throttled = settings.throttling.is_some();
        let minimum_level = settings.minimum_level;

        self.settings
            .set(settings)
            .map_err(|_| LogError::AlreadyInitialized)?;

        info!(
            category = %self.category,
            sinks,
            audit,
            throttled,
            minimum_level = %minimum_level,
            "logger initialized"
        );
        Ok(())
    }

    /// Whether `init` has succeeded.
    pub fn is_initialized(&self) -> bool {
        self.settings.get().is_some()
    }

    /// The category this logger is bound to.
    pub fn category(&self) -> &str {
        &self.category
    }

    /// Dispatch metrics.
    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    fn settings(&self) -> Result<&LoggerSettings, LogError> {
        self.settings.get().ok_or(LogError::NotInitialized)
    }

    /// Whether entries of `level` would pass the level filter.
    pub fn is_enabled(&self, level: Level) -> Result<bool, LogError> {
        Ok(self.settings()?.is_enabled(level))
    }

    /// Filter, throttle, enrich, route and deliver one entry.
    ///
    /// Disabled and throttled entries return `Ok(())` without touching any
    /// sink. Every target sink is attempted; when some fail the returned
    /// `LogError::Delivery` lists all of them.
    pub async fn log(&self, mut entry: LogEntry) -> Result<(), LogError> {
        let settings = self.settings()?;

        if !settings.is_enabled(entry.level) {
            self.metrics.record_filtered();
            return Ok(());
        }

        if let Some(throttling) = &settings.throttling {
            if !throttling.should_log(&mut entry) {
                self.metrics.record_throttled();
                return Ok(());
            }
        }

        settings.defaults.apply(&mut entry);
        for enricher in &settings.enrichers {
            enricher.enrich(&mut entry);
        }

        let targets = settings.targets(entry.level);
        self.metrics.record_dispatched();
        debug!(
            category = %self.category,
            level = %entry.level,
            sinks = targets.len(),
            "dispatching entry"
        );

        let entry = &entry;
        let failures: Vec<SinkFailure> = join_all(targets.iter().map(|binding| binding.deliver(entry)))
            .await
            .into_iter()
            .filter_map(Result::err)
            .collect();

        if failures.is_empty() {
            Ok(())
        } else {
            self.metrics.record_delivery_failures(failures.len() as u64);
            Err(DeliveryError::new(failures).into())
        }
    }

    /// Log a plain message at `level`.
    pub async fn log_message(&self, level: Level, message: impl Into<String>) -> Result<(), LogError> {
        self.log(LogEntry::new(level, message)).await
    }
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger")
            .field("category", &self.category)
            .field("initialized", &self.is_initialized())
            .finish()
    }
}
