//! Logging configuration: descriptors, component registry and resolved snapshot.
//!
//! Configuration arrives as plain serde data ([`LoggingConfigDescriptor`]).
//! A [`ComponentRegistry`] maps sink and formatter kind identifiers to
//! constructor functions. [`LoggingConfig::resolve`] turns a descriptor into an
//! immutable snapshot once; every reference is checked at that point, so a
//! resolved configuration cannot fail at log time.

use crate::application::error::ConfigError;
use crate::application::logger::{EntryDefaults, Logger, LoggerSettings, SinkBinding};
use crate::application::metrics::Metrics;
use crate::application::ports::{Clock, EntryFormatter, Sink};
use crate::application::throttle::ThrottlingEvaluator;
use crate::domain::level::Level;
use crate::domain::rule::ThrottlingRule;
use crate::domain::template::TemplateFormatter;
use crate::infrastructure::clock::SystemClock;
use crate::infrastructure::tracing_sink::TracingSink;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Free-form component settings.
pub type ComponentSettings = BTreeMap<String, String>;

/// Formatter kind registered by [`ComponentRegistry::with_defaults`].
pub const TEMPLATE_FORMATTER_KIND: &str = "template";

/// Sink kind registered by [`ComponentRegistry::with_defaults`].
pub const TRACING_SINK_KIND: &str = "tracing";

/// Template formatter setting for the separator between repeated properties.
pub const REPEAT_SEPARATOR_SETTING: &str = "repeat_separator";

/// Root of a declarative logging configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfigDescriptor {
    /// Global switch
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Entries below this level are dropped
    #[serde(default)]
    pub minimum_level: Level,

    /// Values for blank entry fields
    #[serde(default)]
    pub defaults: EntryDefaults,

    #[serde(default)]
    pub sinks: Vec<SinkDescriptor>,

    #[serde(default)]
    pub formatters: Vec<FormatterDescriptor>,

    #[serde(default)]
    pub throttling_rules: Vec<ThrottlingRuleDescriptor>,

    #[serde(default)]
    pub categories: Vec<CategoryDescriptor>,

    /// Sink receiving every audit entry, bypassing category sinks
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audit: Option<BindingDescriptor>,
}

fn default_enabled() -> bool {
    true
}

fn default_formatter_kind() -> String {
    TEMPLATE_FORMATTER_KIND.into()
}

impl Default for LoggingConfigDescriptor {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            minimum_level: Level::default(),
            defaults: EntryDefaults::default(),
            sinks: Vec::new(),
            formatters: Vec::new(),
            throttling_rules: Vec::new(),
            categories: Vec::new(),
            audit: None,
        }
    }
}

/// A named sink instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SinkDescriptor {
    pub name: String,
    /// Registry identifier selecting the constructor
    pub kind: String,
    #[serde(default)]
    pub settings: ComponentSettings,
}

/// A named formatter instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormatterDescriptor {
    pub name: String,
    #[serde(default = "default_formatter_kind")]
    pub kind: String,
    #[serde(default)]
    pub template: String,
    #[serde(default)]
    pub settings: ComponentSettings,
}

/// A named throttling rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThrottlingRuleDescriptor {
    pub name: String,
    #[serde(default)]
    pub min_interval_ms: u64,
    #[serde(default)]
    pub min_event_threshold: i64,
}

/// A sink reference paired with a formatter reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BindingDescriptor {
    pub sink: String,
    pub formatter: String,
}

/// A named category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryDescriptor {
    pub name: String,
    #[serde(default)]
    pub sinks: Vec<BindingDescriptor>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub throttling_rule: Option<String>,
}

/// Constructor for a sink kind.
pub type SinkFactory =
    Arc<dyn Fn(&SinkDescriptor) -> Result<Arc<dyn Sink>, ConfigError> + Send + Sync>;

/// Constructor for a formatter kind.
pub type FormatterFactory =
    Arc<dyn Fn(&FormatterDescriptor) -> Result<Arc<dyn EntryFormatter>, ConfigError> + Send + Sync>;

/// Maps kind identifiers to component constructors.
#[derive(Clone, Default)]
pub struct ComponentRegistry {
    sinks: HashMap<String, SinkFactory>,
    formatters: HashMap<String, FormatterFactory>,
}

impl ComponentRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry with the built-in `template` formatter and `tracing` sink.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register_formatter(TEMPLATE_FORMATTER_KIND, |descriptor| {
            let mut formatter = TemplateFormatter::new(descriptor.template.as_str());
            if let Some(separator) = descriptor.settings.get(REPEAT_SEPARATOR_SETTING) {
                formatter = formatter.with_repeat_separator(separator.as_str());
            }
            Ok(Arc::new(formatter) as Arc<dyn EntryFormatter>)
        });
        registry.register_sink(TRACING_SINK_KIND, |descriptor| {
            let sink = TracingSink::from_settings(descriptor.name.as_str(), &descriptor.settings)?;
            Ok(Arc::new(sink) as Arc<dyn Sink>)
        });
        registry
    }

    /// Register (or replace) a sink constructor.
    pub fn register_sink<F>(&mut self, kind: impl Into<String>, factory: F)
    where
        F: Fn(&SinkDescriptor) -> Result<Arc<dyn Sink>, ConfigError> + Send + Sync + 'static,
    {
        self.sinks.insert(kind.into(), Arc::new(factory));
    }

    /// Register (or replace) a formatter constructor.
    pub fn register_formatter<F>(&mut self, kind: impl Into<String>, factory: F)
    where
        F: Fn(&FormatterDescriptor) -> Result<Arc<dyn EntryFormatter>, ConfigError>
            + Send
            + Sync
            + 'static,
    {
        self.formatters.insert(kind.into(), Arc::new(factory));
    }

    /// Registered sink kinds, sorted.
    pub fn sink_kinds(&self) -> Vec<String> {
        let mut kinds: Vec<String> = self.sinks.keys().cloned().collect();
        kinds.sort();
        kinds
    }

    /// Registered formatter kinds, sorted.
    pub fn formatter_kinds(&self) -> Vec<String> {
        let mut kinds: Vec<String> = self.formatters.keys().cloned().collect();
        kinds.sort();
        kinds
    }

    fn build_sink(&self, descriptor: &SinkDescriptor) -> Result<Arc<dyn Sink>, ConfigError> {
        let factory =
            self.sinks
                .get(&descriptor.kind)
                .ok_or_else(|| ConfigError::UnknownSinkKind {
                    name: descriptor.name.clone(),
                    kind: descriptor.kind.clone(),
                })?;
        factory(descriptor)
    }

    fn build_formatter(
        &self,
        descriptor: &FormatterDescriptor,
    ) -> Result<Arc<dyn EntryFormatter>, ConfigError> {
        let factory = self.formatters.get(&descriptor.kind).ok_or_else(|| {
            ConfigError::UnknownFormatterKind {
                name: descriptor.name.clone(),
                kind: descriptor.kind.clone(),
            }
        })?;
        factory(descriptor)
    }
}

impl fmt::Debug for ComponentRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentRegistry")
            .field("sinks", &self.sink_kinds())
            .field("formatters", &self.formatter_kinds())
            .finish()
    }
}

/// A resolved category: ordered sink bindings plus optional throttling.
#[derive(Debug, Clone)]
pub struct Category {
    name: String,
    sinks: Vec<SinkBinding>,
    evaluator: Option<Arc<ThrottlingEvaluator>>,
}

impl Category {
    /// Category name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Sink bindings, in configuration order.
    pub fn sinks(&self) -> &[SinkBinding] {
        &self.sinks
    }

    /// The category's throttling rule, if any.
    pub fn throttling_rule(&self) -> Option<&ThrottlingRule> {
        self.evaluator.as_ref().map(|evaluator| evaluator.rule())
    }

    /// The evaluator owning this category's throttling state.
    pub fn evaluator(&self) -> Option<&Arc<ThrottlingEvaluator>> {
        self.evaluator.as_ref()
    }
}

/// Immutable, validated logging configuration.
///
/// # Example
/// ```
/// use log_dispatch::{ComponentRegistry, LoggingConfig, LoggingConfigDescriptor};
///
/// let descriptor: LoggingConfigDescriptor = serde_json::from_str(r#"{
///     "sinks": [{ "name": "console", "kind": "tracing" }],
///     "formatters": [{ "name": "plain", "template": "{level}: {message}" }],
///     "categories": [
///         { "name": "orders", "sinks": [{ "sink": "console", "formatter": "plain" }] }
///     ]
/// }"#).unwrap();
///
/// let config = LoggingConfig::resolve(&descriptor, &ComponentRegistry::with_defaults()).unwrap();
/// let logger = config.logger("orders").unwrap();
/// assert!(logger.is_initialized());
/// ```
#[derive(Debug)]
pub struct LoggingConfig {
    enabled: bool,
    minimum_level: Level,
    defaults: EntryDefaults,
    audit: Option<SinkBinding>,
    categories: HashMap<String, Category>,
    metrics: Metrics,
}

impl LoggingConfig {
    /// Start building a configuration in code.
    pub fn builder() -> LoggingConfigBuilder {
        LoggingConfigBuilder::default()
    }

    /// Resolve a descriptor against a registry using the system clock.
    pub fn resolve(
        descriptor: &LoggingConfigDescriptor,
        registry: &ComponentRegistry,
    ) -> Result<Self, ConfigError> {
        Self::resolve_with_clock(descriptor, registry, Arc::new(SystemClock::new()))
    }

    /// Resolve a descriptor against a registry, timing throttling with `clock`.
    pub fn resolve_with_clock(
        descriptor: &LoggingConfigDescriptor,
        registry: &ComponentRegistry,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, ConfigError> {
        let sinks = build_named(&descriptor.sinks, "sink", |d| &d.name, |d| {
            registry.build_sink(d)
        })?;
        let formatters = build_named(&descriptor.formatters, "formatter", |d| &d.name, |d| {
            registry.build_formatter(d)
        })?;
        let rules = build_named(
            &descriptor.throttling_rules,
            "throttling rule",
            |d| &d.name,
            |d| {
                Ok(ThrottlingRule::new(
                    d.name.as_str(),
                    Duration::from_millis(d.min_interval_ms),
                    d.min_event_threshold,
                ))
            },
        )?;

        let bind = |owner: &str, binding: &BindingDescriptor| -> Result<SinkBinding, ConfigError> {
            let sink = sinks.get(&binding.sink).ok_or_else(|| ConfigError::UnknownSink {
                category: owner.to_string(),
                sink: binding.sink.clone(),
            })?;
            let formatter =
                formatters
                    .get(&binding.formatter)
                    .ok_or_else(|| ConfigError::UnknownFormatter {
                        category: owner.to_string(),
                        formatter: binding.formatter.clone(),
                    })?;
            Ok(SinkBinding::new(
                binding.sink.as_str(),
                Arc::clone(sink),
                Arc::clone(formatter),
            ))
        };

        let mut builder = LoggingConfig::builder()
            .enabled(descriptor.enabled)
            .minimum_level(descriptor.minimum_level)
            .defaults(descriptor.defaults.clone())
            .clock(clock);

        if let Some(audit) = &descriptor.audit {
            builder = builder.audit_sink(bind("audit", audit)?);
        }

        for category in &descriptor.categories {
            let bindings = category
                .sinks
                .iter()
                .map(|binding| bind(&category.name, binding))
                .collect::<Result<Vec<_>, _>>()?;
            let rule = match &category.throttling_rule {
                Some(name) => Some(rules.get(name).cloned().ok_or_else(|| {
                    ConfigError::UnknownThrottlingRule {
                        category: category.name.clone(),
                        rule: name.clone(),
                    }
                })?),
                None => None,
            };
            builder = builder.category(category.name.as_str(), bindings, rule);
        }

        builder.build()
    }

    /// Create an initialized logger for a category.
    ///
    /// Loggers for the same category share its throttling state and all
    /// loggers share this configuration's metrics.
    pub fn logger(&self, category: &str) -> Result<Logger, ConfigError> {
        let resolved = self
            .categories
            .get(category)
            .ok_or_else(|| ConfigError::UnknownCategory(category.to_string()))?;

        let mut settings = LoggerSettings::builder()
            .enabled(self.enabled)
            .minimum_level(self.minimum_level)
            .defaults(self.defaults.clone())
            .sinks(resolved.sinks.iter().cloned());
        if let Some(evaluator) = &resolved.evaluator {
            settings = settings.throttling(Arc::clone(evaluator));
        }
        if let Some(audit) = &self.audit {
            settings = settings.audit_sink(audit.clone());
        }

        Ok(Logger::initialized(
            category,
            self.metrics.clone(),
            settings.build(),
        ))
    }

    /// Look up a resolved category.
    pub fn category(&self, name: &str) -> Option<&Category> {
        self.categories.get(name)
    }

    /// Names of all categories, sorted.
    pub fn category_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.categories.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// The audit sink binding, if configured.
    pub fn audit_sink(&self) -> Option<&SinkBinding> {
        self.audit.as_ref()
    }

    /// Metrics shared by every logger created from this configuration.
    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }
}

fn build_named<D, T>(
    descriptors: &[D],
    kind: &'static str,
    name_of: impl Fn(&D) -> &String,
    build: impl Fn(&D) -> Result<T, ConfigError>,
) -> Result<HashMap<String, T>, ConfigError> {
    let mut built = HashMap::with_capacity(descriptors.len());
    for descriptor in descriptors {
        let name = name_of(descriptor);
        if built.contains_key(name) {
            return Err(ConfigError::DuplicateName {
                kind,
                name: name.clone(),
            });
        }
        built.insert(name.clone(), build(descriptor)?);
    }
    Ok(built)
}

/// Builder for [`LoggingConfig`].
pub struct LoggingConfigBuilder {
    enabled: bool,
    minimum_level: Level,
    defaults: EntryDefaults,
    audit: Option<SinkBinding>,
    categories: Vec<(String, Vec<SinkBinding>, Option<ThrottlingRule>)>,
    clock: Arc<dyn Clock>,
}

impl Default for LoggingConfigBuilder {
    fn default() -> Self {
        Self {
            enabled: true,
            minimum_level: Level::default(),
            defaults: EntryDefaults::default(),
            audit: None,
            categories: Vec::new(),
            clock: Arc::new(SystemClock::new()),
        }
    }
}

impl LoggingConfigBuilder {
    /// Enable or disable logging globally.
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Set the minimum level.
    pub fn minimum_level(mut self, level: Level) -> Self {
        self.minimum_level = level;
        self
    }

    /// Set values for blank entry fields.
    pub fn defaults(mut self, defaults: EntryDefaults) -> Self {
        self.defaults = defaults;
        self
    }

    /// Set the audit sink.
    pub fn audit_sink(mut self, binding: SinkBinding) -> Self {
        self.audit = Some(binding);
        self
    }

    /// Set the clock used by throttling evaluators.
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Add a category.
    pub fn category(
        mut self,
        name: impl Into<String>,
        sinks: Vec<SinkBinding>,
        throttling_rule: Option<ThrottlingRule>,
    ) -> Self {
        self.categories.push((name.into(), sinks, throttling_rule));
        self
    }

    /// Validate and build the configuration.
    ///
    /// # Errors
    /// Returns `ConfigError::DuplicateName` if two categories share a name.
    pub fn build(self) -> Result<LoggingConfig, ConfigError> {
        let mut seen = HashSet::new();
        let mut categories = HashMap::with_capacity(self.categories.len());

        for (name, sinks, rule) in self.categories {
            if !seen.insert(name.clone()) {
                return Err(ConfigError::DuplicateName {
                    kind: "category",
                    name,
                });
            }
            let evaluator = rule.map(|rule| {
                Arc::new(ThrottlingEvaluator::with_clock(rule, Arc::clone(&self.clock)))
            });
            categories.insert(
                name.clone(),
                Category {
                    name,
                    sinks,
                    evaluator,
                },
            );
        }

        info!(
            categories = categories.len(),
            audit = self.audit.is_some(),
            "logging configuration resolved"
        );

        Ok(LoggingConfig {
            enabled: self.enabled,
            minimum_level: self.minimum_level,
            defaults: self.defaults,
            audit: self.audit,
            categories,
            metrics: Metrics::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entry::LogEntry;
    use crate::infrastructure::mocks::RecordingSink;

    fn descriptor() -> LoggingConfigDescriptor {
        LoggingConfigDescriptor {
            sinks: vec![SinkDescriptor {
                name: "console".into(),
                kind: TRACING_SINK_KIND.into(),
                settings: ComponentSettings::new(),
            }],
            formatters: vec![FormatterDescriptor {
                name: "plain".into(),
                kind: TEMPLATE_FORMATTER_KIND.into(),
                template: "{message}".into(),
                settings: ComponentSettings::new(),
            }],
            throttling_rules: vec![ThrottlingRuleDescriptor {
                name: "pairs".into(),
                min_interval_ms: 0,
                min_event_threshold: 2,
            }],
            categories: vec![CategoryDescriptor {
                name: "orders".into(),
                sinks: vec![BindingDescriptor {
                    sink: "console".into(),
                    formatter: "plain".into(),
                }],
                throttling_rule: Some("pairs".into()),
            }],
            ..LoggingConfigDescriptor::default()
        }
    }

    #[test]
    fn test_defaults_registry_kinds() {
        let registry = ComponentRegistry::with_defaults();
        assert_eq!(registry.sink_kinds(), vec!["tracing".to_string()]);
        assert_eq!(registry.formatter_kinds(), vec!["template".to_string()]);
    }

    #[test]
    fn test_resolve_valid_descriptor() {
        let config = LoggingConfig::resolve(&descriptor(), &ComponentRegistry::with_defaults())
            .unwrap();

        let category = config.category("orders").unwrap();
        assert_eq!(category.sinks().len(), 1);
        assert_eq!(category.sinks()[0].name(), "console");
        assert_eq!(category.throttling_rule().unwrap().name(), "pairs");
        assert_eq!(config.category_names(), vec!["orders"]);
    }

    #[test]
    fn test_unknown_sink_kind() {
        let mut descriptor = descriptor();
        descriptor.sinks[0].kind = "smtp".into();

        let error = LoggingConfig::resolve(&descriptor, &ComponentRegistry::with_defaults())
            .unwrap_err();
        assert!(matches!(error, ConfigError::UnknownSinkKind { ref kind, .. } if kind == "smtp"));
    }

    #[test]
    fn test_unknown_references() {
        let registry = ComponentRegistry::with_defaults();

        let mut d = descriptor();
        d.categories[0].sinks[0].sink = "file".into();
        assert!(matches!(
            LoggingConfig::resolve(&d, &registry),
            Err(ConfigError::UnknownSink { .. })
        ));

        let mut d = descriptor();
        d.categories[0].sinks[0].formatter = "fancy".into();
        assert!(matches!(
            LoggingConfig::resolve(&d, &registry),
            Err(ConfigError::UnknownFormatter { .. })
        ));

        let mut d = descriptor();
        d.categories[0].throttling_rule = Some("missing".into());
        assert!(matches!(
            LoggingConfig::resolve(&d, &registry),
            Err(ConfigError::UnknownThrottlingRule { .. })
        ));

        let mut d = descriptor();
        d.audit = Some(BindingDescriptor {
            sink: "nowhere".into(),
            formatter: "plain".into(),
        });
        assert!(matches!(
            LoggingConfig::resolve(&d, &registry),
            Err(ConfigError::UnknownSink { ref category, .. }) if category == "audit"
        ));
    }

    #[test]
    fn test_duplicate_names() {
        let registry = ComponentRegistry::with_defaults();

        let mut d = descriptor();
        d.sinks.push(d.sinks[0].clone());
        assert!(matches!(
            LoggingConfig::resolve(&d, &registry),
            Err(ConfigError::DuplicateName { kind: "sink", .. })
        ));

        let mut d = descriptor();
        d.categories.push(d.categories[0].clone());
        assert!(matches!(
            LoggingConfig::resolve(&d, &registry),
            Err(ConfigError::DuplicateName { kind: "category", .. })
        ));
    }

    #[test]
    fn test_unknown_category() {
        let config = LoggingConfig::resolve(&descriptor(), &ComponentRegistry::with_defaults())
            .unwrap();
        assert!(matches!(
            config.logger("billing"),
            Err(ConfigError::UnknownCategory(ref name)) if name == "billing"
        ));
    }

    #[test]
    fn test_custom_sink_kind() {
        let sink = RecordingSink::new();
        let shared = sink.clone();
        let mut registry = ComponentRegistry::with_defaults();
        registry.register_sink("memory", move |_| Ok(Arc::new(shared.clone()) as Arc<dyn Sink>));

        let mut d = descriptor();
        d.sinks[0].kind = "memory".into();
        d.categories[0].throttling_rule = None;
        let config = LoggingConfig::resolve(&d, &registry).unwrap();

        let logger = config.logger("orders").unwrap();
        futures::executor::block_on(logger.log(LogEntry::new(Level::Error, "sent"))).unwrap();
        assert_eq!(sink.records(), vec!["sent".to_string()]);
    }

    #[test]
    fn test_repeat_separator_setting() {
        let sink = RecordingSink::new();
        let shared = sink.clone();
        let mut registry = ComponentRegistry::with_defaults();
        registry.register_sink("memory", move |_| Ok(Arc::new(shared.clone()) as Arc<dyn Sink>));

        let mut d = descriptor();
        d.sinks[0].kind = "memory".into();
        d.formatters[0].template = "{extendedProperties({key}={value})}".into();
        d.formatters[0]
            .settings
            .insert(REPEAT_SEPARATOR_SETTING.into(), ", ".into());
        d.categories[0].throttling_rule = None;
        let config = LoggingConfig::resolve(&d, &registry).unwrap();

        let entry = LogEntry::new(Level::Error, "x")
            .with_property("a", "1")
            .with_property("b", "2");
        futures::executor::block_on(config.logger("orders").unwrap().log(entry)).unwrap();
        assert_eq!(sink.records(), vec!["a=1, b=2".to_string()]);
    }

    #[test]
    fn test_loggers_share_category_state() {
        let config = LoggingConfig::resolve(&descriptor(), &ComponentRegistry::with_defaults())
            .unwrap();
        let first = config.logger("orders").unwrap();
        let second = config.logger("orders").unwrap();

        let evaluator = config.category("orders").unwrap().evaluator().unwrap();
        futures::executor::block_on(first.log_message(Level::Error, "dup")).unwrap();
        futures::executor::block_on(second.log_message(Level::Error, "dup")).unwrap();

        assert_eq!(evaluator.tracked_keys(), 1);
        assert_eq!(config.metrics().entries_throttled(), 1);
        assert_eq!(config.metrics().entries_dispatched(), 1);
    }
}
