//! Sink that forwards formatted entries into `tracing`.
//!
//! Lets an application route dispatched log text through whatever
//! `tracing-subscriber` stack it already runs.

use crate::application::error::{ConfigError, SinkError};
use crate::application::ports::Sink;
use async_trait::async_trait;
use std::collections::BTreeMap;
use tracing::Level;

/// Setting naming the `tracing` level events are emitted at.
pub const LEVEL_SETTING: &str = "level";

/// Emits each delivered text as one `tracing` event.
///
/// Events carry the sink name in a `sink` field and the text as the message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TracingSink {
    name: String,
    level: Level,
}

impl TracingSink {
    /// Create a sink emitting at `level`.
    pub fn new(name: impl Into<String>, level: Level) -> Self {
        Self {
            name: name.into(),
            level,
        }
    }

    /// Build a sink from configuration settings.
    ///
    /// `level` accepts `tracing` level names (`trace` .. `error`, any case)
    /// and defaults to `info`.
    pub fn from_settings(
        name: impl Into<String>,
        settings: &BTreeMap<String, String>,
    ) -> Result<Self, ConfigError> {
        let name = name.into();
        let level = match settings.get(LEVEL_SETTING) {
            Some(raw) => raw
                .parse::<Level>()
                .map_err(|e| ConfigError::InvalidSettings {
                    component: name.clone(),
                    message: format!("{LEVEL_SETTING} {raw:?}: {e}"),
                })?,
            None => Level::INFO,
        };
        Ok(Self::new(name, level))
    }

    /// The sink name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The level events are emitted at.
    pub fn level(&self) -> Level {
        self.level
    }
}

#[async_trait]
impl Sink for TracingSink {
    async fn deliver(&self, text: &str) -> Result<(), SinkError> {
        let sink = self.name.as_str();
        if self.level == Level::ERROR {
            tracing::error!(sink, "{text}");
        } else if self.level == Level::WARN {
            tracing::warn!(sink, "{text}");
        } else if self.level == Level::INFO {
            tracing::info!(sink, "{text}");
        } else if self.level == Level::DEBUG {
            tracing::debug!(sink, "{text}");
        } else {
            tracing::trace!(sink, "{text}");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::mocks::MockCaptureLayer;
    use tracing_subscriber::layer::SubscriberExt;

    #[test]
    fn test_from_settings_defaults_to_info() {
        let sink = TracingSink::from_settings("console", &BTreeMap::new()).unwrap();
        assert_eq!(sink.level(), Level::INFO);
    }

    #[test]
    fn test_from_settings_parses_level() {
        let settings = BTreeMap::from([(LEVEL_SETTING.to_string(), "WARN".to_string())]);
        let sink = TracingSink::from_settings("console", &settings).unwrap();
        assert_eq!(sink.level(), Level::WARN);
    }

    #[test]
    fn test_from_settings_rejects_unknown_level() {
        let settings = BTreeMap::from([(LEVEL_SETTING.to_string(), "loud".to_string())]);
        let result = TracingSink::from_settings("console", &settings);
        assert!(matches!(result, Err(ConfigError::InvalidSettings { .. })));
    }

    #[tokio::test]
    async fn test_deliver_emits_event() {
        let capture = MockCaptureLayer::new();
        let subscriber = tracing_subscriber::registry().with(capture.clone());
        let _guard = tracing::subscriber::set_default(subscriber);

        let sink = TracingSink::new("console", Level::WARN);
        sink.deliver("disk almost full").await.unwrap();

        let events = capture.with_message("disk almost full");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].level, Level::WARN);
        assert_eq!(events[0].field("sink"), Some("console"));
    }
}
