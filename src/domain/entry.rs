//! Structured log entries.
//!
//! A `LogEntry` is created at log-call time, mutated in place by enrichment and
//! throttling, rendered by formatters and then dropped once dispatch completes.

use crate::domain::level::Level;
use crate::domain::throttling_key::ThrottlingKey;
use chrono::{DateTime, Utc};
use std::error::Error;

/// Ordered string map for extended properties.
///
/// Iteration follows insertion order. Inserting a key that already exists
/// replaces its value without moving it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtendedProperties {
    entries: Vec<(String, String)>,
}

impl ExtendedProperties {
    /// Create an empty property map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a property, returning the previous value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, existing)) => Some(std::mem::replace(existing, value)),
            None => {
                self.entries.push((key, value));
                None
            }
        }
    }

    /// Look up a property value.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Remove a property, returning its value.
    pub fn remove(&mut self, key: &str) -> Option<String> {
        let index = self.entries.iter().position(|(k, _)| k == key)?;
        Some(self.entries.remove(index).1)
    }

    /// Check whether a property exists.
    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Iterate over properties in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Number of properties.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether there are no properties.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for ExtendedProperties
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut properties = ExtendedProperties::new();
        for (key, value) in iter {
            properties.insert(key, value);
        }
        properties
    }
}

/// A single structured log record.
#[derive(Debug, Clone, PartialEq)]
pub struct LogEntry {
    pub message: String,
    pub application_id: String,
    pub application_user_id: String,
    pub create_time: DateTime<Utc>,
    pub environment: String,
    pub machine_name: String,
    pub level: Level,
    pub exception_type: String,
    pub exception_details: String,
    pub exception_context: String,
    pub extended_properties: ExtendedProperties,
    pub unique_id: String,
}

impl LogEntry {
    /// Create an entry stamped with the current UTC time and a fresh unique id.
    pub fn new(level: Level, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            application_id: String::new(),
            application_user_id: String::new(),
            create_time: Utc::now(),
            environment: String::new(),
            machine_name: String::new(),
            level,
            exception_type: String::new(),
            exception_details: String::new(),
            exception_context: String::new(),
            extended_properties: ExtendedProperties::new(),
            unique_id: uuid::Uuid::new_v4().to_string(),
        }
    }

    /// Add or replace an extended property.
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extended_properties.insert(key, value);
        self
    }

    /// Set the exception type and details.
    pub fn with_exception(
        mut self,
        exception_type: impl Into<String>,
        details: impl Into<String>,
    ) -> Self {
        self.exception_type = exception_type.into();
        self.exception_details = details.into();
        self
    }

    /// Fill the exception fields from an error value.
    ///
    /// The type is the Rust type name of `E`, the details are its `Display`
    /// output and the context is its `source()` chain, one cause per line.
    pub fn with_error<E>(mut self, error: &E) -> Self
    where
        E: Error + ?Sized,
    {
        self.exception_type = std::any::type_name::<E>().to_string();
        self.exception_details = error.to_string();

        let mut causes = Vec::new();
        let mut source = error.source();
        while let Some(cause) = source {
            causes.push(cause.to_string());
            source = cause.source();
        }
        self.exception_context = causes.join("\n");
        self
    }

    /// Override the creation timestamp.
    pub fn with_create_time(mut self, create_time: DateTime<Utc>) -> Self {
        self.create_time = create_time;
        self
    }

    /// Set the id of the application user on whose behalf this entry is logged.
    pub fn with_application_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.application_user_id = user_id.into();
        self
    }

    /// Compute the throttling key for this entry.
    ///
    /// Recomputed on every call so that enrichment changes are reflected.
    pub fn throttling_key(&self) -> ThrottlingKey {
        ThrottlingKey::for_entry(self)
    }
}
