//! Lifecycle contract shared by all pluggable indexing components.
//!
//! Sources, processors and destinations all implement [`IndexingComponent`].
//! The orchestrator configures them once, initialises the ones that ask for it
//! and closes every one of them exactly once when the job ends.

use std::collections::BTreeMap;

use async_trait::async_trait;
use thiserror::Error;

/// Errors raised while configuring, initialising or closing a component.
#[derive(Error, Debug)]
pub enum ComponentError {
    /// A required parameter is missing.
    #[error("Missing parameter: {0}")]
    MissingParameter(String),

    /// A parameter value could not be parsed or is out of range.
    #[error("Invalid value for parameter '{key}': {reason}")]
    InvalidParameter { key: String, reason: String },

    /// The component failed to initialise.
    #[error("Initialisation error: {0}")]
    InitialisationError(String),

    /// The component is used before it was initialised.
    #[error("Component '{0}' is not initialised")]
    NotInitialised(String),

    /// IO error while acquiring or releasing a resource.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl ComponentError {
    /// Create a missing parameter error.
    pub fn missing(key: impl Into<String>) -> Self {
        Self::MissingParameter(key.into())
    }

    /// Create an invalid parameter error.
    pub fn invalid(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            key: key.into(),
            reason: reason.into(),
        }
    }

    /// Create an initialisation error.
    pub fn initialisation(msg: impl Into<String>) -> Self {
        Self::InitialisationError(msg.into())
    }
}

/// Parameters of a single component.
///
/// Parameters are `key -> optional value` pairs; a key given without a value
/// (e.g. `trimLine` in `LineBasedEntityIterator,trimLine`) counts as a set flag.
/// The typed accessors validate values and fail fast with
/// [`ComponentError::InvalidParameter`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ComponentConfig {
    params: BTreeMap<String, Option<String>>,
}

impl ComponentConfig {
    /// Create an empty configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a single `Name,key:value,flag` entry into the component name and its parameters.
    pub fn parse_entry(entry: &str) -> (String, Self) {
        let mut parts = entry.split(',');
        let name = parts.next().unwrap_or_default().trim().to_string();
        let mut config = Self::new();
        for part in parts {
            let part = part.trim();
            if part.is_empty() {
                continue;
            }
            match part.split_once(':') {
                Some((key, value)) => config.insert(key.trim(), Some(value.to_string())),
                None => config.insert(part, None),
            }
        }
        (name, config)
    }

    /// Builder style variant of [`ComponentConfig::insert`] for a key with a value.
    pub fn with(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.insert(key, Some(value.to_string()));
        self
    }

    /// Builder style variant of [`ComponentConfig::insert`] for a flag without value.
    pub fn with_flag(mut self, key: impl Into<String>) -> Self {
        self.insert(key, None);
        self
    }

    /// Set a parameter.
    pub fn insert(&mut self, key: impl Into<String>, value: Option<String>) {
        self.params.insert(key.into(), value);
    }

    /// Whether the key is present (with or without a value).
    pub fn contains(&self, key: &str) -> bool {
        self.params.contains_key(key)
    }

    /// Whether no parameter is set.
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Iterate over all parameters.
    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&str>)> {
        self.params.iter().map(|(k, v)| (k.as_str(), v.as_deref()))
    }

    /// Raw string value of a parameter.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.params.get(key).and_then(|v| v.as_deref())
    }

    /// Raw string value of a required parameter.
    pub fn require_str(&self, key: &str) -> Result<&str, ComponentError> {
        self.get_str(key)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| ComponentError::missing(key))
    }

    /// Boolean value of a parameter. A key without value is `true`.
    pub fn get_bool(&self, key: &str) -> Result<Option<bool>, ComponentError> {
        match self.params.get(key) {
            None => Ok(None),
            Some(None) => Ok(Some(true)),
            Some(Some(value)) => value
                .trim()
                .parse::<bool>()
                .map(Some)
                .map_err(|e| ComponentError::invalid(key, e.to_string())),
        }
    }

    /// Unsigned integer value of a parameter.
    pub fn get_usize(&self, key: &str) -> Result<Option<usize>, ComponentError> {
        self.parse_value(key)
    }

    /// Floating point value of a parameter.
    pub fn get_f64(&self, key: &str) -> Result<Option<f64>, ComponentError> {
        let value: Option<f64> = self.parse_value(key)?;
        match value {
            Some(v) if !v.is_finite() => Err(ComponentError::invalid(key, "value must be finite")),
            other => Ok(other),
        }
    }

    fn parse_value<T>(&self, key: &str) -> Result<Option<T>, ComponentError>
    where
        T: std::str::FromStr,
        T::Err: std::fmt::Display,
    {
        match self.get_str(key) {
            None => Ok(None),
            Some(value) => value
                .trim()
                .parse::<T>()
                .map(Some)
                .map_err(|e| ComponentError::invalid(key, format!("'{}': {}", value, e))),
        }
    }
}

impl<K, V> FromIterator<(K, V)> for ComponentConfig
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut config = Self::new();
        for (key, value) in iter {
            config.insert(key, Some(value.into()));
        }
        config
    }
}

/// Contract implemented by every pluggable source, processor and destination.
///
/// All methods have defaults so parameterless, stateless components only need
/// an empty `impl`.
#[async_trait]
pub trait IndexingComponent: Send + Sync {
    /// Name used in log output.
    fn name(&self) -> &str {
        let full = std::any::type_name::<Self>();
        full.rsplit("::").next().unwrap_or(full)
    }

    /// Apply component parameters. Called once, before initialisation.
    fn configure(&mut self, _config: &ComponentConfig) -> Result<(), ComponentError> {
        Ok(())
    }

    /// Whether [`IndexingComponent::initialise`] must be called before use.
    fn needs_initialisation(&self) -> bool {
        false
    }

    /// Acquire resources (open files, connect, preload data).
    async fn initialise(&mut self) -> Result<(), ComponentError> {
        Ok(())
    }

    /// Release resources. Must be safe to call even if initialisation failed.
    async fn close(&mut self) -> Result<(), ComponentError> {
        Ok(())
    }
}
