//! Export configuration.
//!
//! Configuration is loaded from environment variables with defaults that
//! match the metadata read API's limits.

use permission_engine::Category;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::retry::RetryConfig;

/// Configuration errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Invalid configuration value.
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue {
        /// Configuration key.
        key: String,
        /// Error message.
        message: String,
    },
}

impl ConfigError {
    fn invalid(key: &str, message: impl Into<String>) -> Self {
        ConfigError::InvalidValue {
            key: key.to_string(),
            message: message.into(),
        }
    }
}

/// Which report sections to emit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IncludedComponents {
    /// Every category.
    #[default]
    All,
    /// Only the listed categories.
    Only(Vec<Category>),
}

impl IncludedComponents {
    /// Parse `all` or a comma-separated list of category API names.
    ///
    /// # Example
    ///
    /// ```
    /// use permission_engine::Category;
    /// use permission_export::IncludedComponents;
    ///
    /// let parsed = IncludedComponents::parse("objectPermissions, fieldPermissions").unwrap();
    /// assert!(parsed.includes(Category::FieldPermissions));
    /// assert!(!parsed.includes(Category::TabSettings));
    /// ```
    pub fn parse(s: &str) -> Result<Self, ConfigError> {
        let mut categories = Vec::new();
        for part in s.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            if part.eq_ignore_ascii_case("all") {
                return Ok(IncludedComponents::All);
            }
            let category = Category::parse(part).ok_or_else(|| {
                ConfigError::invalid("included_components", format!("unknown component `{}`", part))
            })?;
            if !categories.contains(&category) {
                categories.push(category);
            }
        }
        Ok(IncludedComponents::Only(categories))
    }

    /// Check if a category's section should be emitted.
    pub fn includes(&self, category: Category) -> bool {
        match self {
            IncludedComponents::All => true,
            IncludedComponents::Only(categories) => categories.contains(&category),
        }
    }
}

/// Configuration for an export run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportConfig {
    /// Maximum names per metadata read call.
    pub read_chunk_size: usize,

    /// Maximum store calls in flight at once.
    pub max_concurrency: usize,

    /// Report sections to emit.
    pub included_components: IncludedComponents,

    /// Retry behavior for store calls.
    pub retry: RetryConfig,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            read_chunk_size: 10,
            max_concurrency: 4,
            included_components: IncludedComponents::All,
            retry: RetryConfig::default(),
        }
    }
}

impl ExportConfig {
    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `PERMISSION_EXPORT_CHUNK_SIZE`: names per read call (default: 10)
    /// - `PERMISSION_EXPORT_MAX_CONCURRENCY`: store calls in flight (default: 4)
    /// - `PERMISSION_EXPORT_COMPONENTS`: `all` or a comma list of categories (default: all)
    /// - `PERMISSION_EXPORT_MAX_RETRIES`: attempts per store call (default: 3)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through a variable lookup function.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let default = Self::default();

        let included_components = match lookup("PERMISSION_EXPORT_COMPONENTS") {
            Some(value) => IncludedComponents::parse(&value)?,
            None => default.included_components,
        };

        Ok(Self {
            read_chunk_size: lookup("PERMISSION_EXPORT_CHUNK_SIZE")
                .and_then(|s| s.parse().ok())
                .unwrap_or(default.read_chunk_size),
            max_concurrency: lookup("PERMISSION_EXPORT_MAX_CONCURRENCY")
                .and_then(|s| s.parse().ok())
                .unwrap_or(default.max_concurrency),
            included_components,
            retry: RetryConfig {
                max_attempts: lookup("PERMISSION_EXPORT_MAX_RETRIES")
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(default.retry.max_attempts),
                ..default.retry
            },
        })
    }

    /// Replace the included components.
    pub fn with_components(mut self, components: IncludedComponents) -> Self {
        self.included_components = components;
        self
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.read_chunk_size == 0 {
            return Err(ConfigError::invalid("read_chunk_size", "must be at least 1"));
        }
        if self.max_concurrency == 0 {
            return Err(ConfigError::invalid("max_concurrency", "must be at least 1"));
        }
        if self.retry.max_attempts == 0 {
            return Err(ConfigError::invalid("retry.max_attempts", "must be at least 1"));
        }
        if let Err(message) = self.retry.validate() {
            return Err(ConfigError::invalid("retry.exponential_base", message));
        }
        if matches!(&self.included_components, IncludedComponents::Only(c) if c.is_empty()) {
            return Err(ConfigError::invalid("included_components", "no components selected"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = ExportConfig::default();
        assert_eq!(config.read_chunk_size, 10);
        assert_eq!(config.max_concurrency, 4);
        assert_eq!(config.included_components, IncludedComponents::All);
        assert_eq!(config.retry.max_attempts, 3);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_lookup_overrides() {
        let config = ExportConfig::from_lookup(lookup(&[
            ("PERMISSION_EXPORT_CHUNK_SIZE", "5"),
            ("PERMISSION_EXPORT_MAX_CONCURRENCY", "2"),
            ("PERMISSION_EXPORT_COMPONENTS", "userPermissions,tabSettings"),
            ("PERMISSION_EXPORT_MAX_RETRIES", "1"),
        ]))
        .unwrap();

        assert_eq!(config.read_chunk_size, 5);
        assert_eq!(config.max_concurrency, 2);
        assert_eq!(
            config.included_components,
            IncludedComponents::Only(vec![Category::UserPermissions, Category::TabSettings])
        );
        assert_eq!(config.retry.max_attempts, 1);
    }

    #[test]
    fn test_unparsable_numbers_fall_back_to_defaults() {
        let config =
            ExportConfig::from_lookup(lookup(&[("PERMISSION_EXPORT_CHUNK_SIZE", "lots")])).unwrap();
        assert_eq!(config.read_chunk_size, 10);
    }

    #[test]
    fn test_unknown_component_is_rejected() {
        let err = ExportConfig::from_lookup(lookup(&[("PERMISSION_EXPORT_COMPONENTS", "widgets")]))
            .unwrap_err();
        assert!(err.to_string().contains("widgets"));
    }

    #[test]
    fn test_components_parse() {
        assert_eq!(IncludedComponents::parse("all").unwrap(), IncludedComponents::All);
        assert_eq!(
            IncludedComponents::parse("objectPermissions,all").unwrap(),
            IncludedComponents::All
        );
        assert_eq!(
            IncludedComponents::parse("flowAccesses, flowAccesses").unwrap(),
            IncludedComponents::Only(vec![Category::FlowAccesses])
        );
        assert_eq!(IncludedComponents::parse("").unwrap(), IncludedComponents::Only(vec![]));
    }

    #[test]
    fn test_validate() {
        let mut config = ExportConfig::default();
        config.read_chunk_size = 0;
        assert!(config.validate().is_err());

        let mut config = ExportConfig::default();
        config.max_concurrency = 0;
        assert!(config.validate().is_err());

        let config = ExportConfig::default().with_components(IncludedComponents::Only(vec![]));
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_shrinking_backoff() {
        let mut config = ExportConfig::default();
        config.retry.exponential_base = -2.0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("retry.exponential_base"));

        config.retry.exponential_base = f64::NAN;
        assert!(config.validate().is_err());

        config.retry.exponential_base = 1.0;
        assert!(config.validate().is_ok());
    }
}
