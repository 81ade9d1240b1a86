use crate::error::{CsrfError, Result};
use serde::{Deserialize, Serialize};
use std::env;

/// Default namespace for token names and request attributes
pub const DEFAULT_PREFIX: &str = "csrf";

/// Default maximum number of outstanding tokens per store
pub const DEFAULT_STORAGE_LIMIT: usize = 200;

/// Default bytes of entropy per token value
pub const DEFAULT_TOKEN_STRENGTH: usize = 16;

/// CSRF guard configuration
///
/// Deserializable from any serde format; missing fields take their defaults.
///
/// ```
/// use palisade_csrf::CsrfConfig;
///
/// let config: CsrfConfig = serde_json::from_str(r#"{"storage_limit": 50}"#).unwrap();
/// assert_eq!(config.prefix, "csrf");
/// assert_eq!(config.storage_limit, 50);
/// assert_eq!(config.token_strength, 16);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CsrfConfig {
    /// Namespace for stored token names and request attribute keys.
    /// Trailing underscores are stripped.
    pub prefix: String,

    /// Maximum number of token pairs kept in the store
    pub storage_limit: usize,

    /// Bytes of randomness per token value (hex encoded, so the value is
    /// twice as many characters)
    pub token_strength: usize,
}

impl Default for CsrfConfig {
    fn default() -> Self {
        Self {
            prefix: DEFAULT_PREFIX.to_string(),
            storage_limit: DEFAULT_STORAGE_LIMIT,
            token_strength: DEFAULT_TOKEN_STRENGTH,
        }
    }
}

impl CsrfConfig {
    /// Create a configuration with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from `PALISADE_CSRF_PREFIX`, `PALISADE_CSRF_STORAGE_LIMIT` and
    /// `PALISADE_CSRF_TOKEN_STRENGTH`, falling back to defaults
    pub fn from_env() -> Result<Self> {
        Self::from_vars(|key| env::var(key).ok())
    }

    /// Load through an arbitrary variable lookup
    pub fn from_vars<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(prefix) = lookup("PALISADE_CSRF_PREFIX") {
            config = config.with_prefix(prefix);
        }
        if let Some(limit) = lookup("PALISADE_CSRF_STORAGE_LIMIT") {
            config.storage_limit = parse_count("PALISADE_CSRF_STORAGE_LIMIT", &limit)?;
        }
        if let Some(strength) = lookup("PALISADE_CSRF_TOKEN_STRENGTH") {
            config.token_strength = parse_count("PALISADE_CSRF_TOKEN_STRENGTH", &strength)?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Set prefix
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = normalize_prefix(&prefix.into());
        self
    }

    /// Set storage limit
    pub fn with_storage_limit(mut self, limit: usize) -> Self {
        self.storage_limit = limit;
        self
    }

    /// Set token strength in bytes
    pub fn with_token_strength(mut self, bytes: usize) -> Self {
        self.token_strength = bytes;
        self
    }

    /// Copy with the prefix normalized, for configs built by deserialization
    pub fn normalized(mut self) -> Self {
        self.prefix = normalize_prefix(&self.prefix);
        self
    }

    /// Reject settings under which the guard cannot issue usable tokens
    pub fn validate(&self) -> Result<()> {
        if normalize_prefix(&self.prefix).is_empty() {
            return Err(CsrfError::Configuration(
                "prefix must contain at least one character besides '_'".to_string(),
            ));
        }
        if self.storage_limit == 0 {
            return Err(CsrfError::Configuration(
                "storage limit must be at least 1".to_string(),
            ));
        }
        if self.token_strength == 0 {
            return Err(CsrfError::Configuration(
                "token strength must be at least 1 byte".to_string(),
            ));
        }
        Ok(())
    }

    /// Request attribute and body field key carrying the token name
    pub fn name_key(&self) -> String {
        format!("{}_name", normalize_prefix(&self.prefix))
    }

    /// Request attribute and body field key carrying the token value
    pub fn value_key(&self) -> String {
        format!("{}_value", normalize_prefix(&self.prefix))
    }
}

fn normalize_prefix(prefix: &str) -> String {
    prefix.trim_end_matches('_').to_string()
}

fn parse_count(var: &str, raw: &str) -> Result<usize> {
    raw.trim()
        .parse()
        .map_err(|_| CsrfError::Configuration(format!("{} must be a positive integer, got '{}'", var, raw)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = CsrfConfig::new();
        assert_eq!(config.prefix, "csrf");
        assert_eq!(config.storage_limit, 200);
        assert_eq!(config.token_strength, 16);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_prefix_trailing_underscores_stripped() {
        let config = CsrfConfig::new().with_prefix("form__");
        assert_eq!(config.prefix, "form");
        assert_eq!(config.name_key(), "form_name");
        assert_eq!(config.value_key(), "form_value");
    }

    #[test]
    fn test_inner_underscores_kept() {
        let config = CsrfConfig::new().with_prefix("_my_app_");
        assert_eq!(config.prefix, "_my_app");
    }

    #[test]
    fn test_validate_rejects_zero_values() {
        assert!(CsrfConfig::new().with_storage_limit(0).validate().is_err());
        assert!(CsrfConfig::new().with_token_strength(0).validate().is_err());
        assert!(CsrfConfig::new().with_prefix("___").validate().is_err());
    }

    #[test]
    fn test_normalized_after_deserialize() {
        let config: CsrfConfig = serde_json::from_str(r#"{"prefix": "login_"}"#).unwrap();
        assert_eq!(config.prefix, "login_");
        assert_eq!(config.normalized().prefix, "login");
    }

    #[test]
    fn test_from_vars() {
        let config = CsrfConfig::from_vars(vars(&[
            ("PALISADE_CSRF_PREFIX", "api_"),
            ("PALISADE_CSRF_STORAGE_LIMIT", "10"),
            ("PALISADE_CSRF_TOKEN_STRENGTH", " 32 "),
        ]))
        .unwrap();

        assert_eq!(config.prefix, "api");
        assert_eq!(config.storage_limit, 10);
        assert_eq!(config.token_strength, 32);
    }

    #[test]
    fn test_from_vars_defaults_when_unset() {
        let config = CsrfConfig::from_vars(vars(&[])).unwrap();
        assert_eq!(config, CsrfConfig::default());
    }

    #[test]
    fn test_from_vars_rejects_garbage() {
        let err = CsrfConfig::from_vars(vars(&[("PALISADE_CSRF_STORAGE_LIMIT", "lots")]))
            .unwrap_err();
        assert!(err.to_string().contains("PALISADE_CSRF_STORAGE_LIMIT"));

        assert!(CsrfConfig::from_vars(vars(&[("PALISADE_CSRF_TOKEN_STRENGTH", "0")])).is_err());
    }
}
