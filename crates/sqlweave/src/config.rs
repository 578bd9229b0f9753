//! Eager-load configuration.

use serde::Deserialize;

/// Tuning for [`EagerLoader`](crate::EagerLoader).
///
/// Deserializable from any serde format; missing fields take their defaults.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct EagerLoadConfig {
    /// Deepest spec nesting accepted (`a.b.c` is depth 3)
    pub max_depth: usize,
    /// Threshold for slow query logging in milliseconds
    pub slow_query_threshold_ms: u64,
    /// Drop repeated parent keys before building the IN list
    pub dedupe_keys: bool,
}

impl Default for EagerLoadConfig {
    fn default() -> Self {
        Self {
            max_depth: 8,
            slow_query_threshold_ms: 1000, // 1 second
            dedupe_keys: true,
        }
    }
}

impl EagerLoadConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    pub fn slow_query_threshold_ms(mut self, threshold_ms: u64) -> Self {
        self.slow_query_threshold_ms = threshold_ms;
        self
    }

    pub fn dedupe_keys(mut self, dedupe: bool) -> Self {
        self.dedupe_keys = dedupe;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = EagerLoadConfig::default();
        assert_eq!(config.max_depth, 8);
        assert_eq!(config.slow_query_threshold_ms, 1000);
        assert!(config.dedupe_keys);
    }

    #[test]
    fn test_config_builder() {
        let config = EagerLoadConfig::new().max_depth(2).dedupe_keys(false);
        assert_eq!(config.max_depth, 2);
        assert!(!config.dedupe_keys);
        assert_eq!(config.slow_query_threshold_ms, 1000);
    }

    #[test]
    fn test_config_partial_json() {
        let config: EagerLoadConfig = serde_json::from_str(r#"{"max_depth": 3}"#).unwrap();
        assert_eq!(config.max_depth, 3);
        assert_eq!(config.slow_query_threshold_ms, 1000);
        assert!(config.dedupe_keys);
    }
}
