use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Highest confidence a judge can assign
pub const MAX_CONFIDENCE: u8 = 100;

/// Configuration for reasoning-guided retrieval
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Threshold used when the caller does not pass one (0 - 100)
    #[serde(default = "default_confidence_threshold")]
    pub default_confidence_threshold: u8,

    /// Maximum number of tree levels judged per query
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,

    /// Maximum number of sections returned
    #[serde(default = "default_max_results")]
    pub max_results: usize,

    /// Candidates presented to the judge in one call
    #[serde(default = "default_judge_batch_size")]
    pub judge_batch_size: usize,

    /// Per-call judge timeout in seconds
    #[serde(default = "default_judge_timeout_secs")]
    pub judge_timeout_secs: u64,

    /// Minimum query length in characters, after trimming
    #[serde(default = "default_min_query_length")]
    pub min_query_length: usize,

    /// Enable caching of retrieval results
    #[serde(default = "default_true")]
    pub enable_cache: bool,

    /// Cache size (number of queries to cache)
    #[serde(default = "default_cache_size")]
    pub cache_size: usize,
}

fn default_confidence_threshold() -> u8 {
    60
}

fn default_max_depth() -> usize {
    8
}

fn default_max_results() -> usize {
    8
}

fn default_judge_batch_size() -> usize {
    24
}

fn default_judge_timeout_secs() -> u64 {
    20
}

fn default_min_query_length() -> usize {
    2
}

fn default_true() -> bool {
    true
}

fn default_cache_size() -> usize {
    128
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            default_confidence_threshold: default_confidence_threshold(),
            max_depth: default_max_depth(),
            max_results: default_max_results(),
            judge_batch_size: default_judge_batch_size(),
            judge_timeout_secs: default_judge_timeout_secs(),
            min_query_length: default_min_query_length(),
            enable_cache: true,
            cache_size: default_cache_size(),
        }
    }
}

impl RetrievalConfig {
    pub fn judge_timeout(&self) -> Duration {
        Duration::from_secs(self.judge_timeout_secs)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.default_confidence_threshold > MAX_CONFIDENCE {
            return Err(format!(
                "default_confidence_threshold must be in [0, 100], got {}",
                self.default_confidence_threshold
            ));
        }

        if self.max_depth == 0 {
            return Err("max_depth must be > 0".to_string());
        }

        if self.max_results == 0 {
            return Err("max_results must be > 0".to_string());
        }

        if self.judge_batch_size == 0 {
            return Err("judge_batch_size must be > 0".to_string());
        }

        if self.judge_timeout_secs == 0 {
            return Err("judge_timeout_secs must be > 0".to_string());
        }

        if self.enable_cache && self.cache_size == 0 {
            return Err("cache_size must be > 0 when the cache is enabled".to_string());
        }

        Ok(())
    }

    /// Fewer, more confident sections
    pub fn precise() -> Self {
        Self {
            default_confidence_threshold: 75,
            max_results: 4,
            ..Default::default()
        }
    }

    /// More sections, looser threshold
    pub fn broad() -> Self {
        Self {
            default_confidence_threshold: 40,
            max_results: 16,
            max_depth: 10,
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_default_config_valid() {
        let config = RetrievalConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.judge_timeout(), Duration::from_secs(20));
    }

    #[test]
    fn test_validation() {
        let mut config = RetrievalConfig::default();
        config.default_confidence_threshold = 101;
        assert!(config.validate().is_err());

        let mut config = RetrievalConfig::default();
        config.max_depth = 0;
        assert!(config.validate().is_err());

        let mut config = RetrievalConfig::default();
        config.cache_size = 0;
        assert!(config.validate().is_err());
        config.enable_cache = false;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_preset_configs() {
        assert!(RetrievalConfig::precise().validate().is_ok());
        assert!(RetrievalConfig::broad().validate().is_ok());
        assert!(
            RetrievalConfig::precise().default_confidence_threshold
                > RetrievalConfig::broad().default_confidence_threshold
        );
    }
}
