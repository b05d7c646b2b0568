use knowbot_section_splitter::SplitterConfig;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for tree index builds
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexerConfig {
    /// Section splitting configuration
    #[serde(default)]
    pub splitter: SplitterConfig,

    /// Maximum summary calls in flight per build
    #[serde(default = "default_max_concurrent_summaries")]
    pub max_concurrent_summaries: usize,

    /// Per-call summary timeout in seconds
    #[serde(default = "default_summary_timeout_secs")]
    pub summary_timeout_secs: u64,

    /// Length of the truncated-content summary used when a call fails
    #[serde(default = "default_fallback_summary_chars")]
    pub fallback_summary_chars: usize,

    /// Leaf text beyond this many characters is cut before summarizing
    #[serde(default = "default_max_summary_input_chars")]
    pub max_summary_input_chars: usize,

    /// Fail the build when no summary call reached the model
    #[serde(default = "default_true")]
    pub abort_if_model_unreachable: bool,
}

fn default_max_concurrent_summaries() -> usize {
    num_cpus::get()
}

fn default_summary_timeout_secs() -> u64 {
    30
}

fn default_fallback_summary_chars() -> usize {
    240
}

fn default_max_summary_input_chars() -> usize {
    12_000
}

fn default_true() -> bool {
    true
}

impl Default for IndexerConfig {
    fn default() -> Self {
        Self {
            splitter: SplitterConfig::default(),
            max_concurrent_summaries: default_max_concurrent_summaries(),
            summary_timeout_secs: default_summary_timeout_secs(),
            fallback_summary_chars: default_fallback_summary_chars(),
            max_summary_input_chars: default_max_summary_input_chars(),
            abort_if_model_unreachable: true,
        }
    }
}

impl IndexerConfig {
    pub fn summary_timeout(&self) -> Duration {
        Duration::from_secs(self.summary_timeout_secs)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.max_concurrent_summaries == 0 {
            return Err("max_concurrent_summaries must be > 0".to_string());
        }

        if self.summary_timeout_secs == 0 {
            return Err("summary_timeout_secs must be > 0".to_string());
        }

        if self.fallback_summary_chars < 16 {
            return Err("fallback_summary_chars must be at least 16".to_string());
        }

        if self.max_summary_input_chars < self.splitter.max_leaf_chars {
            return Err(format!(
                "max_summary_input_chars ({}) must not be below splitter.max_leaf_chars ({})",
                self.max_summary_input_chars, self.splitter.max_leaf_chars
            ));
        }

        self.splitter.validate()?;

        Ok(())
    }
}
