use serde::{Deserialize, Serialize};

/// Configuration for section splitting
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitterConfig {
    /// Target leaf size in characters (soft limit)
    #[serde(default = "default_target_leaf_chars")]
    pub target_leaf_chars: usize,

    /// Maximum leaf size in characters (hard limit)
    #[serde(default = "default_max_leaf_chars")]
    pub max_leaf_chars: usize,

    /// Pieces shorter than this are merged with their neighbour when the
    /// hard limit allows it
    #[serde(default = "default_min_leaf_chars")]
    pub min_leaf_chars: usize,

    /// Deepest marker nesting kept as tree structure
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,

    /// Upper bound on structural markers honoured for one document
    #[serde(default = "default_max_sections")]
    pub max_sections: usize,

    /// Nodes with more children are regrouped under synthetic parents
    #[serde(default = "default_max_children")]
    pub max_children: usize,

    /// Markers needed before a structure kind counts as detected
    #[serde(default = "default_min_markers")]
    pub min_markers: usize,

    #[serde(default)]
    pub strategy: SplittingStrategy,
}

/// Strategy for splitting documents
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SplittingStrategy {
    /// Structure when detected, length-bounded otherwise, oversized
    /// sections refined with length splitting
    #[default]
    Adaptive,

    /// Structure when detected, sections kept whole
    StructureOnly,

    /// Ignore markers, length-bounded pieces only
    LengthOnly,
}

fn default_target_leaf_chars() -> usize {
    1500
}

fn default_max_leaf_chars() -> usize {
    2000
}

fn default_min_leaf_chars() -> usize {
    200
}

fn default_max_depth() -> usize {
    6
}

fn default_max_sections() -> usize {
    2000
}

fn default_max_children() -> usize {
    16
}

fn default_min_markers() -> usize {
    2
}

impl Default for SplitterConfig {
    fn default() -> Self {
        Self {
            target_leaf_chars: default_target_leaf_chars(),
            max_leaf_chars: default_max_leaf_chars(),
            min_leaf_chars: default_min_leaf_chars(),
            max_depth: default_max_depth(),
            max_sections: default_max_sections(),
            max_children: default_max_children(),
            min_markers: default_min_markers(),
            strategy: SplittingStrategy::Adaptive,
        }
    }
}

impl SplitterConfig {
    /// Smaller leaves: cheaper summaries, more judge work
    pub fn small() -> Self {
        Self {
            target_leaf_chars: 800,
            max_leaf_chars: 1000,
            min_leaf_chars: 100,
            ..Default::default()
        }
    }

    /// Larger leaves: more context per accepted section
    pub fn large() -> Self {
        Self {
            target_leaf_chars: 3000,
            max_leaf_chars: 4000,
            min_leaf_chars: 400,
            ..Default::default()
        }
    }

    /// Ignore headings entirely
    pub fn length_only() -> Self {
        Self {
            strategy: SplittingStrategy::LengthOnly,
            ..Default::default()
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.min_leaf_chars >= self.target_leaf_chars {
            return Err("min_leaf_chars must be less than target_leaf_chars".into());
        }

        if self.target_leaf_chars > self.max_leaf_chars {
            return Err("target_leaf_chars must not exceed max_leaf_chars".into());
        }

        if self.max_depth == 0 {
            return Err("max_depth must be greater than 0".into());
        }

        if self.max_sections == 0 {
            return Err("max_sections must be greater than 0".into());
        }

        if self.max_children < 2 {
            return Err("max_children must be at least 2".into());
        }

        if self.min_markers == 0 {
            return Err("min_markers must be greater than 0".into());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_default_config_is_valid() {
        let config = SplitterConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.strategy, SplittingStrategy::Adaptive);
    }

    #[test]
    fn test_presets_are_valid() {
        assert!(SplitterConfig::small().validate().is_ok());
        assert!(SplitterConfig::large().validate().is_ok());
        assert!(SplitterConfig::length_only().validate().is_ok());
        assert!(
            SplitterConfig::small().target_leaf_chars
                < SplitterConfig::default().target_leaf_chars
        );
    }

    #[test]
    fn test_invalid_config() {
        let mut config = SplitterConfig::default();
        config.min_leaf_chars = 5000;
        assert!(config.validate().is_err());

        let mut config = SplitterConfig::default();
        config.max_children = 1;
        assert!(config.validate().is_err());
    }
}
