use anyhow::{Context, Result};
use knowbot_language_model::LanguageModelConfig;
use knowbot_tree_indexer::IndexerConfig;
use knowbot_tree_retrieval::RetrievalConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// File looked up in the working directory when `--config` is not given
pub const DEFAULT_CONFIG_FILE: &str = "knowbot.toml";

/// Contents of `knowbot.toml`. Every table is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CliConfig {
    /// Directory of the JSON tree store
    #[serde(default)]
    pub store_dir: Option<PathBuf>,

    #[serde(default)]
    pub language_model: LanguageModelConfig,

    #[serde(default)]
    pub indexer: IndexerConfig,

    #[serde(default)]
    pub retrieval: RetrievalConfig,
}

impl CliConfig {
    /// Load `path`, or `knowbot.toml` from the working directory when it
    /// exists. An explicit path that cannot be read is an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => {
                let candidate = PathBuf::from(DEFAULT_CONFIG_FILE);
                if !candidate.is_file() {
                    return Ok(Self::default());
                }
                candidate
            }
        };

        let raw = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        Self::parse(&raw).with_context(|| format!("Invalid config {}", path.display()))
    }

    pub fn parse(raw: &str) -> Result<Self> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.language_model
            .validate()
            .map_err(|err| anyhow::anyhow!("[language_model] {err}"))?;
        self.indexer
            .validate()
            .map_err(|err| anyhow::anyhow!("[indexer] {err}"))?;
        self.retrieval
            .validate()
            .map_err(|err| anyhow::anyhow!("[retrieval] {err}"))?;
        Ok(())
    }

    /// Store directory: flag, then config file, then the user data dir
    pub fn resolve_store_dir(&self, flag: Option<PathBuf>) -> PathBuf {
        flag.or_else(|| self.store_dir.clone())
            .unwrap_or_else(default_store_dir)
    }
}

pub fn default_store_dir() -> PathBuf {
    dirs::data_dir()
        .map(|dir| dir.join("knowbot").join("trees"))
        .unwrap_or_else(|| PathBuf::from(".knowbot").join("trees"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_empty_file_gives_defaults() {
        let config = CliConfig::parse("").unwrap();
        assert_eq!(config, CliConfig::default());
    }

    #[test]
    fn test_partial_tables() {
        let config = CliConfig::parse(
            r#"
store_dir = "/var/lib/knowbot"

[language_model]
model = "gpt-4o"

[retrieval]
default_confidence_threshold = 75
max_results = 4
"#,
        )
        .unwrap();

        assert_eq!(config.store_dir, Some(PathBuf::from("/var/lib/knowbot")));
        assert_eq!(config.language_model.model, "gpt-4o");
        assert_eq!(config.language_model.api_key_env, "OPENAI_API_KEY");
        assert_eq!(config.retrieval.default_confidence_threshold, 75);
        assert_eq!(config.retrieval.max_results, 4);
        assert_eq!(config.retrieval.max_depth, RetrievalConfig::default().max_depth);
        assert_eq!(config.indexer, IndexerConfig::default());
    }

    #[test]
    fn test_invalid_values_rejected() {
        let err = CliConfig::parse("[retrieval]\nmax_depth = 0\n").unwrap_err();
        assert!(err.to_string().contains("[retrieval]"));
    }

    #[test]
    fn test_store_dir_precedence() {
        let config = CliConfig {
            store_dir: Some(PathBuf::from("from-file")),
            ..Default::default()
        };
        assert_eq!(
            config.resolve_store_dir(Some(PathBuf::from("from-flag"))),
            PathBuf::from("from-flag")
        );
        assert_eq!(config.resolve_store_dir(None), PathBuf::from("from-file"));
    }
}
