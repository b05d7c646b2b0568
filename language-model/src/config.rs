use crate::error::{LanguageModelError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for the OpenAI-compatible model client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LanguageModelConfig {
    /// API base URL, without the `/chat/completions` suffix
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Model name sent with every request
    #[serde(default = "default_model")]
    pub model: String,

    /// Environment variable holding the bearer token
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// Per-request timeout in seconds
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Section text beyond this many characters is cut before prompting
    #[serde(default = "default_max_input_chars")]
    pub max_input_chars: usize,
}

fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_temperature() -> f32 {
    0.0
}

fn default_max_input_chars() -> usize {
    12_000
}

impl Default for LanguageModelConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            model: default_model(),
            api_key_env: default_api_key_env(),
            request_timeout_secs: default_request_timeout_secs(),
            temperature: default_temperature(),
            max_input_chars: default_max_input_chars(),
        }
    }
}

impl LanguageModelConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Full URL of the chat completions endpoint
    pub fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }

    /// Read the API key from the configured environment variable
    pub fn api_key(&self) -> Result<String> {
        match std::env::var(&self.api_key_env) {
            Ok(key) if !key.trim().is_empty() => Ok(key.trim().to_string()),
            _ => Err(LanguageModelError::MissingApiKey(self.api_key_env.clone())),
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> std::result::Result<(), String> {
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(format!("base_url must be an http(s) URL, got {}", self.base_url));
        }

        if self.model.trim().is_empty() {
            return Err("model must not be empty".into());
        }

        if self.request_timeout_secs == 0 {
            return Err("request_timeout_secs must be greater than 0".into());
        }

        if !(0.0..=2.0).contains(&self.temperature) {
            return Err("temperature must be between 0.0 and 2.0".into());
        }

        if self.max_input_chars < 256 {
            return Err("max_input_chars must be at least 256".into());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_default_config() {
        let config = LanguageModelConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(
            config.completions_url(),
            "https://api.openai.com/v1/chat/completions"
        );
        assert_eq!(config.request_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_trailing_slash_in_base_url() {
        let config = LanguageModelConfig {
            base_url: "http://localhost:8080/v1/".to_string(),
            ..Default::default()
        };
        assert_eq!(
            config.completions_url(),
            "http://localhost:8080/v1/chat/completions"
        );
    }

    #[test]
    fn test_partial_toml_like_input_uses_defaults() {
        let config: LanguageModelConfig =
            serde_json::from_str(r#"{"model": "local-llm"}"#).expect("deserialize");
        assert_eq!(config.model, "local-llm");
        assert_eq!(config.api_key_env, "OPENAI_API_KEY");
        assert_eq!(config.max_input_chars, 12_000);
    }

    #[test]
    fn test_invalid_config() {
        let config = LanguageModelConfig {
            base_url: "ftp://example.com".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = LanguageModelConfig {
            temperature: 3.5,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_missing_api_key() {
        let config = LanguageModelConfig {
            api_key_env: "KNOWBOT_TEST_KEY_THAT_IS_NEVER_SET".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            config.api_key(),
            Err(LanguageModelError::MissingApiKey(name)) if name == "KNOWBOT_TEST_KEY_THAT_IS_NEVER_SET"
        ));
    }
}
