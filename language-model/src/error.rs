use std::time::Duration;
use thiserror::Error;

/// Errors returned by language-model collaborators
#[derive(Debug, Error)]
pub enum LanguageModelError {
    /// Transport failure talking to the model endpoint
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Endpoint answered with a non-success status
    #[error("Model endpoint returned {status}: {body}")]
    Status { status: u16, body: String },

    /// Response did not have the expected JSON shape
    #[error("Malformed model response: {0}")]
    MalformedResponse(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// API key variable is unset or empty
    #[error("API key not found in environment variable {0}")]
    MissingApiKey(String),

    #[error("Model call timed out after {0:?}")]
    Timeout(Duration),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Language model error: {0}")]
    Other(String),
}

impl LanguageModelError {
    /// Whether the endpoint could not be reached or refused to serve the
    /// call, as opposed to answering with something unusable
    pub fn is_unreachable(&self) -> bool {
        matches!(
            self,
            LanguageModelError::Http(_)
                | LanguageModelError::Status { .. }
                | LanguageModelError::MissingApiKey(_)
                | LanguageModelError::Timeout(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, LanguageModelError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unreachable_classification() {
        assert!(
            LanguageModelError::Status {
                status: 503,
                body: String::new()
            }
            .is_unreachable()
        );
        assert!(LanguageModelError::MissingApiKey("OPENAI_API_KEY".to_string()).is_unreachable());
        assert!(LanguageModelError::Timeout(Duration::from_secs(1)).is_unreachable());
        assert!(!LanguageModelError::MalformedResponse("no choices".to_string()).is_unreachable());
        assert!(!LanguageModelError::Other("refused".to_string()).is_unreachable());
    }
}
