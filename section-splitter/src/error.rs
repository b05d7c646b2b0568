use thiserror::Error;

/// Errors that can occur while splitting a document
#[derive(Debug, Error)]
pub enum SplitterError {
    /// Input is empty or whitespace only
    #[error("Input text is empty")]
    EmptyInput,

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}
