use thiserror::Error;

#[derive(Error, Debug)]
pub enum RetrievalError {
    #[error("Tree store error: {0}")]
    Store(#[from] knowbot_tree_store::TreeStoreError),

    #[error("Query too short: minimum {min} characters, got {actual}")]
    QueryTooShort { min: usize, actual: usize },

    #[error("Confidence threshold must be within 0-100, got {0}")]
    InvalidThreshold(u8),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, RetrievalError>;
