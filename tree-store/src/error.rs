use thiserror::Error;

/// Errors that can occur during tree store operations
#[derive(Debug, Error)]
pub enum TreeStoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Bot or source id that cannot be used as a storage key
    #[error("Invalid key {0:?}: use letters, digits, '-', '_' or '.'")]
    InvalidKey(String),
}

pub type Result<T> = std::result::Result<T, TreeStoreError>;
