use knowbot_section_splitter::SplitterError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum IndexerError {
    /// Nothing left to index after whitespace normalization
    #[error("Input text is empty")]
    ExtractionEmpty,

    #[error("Input is not valid UTF-8: {0}")]
    InvalidUtf8(#[from] std::str::Utf8Error),

    #[error("Splitter error: {0}")]
    Splitter(SplitterError),

    /// Every summary call of a build failed
    #[error("Language model unavailable: {0}")]
    LanguageModelUnavailable(String),

    #[error("Tree store error: {0}")]
    Store(#[from] knowbot_tree_store::TreeStoreError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl From<SplitterError> for IndexerError {
    fn from(err: SplitterError) -> Self {
        match err {
            SplitterError::EmptyInput => IndexerError::ExtractionEmpty,
            other => IndexerError::Splitter(other),
        }
    }
}

pub type Result<T> = std::result::Result<T, IndexerError>;
