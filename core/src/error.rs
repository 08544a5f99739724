use thiserror::Error;

/// Submitted review data that cannot be accepted.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InputError {
    #[error("missing required fields: {}", .0.join(", "))]
    MissingFields(Vec<&'static str>),
    #[error("invalid JSON: {0}")]
    InvalidJson(String),
}

/// Persistence failure in the review store or the cover directory.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage backend error: {0}")]
    Backend(#[from] sled::Error),
    #[error("row encoding error: {0}")]
    Encoding(#[from] bincode::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failure while vectorizing or scoring. Never surfaced to clients.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ComputationError {
    #[error("corpus contains no documents")]
    EmptyCorpus,
    #[error("empty vocabulary; documents contain only stop words")]
    EmptyVocabulary,
    #[error("non-finite similarity score for document {position}")]
    NonFinite { position: usize },
}
