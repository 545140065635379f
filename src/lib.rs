use thiserror::Error;

pub type Result<T> = std::result::Result<T, QaError>;

/// Failure taxonomy for a single pipeline invocation.
///
/// Persistence failures are deliberately absent: they are logged where they
/// occur and never surface to the caller.
#[derive(Error, Debug)]
pub enum QaError {
    #[error("Unable to extract text from the URL: {url}")]
    FetchFailed { url: String },

    #[error("No chunks available for retrieval")]
    EmptyCandidateSet,

    #[error("Embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Embedding model unavailable: {0}")]
    ModelUnavailable(String),

    #[error("Unable to generate an answer")]
    AnswerUnavailable,

    #[error("{stage} timed out after {seconds} seconds")]
    Timeout { stage: &'static str, seconds: u64 },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

pub mod commands;
pub mod config;
pub mod embeddings;
pub mod fetcher;
pub mod oracle;
pub mod pipeline;
pub mod queue;
pub mod retriever;
pub mod segmenter;
pub mod storage;
