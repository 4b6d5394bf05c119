use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Malformed maintenance task: {0}")]
    MalformedTask(String),

    #[error("Unknown index field: {0}")]
    UnknownField(String),

    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("Content store failure: {0}")]
    ContentStore(String),

    #[error("Index '{index}': could not acquire writer: {reason}")]
    WriterAcquisitionFailed { index: String, reason: String },

    #[error("Index '{index}': streaming failed: {reason}")]
    StreamingFailed { index: String, reason: String },

    #[error("Index '{index}': backend unavailable: {reason}")]
    BackendUnavailable { index: String, reason: String },
}

impl Error {
    pub fn streaming(index: &str, reason: impl ToString) -> Self {
        Error::StreamingFailed { index: index.to_string(), reason: reason.to_string() }
    }

    pub fn unavailable(index: &str, reason: impl ToString) -> Self {
        Error::BackendUnavailable { index: index.to_string(), reason: reason.to_string() }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
