use thiserror::Error;

#[derive(Error, Debug)]
pub enum LocaleFillError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse source document {document}: {reason}")]
    CorpusParseError { document: String, reason: String },

    #[error("Completion service error: {0}")]
    ServiceError(String),

    #[error("Completion service timed out after {seconds}s")]
    ServiceTimeout { seconds: u64 },

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Checkpoint error: {0}")]
    CheckpointError(String),

    #[error("Session not found: {0}")]
    SessionNotFound(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("HTTP request error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("File not found: {0}")]
    FileNotFound(String),
}

impl LocaleFillError {
    /// Errors that end a run but leave the accumulated translations usable.
    pub fn is_round_failure(&self) -> bool {
        matches!(
            self,
            LocaleFillError::ServiceError(_)
                | LocaleFillError::ServiceTimeout { .. }
                | LocaleFillError::HttpError(_)
                | LocaleFillError::MalformedResponse(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, LocaleFillError>;
