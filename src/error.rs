use thiserror::Error;

/// Application error type
#[derive(Debug, Error)]
pub enum AppError {
    #[error("executable '{executable}' is already tracked by '{existing}'")]
    AlreadyExists { executable: String, existing: String },

    #[error("{entity} not found")]
    NotFound { entity: &'static str },

    #[error("Invalid {field}: {reason}")]
    InvalidInput { field: &'static str, reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("File watch error: {0}")]
    Watch(#[from] notify::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl AppError {
    /// True when the error is a rejected duplicate rule
    pub fn is_conflict(&self) -> bool {
        matches!(self, AppError::AlreadyExists { .. })
    }
}
