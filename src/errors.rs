// src/errors.rs
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GraderError {
    #[error("Failed to read file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("Failed to parse TOML config: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Backend request failed with status {status}: {body}")]
    ApiError { status: u16, body: String },

    #[error("{0}")]
    Validation(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Job controller has been disposed")]
    Disposed,
}

impl GraderError {
    /// True for failures that came from talking to the backend.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            GraderError::Request(_) | GraderError::ApiError { .. } | GraderError::JsonParse(_)
        )
    }

    pub fn validation(message: impl Into<String>) -> Self {
        GraderError::Validation(message.into())
    }
}

pub type Result<T> = std::result::Result<T, GraderError>;
