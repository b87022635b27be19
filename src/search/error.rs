//! Error types for search operations

use crate::error::AppError;

/// Result type for search operations
pub type SearchResult<T> = std::result::Result<T, SearchError>;

/// Errors that can occur during search operations
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    /// The engine could not be reached
    #[error("Search engine unavailable: {0}")]
    EngineUnavailable(String),

    /// The engine answered with a non-success status
    #[error("Search engine returned {status}: {body}")]
    EngineError { status: u16, body: String },

    /// The engine answered with a body we could not decode
    #[error("Invalid search response: {0}")]
    InvalidResponse(String),

    /// A caller-supplied filter was rejected before compilation
    #[error("Invalid filter: {0}")]
    InvalidFilter(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
}

impl From<reqwest::Error> for SearchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            SearchError::InvalidResponse(err.to_string())
        } else {
            SearchError::EngineUnavailable(err.to_string())
        }
    }
}

impl From<SearchError> for AppError {
    fn from(err: SearchError) -> Self {
        match err {
            SearchError::InvalidFilter(msg) => AppError::Validation(msg),
            SearchError::InvalidConfiguration(msg) => AppError::Configuration(msg),
            SearchError::EngineUnavailable(msg) => AppError::EngineUnavailable(msg),
            SearchError::EngineError { status, body } => AppError::Integration {
                integration_source: "elasticsearch".to_string(),
                message: format!("status {}: {}", status, body),
            },
            SearchError::InvalidResponse(msg) => AppError::Integration {
                integration_source: "elasticsearch".to_string(),
                message: msg,
            },
        }
    }
}
