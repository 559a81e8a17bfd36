// src/error.rs

use std::fmt;

use crate::media::AcquireError;

/// Global Application Error Enum.
/// Centralizes every failure the attempt flow can surface to its caller.
#[derive(Debug)]
pub enum AppError {
    // Camera / microphone could not be acquired
    Acquisition(AcquireError),

    // Definition fetch failed or the definition is unusable (e.g. no selection bound)
    DefinitionLoad(String),

    // Action not allowed from the current step
    InvalidTransition(String),

    // Capture, encoding or detection failure
    Media(String),

    // Transport error or non-success HTTP status
    Network(String),

    // Lookup found nothing (e.g. no jotform with the requested name)
    NotFound(String),

    // Missing or malformed configuration
    Config(String),

    Internal(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl std::error::Error for AppError {}

impl AppError {
    /// Short user-facing message, used when the error becomes a notice.
    pub fn user_message(&self) -> String {
        match self {
            AppError::Acquisition(reason) => reason.user_message().to_string(),
            AppError::DefinitionLoad(msg)
            | AppError::InvalidTransition(msg)
            | AppError::Media(msg)
            | AppError::Network(msg)
            | AppError::NotFound(msg)
            | AppError::Config(msg)
            | AppError::Internal(msg) => msg.clone(),
        }
    }
}

impl From<AcquireError> for AppError {
    fn from(err: AcquireError) -> Self {
        AppError::Acquisition(err)
    }
}

/// Converts `reqwest::Error` into `AppError::Network`.
/// Allows using `?` operator on HTTP calls.
impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        AppError::Network(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<url::ParseError> for AppError {
    fn from(err: url::ParseError) -> Self {
        AppError::Config(err.to_string())
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::Config(err.to_string())
    }
}
