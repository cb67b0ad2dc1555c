//! Error types and handling
//!
//! UI-facing error type and the serializable response handed to controls.

use crate::recorder::RecordingError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Application-wide error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Microphone is in use: {0}")]
    Busy(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Recording error: {0}")]
    Recording(String),

    #[error("Upload error: {0}")]
    Upload(String),

    #[error("Persistence error: {0}")]
    Persistence(String),
}

impl From<RecordingError> for AppError {
    fn from(error: RecordingError) -> Self {
        match error {
            RecordingError::Busy { active } => AppError::Busy(format!(
                "finish the recording for '{}' first",
                active
            )),
            RecordingError::PermissionDenied(message) => AppError::PermissionDenied(message),
            RecordingError::Upload(e) => AppError::Upload(e.to_string()),
            RecordingError::Persistence(e) => AppError::Persistence(e.to_string()),
            other => AppError::Recording(other.to_string()),
        }
    }
}

/// Error response for frontend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
}

impl From<AppError> for ErrorResponse {
    fn from(error: AppError) -> Self {
        let code = match &error {
            AppError::Io(_) => "IO_ERROR",
            AppError::Serialization(_) => "SERIALIZATION_ERROR",
            AppError::Config(_) => "CONFIG_ERROR",
            AppError::Busy(_) => "BUSY",
            AppError::PermissionDenied(_) => "PERMISSION_DENIED",
            AppError::Recording(_) => "RECORDING_ERROR",
            AppError::Upload(_) => "UPLOAD_ERROR",
            AppError::Persistence(_) => "PERSISTENCE_ERROR",
        };

        ErrorResponse {
            code: code.to_string(),
            message: error.to_string(),
        }
    }
}

/// Result type alias using AppError
pub type AppResult<T> = Result<T, AppError>;
