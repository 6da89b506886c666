//! Error types and handling
//!
//! Application-level error that wraps the module errors.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::delivery::DeliveryError;
use crate::recorder::RecordingError;
use crate::storage::StorageError;

/// Application-wide error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Recording error: {0}")]
    Recording(#[from] RecordingError),

    #[error("Delivery error: {0}")]
    Delivery(#[from] DeliveryError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Error response for the frontend
#[derive(Debug, Serialize, Deserialize)]
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
            AppError::Recording(RecordingError::Capture(_)) => "CAPTURE_DENIED",
            AppError::Recording(_) => "RECORDING_ERROR",
            AppError::Delivery(DeliveryError::Upload(_)) => "UPLOAD_FAILED",
            AppError::Delivery(_) => "DELIVERY_ERROR",
            AppError::Storage(_) => "STORAGE_ERROR",
        };

        ErrorResponse {
            code: code.to_string(),
            message: error.to_string(),
        }
    }
}

/// Result type alias using AppError
pub type AppResult<T> = Result<T, AppError>;
