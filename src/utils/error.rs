// src/utils/error.rs

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

pub type EngineResult<T> = Result<T, EngineError>;

/// Custom error details for additional context
pub type ErrorDetails = HashMap<String, serde_json::Value>;

/// Main error type for the revenue engine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineError {
    pub message: String,
    pub details: Option<Box<ErrorDetails>>, // Boxed to keep the struct small
    pub error_code: Option<String>,
    pub kind: ErrorKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    #[default]
    UnknownError,
    DatabaseError,
    ValidationError,
    ConfigurationError,
    SerializationError,
    NotFoundError,
    ProcessingError,
    ExternalServiceError,
    StorageError,
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for EngineError {}

impl EngineError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            details: None,
            error_code: None,
            kind,
        }
    }

    pub fn with_details(mut self, details: ErrorDetails) -> Self {
        self.details = Some(Box::new(details));
        self
    }

    pub fn with_code(mut self, error_code: impl Into<String>) -> Self {
        self.error_code = Some(error_code.into());
        self
    }

    // Convenience constructors for common error types
    pub fn database_error(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::DatabaseError, message).with_code("DATABASE_ERROR")
    }

    pub fn validation_error(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ValidationError, message).with_code("VALIDATION_ERROR")
    }

    pub fn configuration_error(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ConfigurationError, message).with_code("CONFIG_ERROR")
    }

    pub fn serialization_error(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::SerializationError, message).with_code("SERIALIZATION_ERROR")
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFoundError, message).with_code("NOT_FOUND")
    }

    pub fn processing_error(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ProcessingError, message).with_code("PROCESSING_ERROR")
    }

    pub fn external_service_error(service: &str, message: impl Into<String>) -> Self {
        let mut details = ErrorDetails::new();
        details.insert(
            "service".to_string(),
            serde_json::Value::String(service.to_string()),
        );
        Self::new(ErrorKind::ExternalServiceError, message)
            .with_code("EXTERNAL_SERVICE_ERROR")
            .with_details(details)
    }

    pub fn storage_error(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::StorageError, message).with_code("STORAGE_ERROR")
    }
}

impl From<serde_json::Error> for EngineError {
    fn from(err: serde_json::Error) -> Self {
        EngineError::serialization_error(err.to_string())
    }
}
