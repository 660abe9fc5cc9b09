//! Error types for the policy verdict service
//!
//! One taxonomy for the whole crate. Every variant maps to exactly one HTTP
//! status so route handlers never decide status codes on their own.

use hyper::StatusCode;
use serde_json::json;

/// Main error type for prediction, suggestion and history operations
#[derive(Debug, thiserror::Error)]
pub enum PolicyError {
    /// Required request keys are absent or null
    #[error("Faltan campos requeridos: {}", .0.join(", "))]
    MissingFields(Vec<String>),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Same message whether the record is absent or owned by someone else
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    /// The classifier could not score a well-formed feature record
    #[error("Inference error: {0}")]
    Inference(String),

    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl PolicyError {
    /// Build a missing-fields error from static field names
    pub fn missing(fields: &[&str]) -> Self {
        Self::MissingFields(fields.iter().map(|f| f.to_string()).collect())
    }

    /// Convert error to HTTP status code
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::MissingFields(_) => StatusCode::BAD_REQUEST,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Inference(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::StorageUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// JSON body sent to the caller
    ///
    /// Server-side faults are reported with a generic message; the detail
    /// only goes to the log.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::MissingFields(fields) => json!({
                "error": "Faltan campos requeridos",
                "campos": fields,
            }),
            Self::BadRequest(msg)
            | Self::Unauthorized(msg)
            | Self::NotFound(msg)
            | Self::Conflict(msg) => json!({ "error": msg }),
            Self::Inference(_) => json!({ "error": "No se pudo evaluar la política" }),
            Self::StorageUnavailable(_) => json!({ "error": "Almacenamiento no disponible" }),
            Self::Config(_) | Self::Internal(_) => json!({ "error": "Error interno del servidor" }),
        }
    }

    /// Convert to status code and body tuple for HTTP response
    pub fn into_status_code_and_body(self) -> (StatusCode, String) {
        let status = self.status_code();
        let body = self.to_json().to_string();
        (status, body)
    }
}

// Implement From conversions for common error types

impl From<std::io::Error> for PolicyError {
    fn from(err: std::io::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

impl From<serde_json::Error> for PolicyError {
    fn from(err: serde_json::Error) -> Self {
        Self::BadRequest(format!("JSON error: {}", err))
    }
}

impl From<hyper::Error> for PolicyError {
    fn from(err: hyper::Error) -> Self {
        Self::Internal(format!("HTTP error: {}", err))
    }
}

impl From<mongodb::error::Error> for PolicyError {
    fn from(err: mongodb::error::Error) -> Self {
        Self::StorageUnavailable(err.to_string())
    }
}

impl From<jsonwebtoken::errors::Error> for PolicyError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        Self::Unauthorized(format!("JWT error: {}", err))
    }
}

impl From<csv::Error> for PolicyError {
    fn from(err: csv::Error) -> Self {
        Self::Config(format!("Corpus error: {}", err))
    }
}

/// Result type alias for policy verdict operations
pub type Result<T> = std::result::Result<T, PolicyError>;
