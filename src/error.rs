//! Error types for ProofHub.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

/// Top-level error type for the platform core.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("Precondition failed: {0}")]
    Precondition(#[from] PreconditionFailed),

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("External service error: {0}")]
    External(#[from] ExternalServiceError),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// A single violated field in a step submission.
#[derive(Debug, Clone, Serialize)]
pub struct FieldViolation {
    pub field: &'static str,
    pub message: String,
}

/// Malformed or missing step input. Carries every violated field, not just
/// the first, so the client can correct the whole form in one pass.
#[derive(Debug, Clone, thiserror::Error)]
pub struct ValidationError {
    pub violations: Vec<FieldViolation>,
}

impl ValidationError {
    pub fn new(violations: Vec<FieldViolation>) -> Self {
        Self { violations }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let fields: Vec<&str> = self.violations.iter().map(|v| v.field).collect();
        write!(
            f,
            "{} invalid field(s): {}",
            self.violations.len(),
            fields.join(", ")
        )
    }
}

/// A step was attempted out of order — recoverable by completing the
/// missing prior step.
#[derive(Debug, Clone, thiserror::Error)]
pub enum PreconditionFailed {
    #[error("Session has no founder yet — complete the founder step first")]
    FounderMissing,

    #[error("Session has no venture yet — complete the venture step first")]
    VentureMissing,

    #[error("Session has no document upload yet — complete the upload step first")]
    UploadMissing,

    #[error("Session is already associated with a different founder")]
    FounderAlreadyAssociated,
}

/// External collaborator failures (scoring, storage, notifications).
#[derive(Debug, thiserror::Error)]
pub enum ExternalServiceError {
    #[error("Scoring request failed: {reason}")]
    ScoringFailed { reason: String },

    #[error("Scoring request timed out after {secs}s")]
    ScoringTimeout { secs: u64 },

    #[error("Vault storage request failed: {reason}")]
    StorageFailed { reason: String },

    #[error("Vault storage is not configured")]
    StorageDisabled,

    #[error("Notification delivery failed: {reason}")]
    NotifyFailed { reason: String },

    #[error("Invalid response from {service}: {reason}")]
    InvalidResponse { service: &'static str, reason: String },
}

/// Persistence-layer errors — fatal to the request, not retried.
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error("Connection error: {0}")]
    Pool(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("IO error: {0}")]
    Io(String),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

impl Error {
    /// Machine-readable error kind for the response envelope.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation_error",
            Self::Precondition(_) => "precondition_failed",
            Self::NotFound { .. } => "not_found",
            Self::External(_) => "external_service_error",
            Self::Database(_) => "persistence_error",
            Self::Config(_) => "config_error",
        }
    }

    fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Precondition(_) => StatusCode::CONFLICT,
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::External(_) => StatusCode::BAD_GATEWAY,
            Self::Database(_) | Self::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for Error {
    /// Uniform error envelope: `{"status":"error","error":{...}}`.
    fn into_response(self) -> Response {
        let mut error = serde_json::json!({
            "kind": self.kind(),
            "message": self.to_string(),
        });
        if let Self::Validation(ref v) = self {
            error["violations"] = serde_json::to_value(&v.violations).unwrap_or_default();
        }
        let body = serde_json::json!({ "status": "error", "error": error });
        (self.status_code(), Json(body)).into_response()
    }
}

/// Result type alias for the platform core.
pub type Result<T> = std::result::Result<T, Error>;
