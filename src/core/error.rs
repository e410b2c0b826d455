//! Typed error handling for the admin data-access layer
//!
//! Every fallible operation in the crate returns [`AdminError`], split by
//! category so callers can react to the cases they care about (a missing
//! record, a rejected filter) and forward the rest.
//!
//! # Error Categories
//!
//! - [`StorageError`]: the backend rejected the call or could not be reached
//! - [`ResourceError`]: the addressed record does not exist
//! - [`ValidationError`]: the request was malformed before reaching the backend
//! - [`ConfigError`]: configuration parsing and validation
//!
//! # Example
//!
//! ```rust,ignore
//! match facade.get_one("amenities", "42").await {
//!     Ok(record) => println!("{record}"),
//!     Err(AdminError::Resource(ResourceError::NotFound { id, .. })) => {
//!         println!("amenity {id} is gone");
//!     }
//!     Err(e) => return Err(e),
//! }
//! ```

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

/// The main error type for the admin data-access layer
#[derive(Debug, Error)]
pub enum AdminError {
    /// Backend and transport errors
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Record-level errors
    #[error(transparent)]
    Resource(#[from] ResourceError),

    /// Request validation errors
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Configuration errors
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Error response structure for HTTP responses
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error code for programmatic handling
    pub code: String,
    /// Human-readable error message
    pub message: String,
    /// Optional additional details
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl AdminError {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            AdminError::Storage(e) => e.status_code(),
            AdminError::Resource(e) => e.status_code(),
            AdminError::Validation(_) => StatusCode::BAD_REQUEST,
            AdminError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the error code for this error
    pub fn error_code(&self) -> &'static str {
        match self {
            AdminError::Storage(e) => e.error_code(),
            AdminError::Resource(e) => e.error_code(),
            AdminError::Validation(e) => e.error_code(),
            AdminError::Config(_) => "CONFIG_ERROR",
        }
    }

    /// Whether this error means the addressed record does not exist
    pub fn is_not_found(&self) -> bool {
        matches!(self, AdminError::Resource(ResourceError::NotFound { .. }))
    }

    /// Convert to an error response
    pub fn to_response(&self) -> ErrorResponse {
        ErrorResponse {
            code: self.error_code().to_string(),
            message: self.to_string(),
            details: self.details(),
        }
    }

    fn details(&self) -> Option<Value> {
        match self {
            AdminError::Storage(StorageError::Backend {
                status,
                code,
                details,
                hint,
                ..
            }) => Some(serde_json::json!({
                "status": status,
                "code": code,
                "details": details,
                "hint": hint,
            })),
            AdminError::Resource(ResourceError::NotFound { resource, id }) => {
                Some(serde_json::json!({ "resource": resource, "id": id }))
            }
            _ => None,
        }
    }
}

impl IntoResponse for AdminError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(self.to_response());
        (status, body).into_response()
    }
}

// =============================================================================
// Storage Errors
// =============================================================================

/// Errors raised by the remote backend or on the way to it
#[derive(Debug, Error)]
pub enum StorageError {
    /// The backend answered with an error status
    #[error("backend error ({status}): {message}")]
    Backend {
        status: u16,
        code: Option<String>,
        message: String,
        details: Option<String>,
        hint: Option<String>,
    },

    /// The request never produced a response
    #[error("transport error: {message}")]
    Transport { message: String },

    /// The backend answered with a body of an unexpected shape
    #[error("unexpected response shape: {message}")]
    UnexpectedShape { message: String },

    /// The backend cannot serve requests right now
    #[error("storage backend '{backend}' is unavailable: {message}")]
    Unavailable { backend: String, message: String },
}

impl StorageError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            // Surface client-side rejections (RLS denial, constraint violation)
            // with their own status; everything else is an upstream failure.
            StorageError::Backend { status, .. } => match StatusCode::from_u16(*status) {
                Ok(code) if code.is_client_error() => code,
                _ => StatusCode::BAD_GATEWAY,
            },
            StorageError::Transport { .. } => StatusCode::BAD_GATEWAY,
            StorageError::UnexpectedShape { .. } => StatusCode::BAD_GATEWAY,
            StorageError::Unavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            StorageError::Backend { .. } => "BACKEND_ERROR",
            StorageError::Transport { .. } => "BACKEND_UNREACHABLE",
            StorageError::UnexpectedShape { .. } => "BACKEND_UNEXPECTED_SHAPE",
            StorageError::Unavailable { .. } => "BACKEND_UNAVAILABLE",
        }
    }
}

impl From<reqwest::Error> for StorageError {
    fn from(err: reqwest::Error) -> Self {
        StorageError::Transport {
            message: err.to_string(),
        }
    }
}

impl From<reqwest::Error> for AdminError {
    fn from(err: reqwest::Error) -> Self {
        AdminError::Storage(err.into())
    }
}

// =============================================================================
// Resource Errors
// =============================================================================

/// Errors about a single addressed record
#[derive(Debug, Error)]
pub enum ResourceError {
    /// No record with this identifier
    #[error("{resource} with id '{id}' not found")]
    NotFound { resource: String, id: String },
}

impl ResourceError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ResourceError::NotFound { .. } => StatusCode::NOT_FOUND,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            ResourceError::NotFound { .. } => "RECORD_NOT_FOUND",
        }
    }
}

// =============================================================================
// Validation Errors
// =============================================================================

/// Errors in a request detected before it reaches the backend
#[derive(Debug, Error)]
pub enum ValidationError {
    /// Filter operator outside the supported set
    #[error("unsupported filter operator '{operator}' on field '{field}'")]
    UnsupportedOperator { field: String, operator: String },

    /// Sort direction other than asc/desc
    #[error("invalid sort order '{order}' on field '{field}'")]
    InvalidSortOrder { field: String, order: String },

    /// Resource name that cannot be used as a table or route name
    #[error("invalid resource name '{resource}'")]
    InvalidResource { resource: String },

    /// Field name that cannot be used as a column reference
    #[error("invalid field name '{field}'")]
    InvalidField { field: String },

    /// Column projection that cannot be forwarded
    #[error("invalid selection '{selection}'")]
    InvalidSelection { selection: String },

    /// Mutation missing an id or payload, or carrying one it must not
    #[error("invalid {operation} request: {message}")]
    InvalidMutation { operation: String, message: String },

    /// Malformed JSON in a request parameter
    #[error("invalid JSON: {message}")]
    InvalidJson { message: String },
}

impl ValidationError {
    pub fn error_code(&self) -> &'static str {
        match self {
            ValidationError::UnsupportedOperator { .. } => "UNSUPPORTED_FILTER_OPERATOR",
            ValidationError::InvalidSortOrder { .. } => "INVALID_SORT_ORDER",
            ValidationError::InvalidResource { .. } => "INVALID_RESOURCE",
            ValidationError::InvalidField { .. } => "INVALID_FIELD",
            ValidationError::InvalidSelection { .. } => "INVALID_SELECTION",
            ValidationError::InvalidMutation { .. } => "INVALID_MUTATION",
            ValidationError::InvalidJson { .. } => "INVALID_JSON",
        }
    }
}

impl From<serde_json::Error> for AdminError {
    fn from(err: serde_json::Error) -> Self {
        AdminError::Validation(ValidationError::InvalidJson {
            message: err.to_string(),
        })
    }
}

// =============================================================================
// Config Errors
// =============================================================================

/// Errors related to configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to parse configuration
    #[error("failed to parse config{}: {message}", .file.as_ref().map(|f| format!(" file '{f}'")).unwrap_or_default())]
    ParseError {
        file: Option<String>,
        message: String,
    },

    /// Invalid value in configuration
    #[error("invalid value '{value}' for field '{field}': {message}")]
    InvalidValue {
        field: String,
        value: String,
        message: String,
    },

    /// IO error while reading configuration
    #[error("IO error: {message}")]
    IoError { message: String },
}

// =============================================================================
// Result type alias
// =============================================================================

/// A specialized Result type for admin operations
pub type AdminResult<T> = Result<T, AdminError>;
