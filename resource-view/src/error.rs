//! Error types and HTTP response conversion

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias using the view error
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for view construction
///
/// Every variant aborts the enclosing element or collection render; no
/// partial body is ever returned alongside an error.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(Box<figment::Error>),

    /// An input or option did not have the required shape
    #[error("Precondition failed: {0}")]
    Precondition(String),

    /// A key computation function failed
    #[error("Computation of key '{key}' failed: {source}")]
    Computation {
        /// Name of the key being computed
        key: String,
        /// Error raised by the computation
        #[source]
        source: anyhow::Error,
    },

    /// Rendering a nested element through the view registry failed
    #[error("Nested view for key '{key}' failed: {source}")]
    NestedView {
        /// Name of the key holding the nested resource
        key: String,
        /// Error raised by the nested render
        #[source]
        source: Box<Error>,
    },

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a precondition error
    pub fn precondition(message: impl Into<String>) -> Self {
        Self::Precondition(message.into())
    }

    /// Wrap a nested render failure with the key it was resolving
    pub fn nested(key: impl Into<String>, source: Error) -> Self {
        Self::NestedView {
            key: key.into(),
            source: Box::new(source),
        }
    }

    /// Check whether the error was caused by caller input rather than a failure
    pub fn is_precondition(&self) -> bool {
        match self {
            Self::Precondition(_) => true,
            Self::NestedView { source, .. } => source.is_precondition(),
            _ => false,
        }
    }
}

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::Config(Box::new(err))
    }
}

/// Error response body
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error message
    pub error: String,

    /// Optional error code
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,

    /// HTTP status code
    pub status: u16,
}

impl ErrorResponse {
    /// Create a new error response
    pub fn new(status: StatusCode, error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            code: None,
            status: status.as_u16(),
        }
    }

    /// Create error response with a code
    pub fn with_code(
        status: StatusCode,
        code: impl Into<String>,
        error: impl Into<String>,
    ) -> Self {
        Self {
            error: error.into(),
            code: Some(code.into()),
            status: status.as_u16(),
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            Error::Config(_) => (StatusCode::INTERNAL_SERVER_ERROR, "CONFIG_ERROR"),
            e if e.is_precondition() => (StatusCode::BAD_REQUEST, "PRECONDITION_FAILED"),
            Error::Computation { key, .. } => {
                tracing::error!(key = %key, "View computation failed: {}", self);
                (StatusCode::INTERNAL_SERVER_ERROR, "COMPUTATION_FAILED")
            }
            Error::NestedView { key, .. } => {
                tracing::error!(key = %key, "Nested view failed: {}", self);
                (StatusCode::INTERNAL_SERVER_ERROR, "NESTED_VIEW_FAILED")
            }
            _ => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        };

        let body = ErrorResponse::with_code(status, code, self.to_string());
        (status, Json(body)).into_response()
    }
}
