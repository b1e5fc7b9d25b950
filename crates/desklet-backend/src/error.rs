//! Structured backend errors delivered through the response channel.

use std::fmt;

use serde::{Serialize, Serializer};

/// Machine-readable error code. Callers distinguish transport failures
/// from backend-reported errors only by this code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorCode {
    /// The widget has no backend configuration.
    NoBackend,
    /// The backend process could not be spawned.
    BackendStart,
    /// The process terminated while the request was outstanding.
    BackendExit,
    /// Generic unavailability.
    BackendFailure,
    /// A code reported by the backend itself, carried verbatim.
    Remote(String),
}

impl ErrorCode {
    pub fn as_str(&self) -> &str {
        match self {
            ErrorCode::NoBackend => "E_NO_BACKEND",
            ErrorCode::BackendStart => "E_BACKEND_START",
            ErrorCode::BackendExit => "E_BACKEND_EXIT",
            ErrorCode::BackendFailure => "E_BACKEND_FAILURE",
            ErrorCode::Remote(code) => code,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for ErrorCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[error("{code}: {message}")]
pub struct BackendError {
    pub code: ErrorCode,
    pub message: String,
}

impl BackendError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn no_backend(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::NoBackend, message)
    }

    pub fn start(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::BackendStart, message)
    }

    pub fn exit(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::BackendExit, message)
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::BackendFailure, message)
    }

    /// JSON shape handed to widget content: `{"code": .., "message": ..}`.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "code": self.code.as_str(),
            "message": self.message,
        })
    }
}
