//! The protocol error taxonomy and its wire encoding.
//!
//! Every failure a server can report to a client is one of four kinds. The
//! set is closed: adding a fifth kind is a protocol change, not a bug fix.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Classification of a protocol-level failure, closed per the UM-Bridge 1.0
/// wire contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    /// Caller-attributable: malformed body, wrong dimension, out-of-range
    /// index, or a required feature flag was false.
    InvalidInput,
    /// The named model exists but does not support the invoked operation.
    UnsupportedFeature,
    /// `name` is not in the server's model registry.
    ModelNotFound,
    /// The model's implementation returned data violating its declared
    /// shapes; server-attributable.
    InvalidOutput,
}

impl ErrorKind {
    /// HTTP status this error kind maps to.
    #[must_use]
    pub const fn http_status(self) -> u16 {
        match self {
            Self::InvalidInput | Self::UnsupportedFeature | Self::ModelNotFound => 400,
            Self::InvalidOutput => 500,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::InvalidInput => "InvalidInput",
            Self::UnsupportedFeature => "UnsupportedFeature",
            Self::ModelNotFound => "ModelNotFound",
            Self::InvalidOutput => "InvalidOutput",
        };
        f.write_str(s)
    }
}

/// The `{"error": {...}}` body a server sends on a non-2xx response.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorBody {
    #[serde(rename = "type")]
    pub kind: ErrorKind,
    pub message: String,
}

impl ErrorBody {
    #[must_use]
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Top-level wire envelope for a failed operation response.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

/// A protocol-taxonomy error, carrying its kind and an explanatory message.
///
/// This is the type servers construct while validating a request and
/// clients reconstruct from a received error response. It is distinct from
/// transport-level failures (connection refused, timeout) which never
/// masquerade as one of these four kinds.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
#[error("{kind}: {message}")]
pub struct ProtocolError {
    pub kind: ErrorKind,
    pub message: String,
}

impl ProtocolError {
    #[must_use]
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidInput, message)
    }

    #[must_use]
    pub fn unsupported_feature(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::UnsupportedFeature, message)
    }

    #[must_use]
    pub fn model_not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ModelNotFound, message)
    }

    #[must_use]
    pub fn invalid_output(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidOutput, message)
    }

    #[must_use]
    pub const fn http_status(&self) -> u16 {
        self.kind.http_status()
    }

    #[must_use]
    pub fn into_body(self) -> ErrorBody {
        ErrorBody::new(self.kind, self.message)
    }
}

impl From<ProtocolError> for ErrorResponse {
    fn from(err: ProtocolError) -> Self {
        Self {
            error: err.into_body(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_status_mapping_matches_taxonomy() {
        assert_eq!(ErrorKind::InvalidInput.http_status(), 400);
        assert_eq!(ErrorKind::UnsupportedFeature.http_status(), 400);
        assert_eq!(ErrorKind::ModelNotFound.http_status(), 400);
        assert_eq!(ErrorKind::InvalidOutput.http_status(), 500);
    }

    #[test]
    fn error_body_serializes_with_type_field() {
        let body = ErrorBody::new(ErrorKind::ModelNotFound, "nope not found");
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["type"], "ModelNotFound");
        assert_eq!(json["message"], "nope not found");
    }

    #[test]
    fn error_response_round_trips() {
        let err = ProtocolError::invalid_input("Input parameter 0 has invalid length!");
        let resp: ErrorResponse = err.clone().into();
        let json = serde_json::to_string(&resp).unwrap();
        let back: ErrorResponse = serde_json::from_str(&json).unwrap();
        assert_eq!(back.error.kind, err.kind);
        assert_eq!(back.error.message, err.message);
    }
}
