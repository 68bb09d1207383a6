//! Client-side error taxonomy.
//!
//! Distinct from [`umbridge_protocol::ProtocolError`]: that type is what a
//! *server* reports. This enum also covers failures that never reach the
//! wire — a version mismatch at handshake, a malformed parameter bundle
//! caught before any request is sent, transport failures below the HTTP
//! response layer.

use umbridge_protocol::ProtocolError;

/// Everything that can go wrong calling a UM-Bridge server.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The server reported a protocol-taxonomy error.
    #[error("server reported {0}")]
    Remote(#[from] ProtocolError),

    /// A connection, TLS, or body failure below the HTTP response layer.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// A pre-flight check failed before any request was sent: a malformed
    /// parameter bundle, or a call to an operation the cached capability
    /// snapshot says the model doesn't support.
    #[error("local validation failed: {0}")]
    LocalValidation(String),

    /// The server's `/Info.protocolVersion` does not exactly match the
    /// version this client was built against.
    #[error("protocol version mismatch: client expects {expected}, server reports {found}")]
    VersionMismatch { expected: f64, found: f64 },

    /// `name` is not among the models the server's `/Info` response lists.
    #[error("model {name} not hosted by this server (available: {available:?})")]
    UnknownModel { name: String, available: Vec<String> },
}
