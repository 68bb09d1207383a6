//! # UM-Bridge Protocol
//!
//! Wire schema, protocol-version negotiation, and the error taxonomy shared
//! by every UM-Bridge 1.0 client and server. This crate defines the
//! contract; it hosts no models, no transport I/O, and no execution policy —
//! see `umbridge-server` and `umbridge-client` for those.

pub mod error;
pub mod version;
pub mod wire;

pub use error::{ErrorBody, ErrorKind, ErrorResponse, ProtocolError};
pub use version::{is_compatible, PROTOCOL_VERSION};
