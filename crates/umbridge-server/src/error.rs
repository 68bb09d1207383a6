//! Maps [`ProtocolError`] onto an axum response.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use umbridge_protocol::{ErrorResponse, ProtocolError};

/// Newtype so we can implement [`IntoResponse`] for a foreign error type.
#[derive(Debug)]
pub struct ApiError(pub ProtocolError);

impl From<ProtocolError> for ApiError {
    fn from(err: ProtocolError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.0.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        tracing::warn!(kind = %self.0.kind, message = %self.0.message, "request rejected");
        let body: ErrorResponse = self.0.into();
        (status, Json(body)).into_response()
    }
}
