//! JSON extraction that reports malformed bodies as `InvalidInput`, the
//! protocol's taxonomy, instead of axum's own rejection shape.

use async_trait::async_trait;
use axum::extract::{FromRequest, Request};
use axum::Json;
use serde::de::DeserializeOwned;
use umbridge_protocol::ProtocolError;

use crate::error::ApiError;

/// Wraps [`axum::Json`], translating a parse failure into a
/// `400 InvalidInput` in the wire error envelope, the first step of request
/// handling for every endpoint.
pub struct ApiJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(Self(value)),
            Err(rejection) => Err(ApiError(ProtocolError::invalid_input(format!(
                "malformed request body: {rejection}"
            )))),
        }
    }
}
