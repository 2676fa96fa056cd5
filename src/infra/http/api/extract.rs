//! Body extractors that reject with the API error envelope.

use axum::extract::FromRequest;
use axum::extract::rejection::JsonRejection;

use super::error::ApiError;

/// `axum::Json`, but malformed or mistyped bodies become `400 bad_request`.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::bad_request("Invalid request body", Some(rejection.body_text()))
    }
}
