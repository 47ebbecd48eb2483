//! Error types for spt-server
//!
//! Every failure leaves the service as `{ "success": false, "message": ... }`
//! with the status code of its category.

use axum::{
    async_trait,
    extract::{rejection::JsonRejection, FromRequest, Request},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use spt_common::events::PublishError;
use thiserror::Error;
use tracing::error;

use crate::fetchers::FetchError;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Unknown identity or record (404)
    #[error("{0}")]
    NotFound(String),

    /// Malformed body, bad identity, unknown platform or category (400)
    #[error("{0}")]
    Validation(String),

    /// Third-party profile lookup failed (400)
    #[error("{0}")]
    ExternalFetch(String),

    /// Missing or wrong admin token (401)
    #[error("{0}")]
    Unauthorized(String),

    /// Admin surface disabled (403)
    #[error("{0}")]
    Forbidden(String),

    /// Store could not be read or written (500)
    #[error("Persistence failure: {0}")]
    Persistence(String),

    /// Internal server error (500)
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl From<spt_common::Error> for ApiError {
    fn from(err: spt_common::Error) -> Self {
        use spt_common::Error as E;
        match err {
            E::NotFound(msg) => ApiError::NotFound(msg),
            E::InvalidInput(msg) => ApiError::Validation(msg),
            E::Io(e) => ApiError::Persistence(e.to_string()),
            E::Json(e) => ApiError::Persistence(e.to_string()),
            E::Config(msg) | E::Internal(msg) => ApiError::Internal(msg),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Validation(rejection.body_text())
    }
}

impl From<FetchError> for ApiError {
    fn from(err: FetchError) -> Self {
        ApiError::ExternalFetch(err.to_string())
    }
}

impl From<PublishError> for ApiError {
    fn from(err: PublishError) -> Self {
        ApiError::Internal(err.to_string())
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Validation(_) | ApiError::ExternalFetch(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::Persistence(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("Request failed: {}", self);
        }

        let body = Json(json!({
            "success": false,
            "message": self.to_string(),
        }));

        (status, body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;

/// JSON body extractor whose rejection uses the service error envelope
#[derive(Debug, Clone, Copy, Default)]
pub struct ApiJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for ApiJson<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        Ok(Self(value))
    }
}
