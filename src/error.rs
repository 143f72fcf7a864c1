//! Request-level error type and its JSON envelope.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::domain::aggregates::{OrderError, ProductError};
use crate::domain::value_objects::{OrderIdError, RatingError};
use crate::storage::StorageError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("{0}")]
    Validation(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type AppResult<T> = Result<T, AppError>;

/// Body of every failed response.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub success: bool,
    pub message: String,
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Storage(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            Self::Storage(_) | Self::Internal(_) => {
                tracing::error!(error = %self, "Request failed");
                "Internal server error".to_string()
            }
            _ => self.to_string(),
        };
        (status, Json(ErrorBody { success: false, message })).into_response()
    }
}

impl From<OrderError> for AppError {
    fn from(e: OrderError) -> Self { Self::Validation(e.to_string()) }
}

impl From<ProductError> for AppError {
    fn from(e: ProductError) -> Self { Self::Validation(e.to_string()) }
}

impl From<RatingError> for AppError {
    fn from(e: RatingError) -> Self { Self::Validation(e.to_string()) }
}

impl From<OrderIdError> for AppError {
    fn from(_: OrderIdError) -> Self { Self::NotFound("order".to_string()) }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(e: validator::ValidationErrors) -> Self { Self::Validation(e.to_string()) }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_of(err: AppError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_envelope_and_status() {
        let (status, body) = body_of(AppError::NotFound("order ORD-1-a".into())).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["success"], false);
        assert_eq!(body["message"], "Not found: order ORD-1-a");

        let (status, _) = body_of(AppError::Unauthorized("sign in".into())).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_internal_details_are_hidden() {
        let (status, body) = body_of(AppError::Internal("disk on fire at /var/data".into())).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["message"], "Internal server error");
    }

    #[test]
    fn test_domain_errors_are_validation() {
        let err: AppError = OrderError::NoItems.into();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        let err: AppError = OrderError::AmountOverflow.into();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }
}
