use std::collections::HashMap;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// Field-level validation failures, keyed by field name.
#[derive(Debug, Default, Serialize)]
pub struct ValidationErrors(HashMap<String, Vec<String>>);

impl ValidationErrors {
    pub fn single<K: Into<String>, V: Into<String>>(field: K, message: V) -> Self {
        let mut errors = Self::default();
        errors.add(field, message);
        errors
    }

    pub fn add<K: Into<String>, V: Into<String>>(&mut self, field: K, message: V) {
        self.0.entry(field.into()).or_default().push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Ok when no failure was recorded, the full validation error otherwise.
    pub fn into_result(self) -> Result<(), ApiError> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(ApiError::Validation(self))
        }
    }
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("validation failed")]
    Validation(ValidationErrors),
    #[error("authentication required")]
    Unauthenticated,
    #[error("forbidden")]
    Forbidden,
    #[error("not found")]
    NotFound,
    #[error("{0}")]
    Conflict(String),
    #[error("store error: {0}")]
    Store(#[from] sqlx::Error),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

pub type ApiResult<T> = Result<Json<T>, ApiError>;

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::Validation(errors) => (StatusCode::BAD_REQUEST, json!({ "errors": errors })),
            ApiError::Unauthenticated => (
                StatusCode::UNAUTHORIZED,
                json!({ "errors": { "auth": ["authentication required"] } }),
            ),
            ApiError::Forbidden => (
                StatusCode::FORBIDDEN,
                json!({ "errors": { "auth": ["not the owner of this resource"] } }),
            ),
            ApiError::NotFound => (
                StatusCode::NOT_FOUND,
                json!({ "errors": { "resource": ["not found"] } }),
            ),
            ApiError::Conflict(message) => (
                StatusCode::CONFLICT,
                json!({ "errors": { "slug": [message] } }),
            ),
            ApiError::Store(e) => {
                error!(error = %e, "store error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "errors": { "server": ["internal error"] } }),
                )
            }
            ApiError::Internal(e) => {
                error!(error = %e, "internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "errors": { "server": ["internal error"] } }),
                )
            }
        };
        (status, Json(body)).into_response()
    }
}
