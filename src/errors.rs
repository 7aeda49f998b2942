//! Application Errors
//! Mission: Classify every failure into one client-facing kind

use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::collections::BTreeMap;
use tracing::error;

/// Field name -> human readable problem
pub type FieldErrors = BTreeMap<String, String>;

/// Raised by a store when a write collides with a uniqueness constraint.
///
/// Travels inside `anyhow::Error` and is recovered with `downcast_ref` at the
/// service boundary.
#[derive(Debug, thiserror::Error)]
#[error("unique constraint violated on {field}")]
pub struct UniqueViolation {
    pub field: String,
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{message}")]
    Validation {
        message: String,
        fields: FieldErrors,
    },
    #[error("{0}")]
    Auth(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    NotFound(String),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn validation(fields: FieldErrors) -> Self {
        AppError::Validation {
            message: "Validation failed".to_string(),
            fields,
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        AppError::Validation {
            message: message.into(),
            fields: FieldErrors::new(),
        }
    }

    pub fn invalid_credentials() -> Self {
        AppError::Auth("Invalid username or password".to_string())
    }

    pub fn user_not_found() -> Self {
        AppError::NotFound("user not found".to_string())
    }

    /// Turns a store error into `Conflict` when it carries a `UniqueViolation`.
    pub fn from_store(err: anyhow::Error) -> Self {
        match err.downcast_ref::<UniqueViolation>() {
            Some(violation) => AppError::Conflict(format!("{} already exists", violation.field)),
            None => AppError::Internal(err),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation { .. } => StatusCode::BAD_REQUEST,
            AppError::Auth(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        let body = match &self {
            AppError::Validation { message, fields } if !fields.is_empty() => json!({
                "success": false,
                "message": message,
                "errors": fields,
            }),
            AppError::Internal(err) => {
                error!(error = ?err, "Internal error");
                json!({
                    "success": false,
                    "message": "Internal server error",
                })
            }
            other => json!({
                "success": false,
                "message": other.to_string(),
            }),
        };

        (status, Json(body)).into_response()
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::bad_request(format!("Invalid request body: {}", rejection.body_text()))
    }
}

impl From<PathRejection> for AppError {
    fn from(_: PathRejection) -> Self {
        AppError::bad_request("invalid user id")
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::bad_request(format!("Invalid query string: {}", rejection.body_text()))
    }
}

/// Run store and bcrypt work off the async executor
pub async fn blocking<T, F>(f: F) -> Result<T, AppError>
where
    F: FnOnce() -> Result<T, AppError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| AppError::Internal(anyhow::Error::new(e).context("Blocking task failed")))?
}
