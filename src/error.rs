use std::sync::OnceLock;

use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

static DETAILED_ERRORS: OnceLock<bool> = OnceLock::new();

/// Enables the `details` field on 5xx responses. Set once at startup; later calls are ignored.
pub fn set_detailed_errors(enabled: bool) {
    let _ = DETAILED_ERRORS.set(enabled);
}

fn detailed_errors() -> bool {
    DETAILED_ERRORS.get().copied().unwrap_or(false)
}

/// Application-level errors
#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Auth(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("missing configuration: {0}")]
    Config(String),

    #[error("database tables are not initialized, call POST /api/init-db first")]
    Schema,

    #[error("upstream API returned status {status}: {message}")]
    RemoteApi { status: u16, message: String },

    #[error("database error: {0}")]
    Store(#[from] sqlx::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::Conflict(_) => StatusCode::BAD_REQUEST,
            AppError::Auth(_) => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Config(_)
            | AppError::Schema
            | AppError::RemoteApi { .. }
            | AppError::Store(_)
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to hand to any client.
    fn public_message(&self) -> String {
        match self {
            AppError::Validation(msg)
            | AppError::Auth(msg)
            | AppError::NotFound(msg)
            | AppError::Conflict(msg) => msg.clone(),
            AppError::Config(_) => "service is not fully configured".to_string(),
            AppError::Schema => self.to_string(),
            AppError::RemoteApi { .. } => "movie metadata service failed".to_string(),
            AppError::Store(_) => "database error".to_string(),
            AppError::Internal(_) => "internal server error".to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let mut body = json!({ "error": self.public_message() });

        if status.is_server_error() {
            tracing::error!(error = %self, %status, "request failed");
            if detailed_errors() {
                body["details"] = json!(self.to_string());
            }
        }

        (status, Json(body)).into_response()
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

pub type AppResult<T> = Result<T, AppError>;
