//! Typed errors and HTTP mapping.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing reference: {kind} '{id}'")]
    MissingReference { kind: &'static str, id: String },
    #[error("invalid primary key: table {table} column {column}")]
    InvalidPrimaryKey { table: String, column: String },
    #[error("duplicate path segment: {0}")]
    DuplicatePathSegment(String),
    #[error("config load: {0}")]
    Load(String),
    #[error("validation: {0}")]
    Validation(String),
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("validation: {0}")]
    Validation(String),
    #[error("unique constraint violated: {constraint}")]
    UniqueViolation { constraint: String, message: String },
    #[error("foreign key constraint violated: {constraint}")]
    ForeignKeyViolation { constraint: String, message: String },
    #[error("database: {0}")]
    Db(sqlx::Error),
    #[error("bad request: {0}")]
    BadRequest(String),
}

impl AppError {
    /// Stable machine-readable code used in error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Config(_) => "config_error",
            AppError::NotFound(_) => "not_found",
            AppError::Validation(_) => "validation_error",
            AppError::UniqueViolation { .. } => "unique_violation",
            AppError::ForeignKeyViolation { .. } => "foreign_key_violation",
            AppError::Db(sqlx::Error::RowNotFound) => "not_found",
            AppError::Db(_) => "database_error",
            AppError::BadRequest(_) => "bad_request",
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, AppError::NotFound(_) | AppError::Db(sqlx::Error::RowNotFound))
    }
}

/// SQLSTATE classes we translate into typed errors. Everything else stays `Db`.
const UNIQUE_VIOLATION: &str = "23505";
const FOREIGN_KEY_VIOLATION: &str = "23503";
const NOT_NULL_VIOLATION: &str = "23502";
const INVALID_TEXT_REPRESENTATION: &str = "22P02";
const INVALID_DATETIME_FORMAT: &str = "22007";
const NUMERIC_OUT_OF_RANGE: &str = "22003";

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        let classified = match &err {
            sqlx::Error::Database(db) => classify(
                db.code().as_deref(),
                db.constraint(),
                db.message(),
            ),
            _ => None,
        };
        classified.unwrap_or(AppError::Db(err))
    }
}

/// Map a database error (by SQLSTATE) onto the typed variants.
fn classify(code: Option<&str>, constraint: Option<&str>, message: &str) -> Option<AppError> {
    let constraint = constraint.unwrap_or("unknown").to_string();
    let message = message.to_string();
    match code? {
        UNIQUE_VIOLATION => Some(AppError::UniqueViolation { constraint, message }),
        FOREIGN_KEY_VIOLATION => Some(AppError::ForeignKeyViolation { constraint, message }),
        NOT_NULL_VIOLATION | INVALID_TEXT_REPRESENTATION | INVALID_DATETIME_FORMAT | NUMERIC_OUT_OF_RANGE => {
            Some(AppError::Validation(message))
        }
        _ => None,
    }
}

#[derive(Serialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::NotFound(_) | AppError::Db(sqlx::Error::RowNotFound) => StatusCode::NOT_FOUND,
            AppError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::UniqueViolation { .. } | AppError::ForeignKeyViolation { .. } => StatusCode::CONFLICT,
            AppError::Db(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
        };
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::warn!(error = %self, "request rejected");
        }
        let details = match &self {
            AppError::UniqueViolation { constraint, .. } | AppError::ForeignKeyViolation { constraint, .. } => {
                Some(serde_json::json!({ "constraint": constraint }))
            }
            _ => None,
        };
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code().to_string(),
                message: self.to_string(),
                details,
            },
        };
        (status, Json(body)).into_response()
    }
}
