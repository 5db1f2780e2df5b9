use crate::auth::password::PasswordError;
use crate::auth::session_token::SessionTokenError;
use crate::db::error::RepositoryError;
use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use blog_auth_api::validation::{Field, first_messages};
use blog_auth_api::{ErrorResponse, store_codes};
use validator::ValidationErrors;

#[derive(Debug, Clone, thiserror::Error)]
pub enum AppError {
    // Persistence
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Already exists: {0}")]
    Duplicate(String),
    #[error("Invalid reference: {0}")]
    InvalidReference(String),
    #[error("Database error ({code}): {detail}")]
    DatabaseError { code: &'static str, detail: String },

    // Authentication
    #[error("User already exists")]
    UserAlreadyExists,
    #[error("Invalid email or password")]
    InvalidCredentials,
    #[error("Invalid or expired token")]
    InvalidToken,
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    // Validation
    #[error("Validation error on {field}: {message}")]
    Validation { field: Field, message: String },
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    // Internal
    #[error("Password hashing failed: {0}")]
    PasswordHashingFailed(String),
    #[error("Credential signing failed: {0}")]
    TokenSigningFailed(String),
    #[error("Internal server error: {0}")]
    InternalServerError(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_code, message, internal_detail) = self.get_error_info();

        if let Some(ref detail) = internal_detail {
            tracing::error!(error_code, %status, detail, "Internal server error");
        }

        let mut body = ErrorResponse::new(error_code, message);
        if let Some(details) = self.details() {
            body = body.with_details(details);
        }

        (status, Json(body)).into_response()
    }
}

impl AppError {
    fn get_error_info(&self) -> (StatusCode, &'static str, String, Option<String>) {
        match self {
            // 404
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone(), None),

            // 409
            AppError::Duplicate(msg) => {
                (StatusCode::CONFLICT, "DUPLICATE_ENTRY", msg.clone(), None)
            }
            AppError::UserAlreadyExists => (
                StatusCode::CONFLICT,
                "USER_EXISTS",
                "User already exists".to_string(),
                None,
            ),

            // 401
            AppError::InvalidCredentials => (
                StatusCode::UNAUTHORIZED,
                "INVALID_CREDENTIALS",
                "Invalid email or password".to_string(),
                None,
            ),
            AppError::Unauthorized(msg) => {
                (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg.clone(), None)
            }

            // 400
            AppError::InvalidReference(msg) => (
                StatusCode::BAD_REQUEST,
                "INVALID_REFERENCE",
                msg.clone(),
                None,
            ),
            AppError::InvalidToken => (
                StatusCode::BAD_REQUEST,
                "INVALID_TOKEN",
                "Invalid or expired token".to_string(),
                None,
            ),
            AppError::Validation { message, .. } => (
                StatusCode::BAD_REQUEST,
                "VALIDATION_ERROR",
                message.clone(),
                None,
            ),
            AppError::InvalidInput(msg) => {
                (StatusCode::BAD_REQUEST, "INVALID_INPUT", msg.clone(), None)
            }

            // 500
            AppError::DatabaseError { detail, .. } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "DATABASE_ERROR",
                "An error occurred with the database".to_string(),
                Some(detail.clone()),
            ),
            AppError::PasswordHashingFailed(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "HASHING_ERROR",
                "An error occurred while processing your request".to_string(),
                Some(msg.clone()),
            ),
            AppError::TokenSigningFailed(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "TOKEN_ERROR",
                "An error occurred while issuing the session".to_string(),
                Some(msg.clone()),
            ),
            AppError::InternalServerError(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "An internal server error occurred".to_string(),
                Some(msg.clone()),
            ),
        }
    }

    /// Store code for persistence failures, offending field for validation.
    fn details(&self) -> Option<String> {
        match self {
            AppError::NotFound(_) => Some(store_codes::RECORD_NOT_FOUND.to_string()),
            AppError::Duplicate(_) | AppError::UserAlreadyExists => {
                Some(store_codes::UNIQUE_VIOLATION.to_string())
            }
            AppError::InvalidReference(_) => Some(store_codes::FOREIGN_KEY_VIOLATION.to_string()),
            AppError::DatabaseError { code, .. } => Some((*code).to_string()),
            AppError::Validation { field, .. } => Some(field.as_str().to_string()),
            _ => None,
        }
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        AppError::NotFound(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        AppError::InternalServerError(msg.into())
    }

    pub fn invalid_input(msg: impl Into<String>) -> Self {
        AppError::InvalidInput(msg.into())
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        AppError::Unauthorized(msg.into())
    }

    pub fn status_code(&self) -> StatusCode {
        self.get_error_info().0
    }
}

impl From<RepositoryError> for AppError {
    fn from(err: RepositoryError) -> Self {
        let code = err.code();
        match err {
            RepositoryError::NotFound(msg) => AppError::NotFound(msg),
            RepositoryError::UniqueViolation(msg) => AppError::Duplicate(msg),
            RepositoryError::ForeignKeyViolation(msg) => AppError::InvalidReference(msg),
            RepositoryError::PoolError(detail) | RepositoryError::DatabaseError(detail) => {
                AppError::DatabaseError { code, detail }
            }
        }
    }
}

/// Keeps the first failing rule of the first invalid field.
impl From<ValidationErrors> for AppError {
    fn from(errors: ValidationErrors) -> Self {
        match first_messages(&errors).into_iter().next() {
            Some((field, message)) => AppError::Validation { field, message },
            None => AppError::invalid_input(errors.to_string()),
        }
    }
}

impl From<PasswordError> for AppError {
    fn from(err: PasswordError) -> Self {
        AppError::PasswordHashingFailed(err.to_string())
    }
}

impl From<SessionTokenError> for AppError {
    fn from(err: SessionTokenError) -> Self {
        match err {
            SessionTokenError::SigningFailed(e) => AppError::TokenSigningFailed(e.to_string()),
            SessionTokenError::VerificationFailed(_) => {
                AppError::unauthorized("Invalid session credential")
            }
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(err: JsonRejection) -> Self {
        AppError::invalid_input(format!("Invalid JSON: {}", err.body_text()))
    }
}
