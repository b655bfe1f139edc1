use axum::{
    extract::rejection::{JsonRejection, PathRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::{models::FieldErrors, token::TokenError};

#[derive(Error, Debug)]
pub enum AppError {
    #[error("validation failed")]
    Validation(FieldErrors),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Duplicate(String),

    #[error("Token is required")]
    MissingToken,

    #[error("Invalid token format")]
    MalformedToken,

    #[error("Token has expired")]
    ExpiredToken,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("{0}")]
    Forbidden(String),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("database error: {0}")]
    Sqlx(sqlx::Error),

    #[error("password hashing error: {0}")]
    PasswordHash(argon2::password_hash::Error),

    #[error("token error: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),
}

impl AppError {
    pub fn forbidden(message: impl Into<String>) -> Self {
        AppError::Forbidden(message.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Duplicate(_) => StatusCode::CONFLICT,
            AppError::MissingToken
            | AppError::MalformedToken
            | AppError::ExpiredToken
            | AppError::InvalidToken
            | AppError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Sqlx(_) | AppError::PasswordHash(_) | AppError::Jwt(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<sqlx::Error> for AppError {
    fn from(inner: sqlx::Error) -> Self {
        match &inner {
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                AppError::Duplicate("Resource already exists".to_string())
            }
            _ => AppError::Sqlx(inner),
        }
    }
}

impl From<argon2::password_hash::Error> for AppError {
    fn from(inner: argon2::password_hash::Error) -> Self {
        AppError::PasswordHash(inner)
    }
}

impl From<TokenError> for AppError {
    fn from(inner: TokenError) -> Self {
        match inner {
            TokenError::Expired => AppError::ExpiredToken,
            TokenError::Invalid => AppError::InvalidToken,
        }
    }
}

impl From<FieldErrors> for AppError {
    fn from(inner: FieldErrors) -> Self {
        AppError::Validation(inner)
    }
}

impl From<JsonRejection> for AppError {
    fn from(inner: JsonRejection) -> Self {
        AppError::BadRequest(inner.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(inner: PathRejection) -> Self {
        AppError::BadRequest(inner.body_text())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        let body = match self {
            AppError::Validation(errors) => json!({ "errors": errors }),
            AppError::Sqlx(e) => {
                tracing::error!("Database error: {}", e);
                json!({ "error": "Database error" })
            }
            AppError::PasswordHash(e) => {
                tracing::error!("Password hashing error: {}", e);
                json!({ "error": "Password hashing error" })
            }
            AppError::Jwt(e) => {
                tracing::error!("JWT error: {}", e);
                json!({ "error": "Token error" })
            }
            other => json!({ "error": other.to_string() }),
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_failures_are_unauthorized_and_role_failures_forbidden() {
        assert_eq!(AppError::MissingToken.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(AppError::from(TokenError::Expired).status(), StatusCode::UNAUTHORIZED);
        assert_eq!(AppError::forbidden("admins only").status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn not_found_names_the_resource() {
        assert_eq!(AppError::NotFound("Product").to_string(), "Product not found");
    }
}
