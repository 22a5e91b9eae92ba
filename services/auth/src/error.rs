use std::fmt;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

/// Why a one-time code was rejected. Checks run in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OtpFailure {
    Missing,
    Mismatch,
    Expired,
}

impl fmt::Display for OtpFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Missing => "invalid otp",
            Self::Mismatch => "otp mismatch",
            Self::Expired => "otp expired",
        })
    }
}

/// Why a refresh token was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshFailure {
    NotFound,
    Expired,
}

impl fmt::Display for RefreshFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::NotFound => "invalid refresh token",
            Self::Expired => "expired refresh token",
        })
    }
}

/// Auth service domain error variants.
#[derive(Debug, thiserror::Error)]
pub enum AuthServiceError {
    #[error("invalid email or password")]
    InvalidCredentials,
    #[error("{0}")]
    InvalidOtp(OtpFailure),
    #[error("{0}")]
    InvalidRefreshToken(RefreshFailure),
    #[error("invalid token")]
    InvalidToken,
    #[error("email already exists")]
    EmailAlreadyExists,
    #[error("user not found")]
    UserNotFound,
    #[error("role not found")]
    RoleNotFound,
    #[error("invalid input: {0}")]
    InvalidInput(&'static str),
    #[error("internal error")]
    Internal(#[from] anyhow::Error),
}

impl AuthServiceError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidCredentials => "INVALID_CREDENTIALS",
            Self::InvalidOtp(_) => "INVALID_OTP",
            Self::InvalidRefreshToken(_) => "INVALID_REFRESH_TOKEN",
            Self::InvalidToken => "INVALID_TOKEN",
            Self::EmailAlreadyExists => "EMAIL_ALREADY_EXISTS",
            Self::UserNotFound => "USER_NOT_FOUND",
            Self::RoleNotFound => "ROLE_NOT_FOUND",
            Self::InvalidInput(_) => "INVALID_INPUT",
            Self::Internal(_) => "INTERNAL",
        }
    }
}

impl IntoResponse for AuthServiceError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::InvalidCredentials
            | Self::InvalidOtp(_)
            | Self::InvalidRefreshToken(_)
            | Self::InvalidToken => StatusCode::UNAUTHORIZED,
            Self::EmailAlreadyExists => StatusCode::CONFLICT,
            Self::UserNotFound => StatusCode::NOT_FOUND,
            Self::InvalidInput(_) => StatusCode::BAD_REQUEST,
            Self::RoleNotFound | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        match &self {
            Self::Internal(e) => tracing::error!(error = %format!("{e:#}"), kind = "INTERNAL", "internal error"),
            Self::RoleNotFound => tracing::error!(kind = "ROLE_NOT_FOUND", "default role missing from directory"),
            _ => {}
        }
        let body = serde_json::json!({
            "kind": self.kind(),
            "message": self.to_string(),
        });
        (status, axum::Json(body)).into_response()
    }
}
