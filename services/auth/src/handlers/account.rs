use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AuthServiceError;
use crate::state::AppState;
use crate::usecase::auth::{RegisterInput, ResendOutcome, ResetPasswordInput};

// ── POST /auth/register ───────────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub picture: Option<String>,
}

pub async fn register(
    State(state): State<AppState>,
    Json(body): Json<RegisterRequest>,
) -> Result<impl IntoResponse, AuthServiceError> {
    let profile = state
        .auth_service()
        .register(RegisterInput {
            name: body.name,
            email: body.email,
            password: body.password,
            picture: body.picture,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(profile)))
}

// ── POST /auth/otp/verify ─────────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct VerifyOtpRequest {
    pub user_id: Uuid,
    pub otp: u32,
}

pub async fn verify_otp(
    State(state): State<AppState>,
    Json(body): Json<VerifyOtpRequest>,
) -> Result<StatusCode, AuthServiceError> {
    state
        .auth_service()
        .verify_otp(body.user_id, body.otp)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

// ── POST /auth/otp/resend ─────────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct ResendOtpRequest {
    pub user_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

impl From<ResendOutcome> for MessageResponse {
    fn from(outcome: ResendOutcome) -> Self {
        let message = match outcome {
            ResendOutcome::Sent => "a new code has been sent to your email",
            ResendOutcome::AlreadyActive => "user is already activated, please login",
        };
        Self { message }
    }
}

pub async fn resend_otp(
    State(state): State<AppState>,
    Json(body): Json<ResendOtpRequest>,
) -> Result<Json<MessageResponse>, AuthServiceError> {
    let outcome = state.auth_service().resend_otp(body.user_id).await?;
    Ok(Json(outcome.into()))
}

// ── POST /auth/password/forgot ───────────────────────────────────────────────

#[derive(Deserialize)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

pub async fn forgot_password(
    State(state): State<AppState>,
    Json(body): Json<ForgotPasswordRequest>,
) -> Result<StatusCode, AuthServiceError> {
    state.auth_service().forgot_password(&body.email).await?;
    Ok(StatusCode::ACCEPTED)
}

// ── POST /auth/password/reset ────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct ResetPasswordRequest {
    pub email: String,
    pub otp: u32,
    pub password: String,
}

pub async fn reset_password(
    State(state): State<AppState>,
    Json(body): Json<ResetPasswordRequest>,
) -> Result<StatusCode, AuthServiceError> {
    state
        .auth_service()
        .reset_password(ResetPasswordInput {
            email: body.email,
            code: body.otp,
            new_password: body.password,
        })
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
