use std::collections::BTreeSet;

use axum::{
    Json,
    extract::State,
    http::{StatusCode, header::CONTENT_TYPE},
    response::IntoResponse,
};
use axum_extra::extract::CookieJar;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use keeper_auth_types::{
    cookie::{clear_refresh_token_cookie, refresh_token_from, set_refresh_token_cookie},
    identity::BearerIdentity,
};

use crate::domain::types::UserProfile;
use crate::error::{AuthServiceError, RefreshFailure};
use crate::state::AppState;
use crate::usecase::auth::LoginInput;

fn require_refresh_token(jar: &CookieJar) -> Result<String, AuthServiceError> {
    refresh_token_from(jar).ok_or(AuthServiceError::InvalidRefreshToken(RefreshFailure::NotFound))
}

// ── GET /auth/token ───────────────────────────────────────────────────────────

#[derive(Serialize)]
pub struct CheckTokenResponse {
    pub user_id: Uuid,
    pub roles: BTreeSet<String>,
    pub access_token_exp: u64,
}

pub async fn check_token(
    identity: Result<BearerIdentity, StatusCode>,
) -> Result<Json<CheckTokenResponse>, AuthServiceError> {
    let BearerIdentity(info) = identity.map_err(|_| AuthServiceError::InvalidToken)?;
    Ok(Json(CheckTokenResponse {
        user_id: info.user_id,
        roles: info.roles,
        access_token_exp: info.access_token_exp,
    }))
}

// ── POST /auth/token ──────────────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct CreateTokenRequest {
    pub email: String,
    pub password: String,
}

#[derive(Serialize)]
pub struct CreateTokenResponse {
    pub access_token: String,
    pub access_token_exp: u64,
    pub user: UserProfile,
}

pub async fn create_token(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(body): Json<CreateTokenRequest>,
) -> Result<impl IntoResponse, AuthServiceError> {
    let out = state
        .auth_service()
        .login(LoginInput {
            email: body.email,
            password: body.password,
        })
        .await?;

    let jar = set_refresh_token_cookie(jar, out.refresh_token.token);
    let body = CreateTokenResponse {
        access_token: out.access_token.token,
        access_token_exp: out.access_token.expires_at,
        user: out.profile,
    };
    Ok((StatusCode::CREATED, jar, Json(body)))
}

// ── PATCH /auth/token ─────────────────────────────────────────────────────────

#[derive(Serialize)]
pub struct RefreshTokenResponse {
    pub access_token: String,
    pub access_token_exp: u64,
}

pub async fn refresh_token(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<Json<RefreshTokenResponse>, AuthServiceError> {
    let token = require_refresh_token(&jar)?;
    let out = state.auth_service().refresh(&token).await?;
    Ok(Json(RefreshTokenResponse {
        access_token: out.access_token.token,
        access_token_exp: out.access_token.expires_at,
    }))
}

// ── DELETE /auth/token ────────────────────────────────────────────────────────

pub async fn revoke_token(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<impl IntoResponse, AuthServiceError> {
    let token = require_refresh_token(&jar)?;
    state.auth_service().logout(&token).await?;
    Ok((StatusCode::NO_CONTENT, clear_refresh_token_cookie(jar)))
}

// ── GET /auth/public-key ─────────────────────────────────────────────────────

pub async fn public_key(State(state): State<AppState>) -> impl IntoResponse {
    (
        [(CONTENT_TYPE, "application/x-pem-file")],
        state.issuer.public_key_pem().to_owned(),
    )
}
