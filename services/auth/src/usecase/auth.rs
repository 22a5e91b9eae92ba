use std::sync::Arc;

use tracing::{info, warn};
use uuid::Uuid;

use crate::domain::repository::{
    Notifier, OneTimeCodeRepository, RefreshTokenRepository, UserDirectory,
};
use crate::domain::types::{
    DEFAULT_ROLE, NewUser, OtpNotice, Redemption, RefreshToken, UserAccount, UserProfile,
    normalize_email, validate_email, validate_name, validate_password,
};
use crate::error::{AuthServiceError, RefreshFailure};
use crate::usecase::otp::OneTimeCodes;
use crate::usecase::password::{CredentialVerifier, PasswordHasher};
use crate::usecase::refresh::RefreshTokens;
use crate::usecase::token::{IssuedAccessToken, JwtIssuer};

pub struct RegisterInput {
    pub name: String,
    pub email: String,
    pub password: String,
    pub picture: Option<String>,
}

pub struct LoginInput {
    pub email: String,
    pub password: String,
}

pub struct ResetPasswordInput {
    pub email: String,
    pub code: u32,
    pub new_password: String,
}

#[derive(Debug)]
pub struct LoginOutput {
    pub access_token: IssuedAccessToken,
    pub refresh_token: RefreshToken,
    pub profile: UserProfile,
}

#[derive(Debug)]
pub struct RefreshOutput {
    pub user_id: Uuid,
    pub access_token: IssuedAccessToken,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResendOutcome {
    Sent,
    AlreadyActive,
}

/// Registration, verification, login and password recovery over the
/// injected stores.
pub struct AuthenticationService<U, C, R, N>
where
    U: UserDirectory,
    C: OneTimeCodeRepository,
    R: RefreshTokenRepository,
    N: Notifier,
{
    pub users: U,
    pub codes: OneTimeCodes<C>,
    pub refresh_tokens: RefreshTokens<R>,
    pub issuer: Arc<JwtIssuer>,
    pub hasher: Arc<PasswordHasher>,
    pub notifier: Arc<N>,
}

impl<U, C, R, N> AuthenticationService<U, C, R, N>
where
    U: UserDirectory,
    C: OneTimeCodeRepository,
    R: RefreshTokenRepository,
    N: Notifier,
{
    // ── Registration ─────────────────────────────────────────────────────────

    /// Create an inactive account holding the default role and send it a code.
    pub async fn register(&self, input: RegisterInput) -> Result<UserProfile, AuthServiceError> {
        let name = input.name.trim().to_owned();
        let email = normalize_email(&input.email);
        if !validate_name(&name) {
            return Err(AuthServiceError::InvalidInput("name must not be blank"));
        }
        if !validate_email(&email) {
            return Err(AuthServiceError::InvalidInput("email is malformed"));
        }
        if !validate_password(&input.password) {
            return Err(AuthServiceError::InvalidInput(
                "password must be at least 8 characters",
            ));
        }

        let password_hash = self.hasher.hash(&input.password)?;
        let first_code = self.codes.first_code();
        let user = self
            .users
            .create(&NewUser {
                name,
                email,
                password_hash,
                picture: input.picture.filter(|p| !p.trim().is_empty()),
                role: DEFAULT_ROLE.to_owned(),
                first_code,
            })
            .await?;
        self.dispatch(&user, first_code.code);

        info!(user_id = %user.id, "account registered");
        Ok(user.profile())
    }

    /// Check the code and activate the account in one step.
    pub async fn verify_otp(&self, user_id: Uuid, code: u32) -> Result<(), AuthServiceError> {
        let user = self.find_user(user_id).await?;
        let record = self.codes.verify(user.id, code).await?;
        self.codes.redeem(&record, Redemption::Activate).await?;
        info!(user_id = %user.id, "account activated");
        Ok(())
    }

    /// Write a fresh code and send it, unless the account is already active.
    pub async fn resend_otp(&self, user_id: Uuid) -> Result<ResendOutcome, AuthServiceError> {
        let user = self.find_user(user_id).await?;
        if user.active {
            return Ok(ResendOutcome::AlreadyActive);
        }
        let code = self.codes.generate(user.id).await?;
        self.dispatch(&user, code);
        Ok(ResendOutcome::Sent)
    }

    // ── Sessions ─────────────────────────────────────────────────────────────

    /// Verify credentials, then issue an access token and rotate the refresh token.
    ///
    /// Accounts still pending verification may log in.
    pub async fn login(&self, input: LoginInput) -> Result<LoginOutput, AuthServiceError> {
        let email = normalize_email(&input.email);
        let user = CredentialVerifier {
            users: &self.users,
            hasher: &self.hasher,
        }
        .verify(&email, &input.password)
        .await?;

        let access_token = self.issuer.issue(user.id, &user.roles)?;
        let refresh_token = self.refresh_tokens.issue_or_rotate(user.id).await?;

        info!(user_id = %user.id, "login succeeded");
        Ok(LoginOutput {
            access_token,
            refresh_token,
            profile: user.profile(),
        })
    }

    /// Issue a new access token for the refresh token's owner. The refresh
    /// token itself is left unchanged.
    pub async fn refresh(&self, token: &str) -> Result<RefreshOutput, AuthServiceError> {
        let user_id = self.refresh_tokens.validate(token).await?;
        let user = self
            .users
            .find_by_id(user_id)
            .await?
            .ok_or(AuthServiceError::InvalidRefreshToken(RefreshFailure::NotFound))?;
        let access_token = self.issuer.issue(user.id, &user.roles)?;
        Ok(RefreshOutput {
            user_id: user.id,
            access_token,
        })
    }

    pub async fn logout(&self, token: &str) -> Result<(), AuthServiceError> {
        self.refresh_tokens.revoke(token).await
    }

    // ── Password recovery ────────────────────────────────────────────────────

    pub async fn forgot_password(&self, email: &str) -> Result<(), AuthServiceError> {
        let user = self
            .users
            .find_by_email(&normalize_email(email))
            .await?
            .ok_or(AuthServiceError::UserNotFound)?;
        let code = self.codes.generate(user.id).await?;
        self.dispatch(&user, code);
        Ok(())
    }

    /// Check the code and store the new password hash in one step.
    pub async fn reset_password(&self, input: ResetPasswordInput) -> Result<(), AuthServiceError> {
        if !validate_password(&input.new_password) {
            return Err(AuthServiceError::InvalidInput(
                "password must be at least 8 characters",
            ));
        }
        let user = self
            .users
            .find_by_email(&normalize_email(&input.email))
            .await?
            .ok_or(AuthServiceError::UserNotFound)?;
        let record = self.codes.verify(user.id, input.code).await?;
        let password_hash = self.hasher.hash(&input.new_password)?;
        self.codes
            .redeem(&record, Redemption::SetPasswordHash(password_hash))
            .await?;
        info!(user_id = %user.id, "password reset");
        Ok(())
    }

    async fn find_user(&self, user_id: Uuid) -> Result<UserAccount, AuthServiceError> {
        self.users
            .find_by_id(user_id)
            .await?
            .ok_or(AuthServiceError::UserNotFound)
    }

    /// Hand the code to the notifier without waiting for delivery.
    fn dispatch(&self, user: &UserAccount, code: u32) {
        let notifier = Arc::clone(&self.notifier);
        let notice = OtpNotice {
            name: user.name.clone(),
            email: user.email.clone(),
            code,
        };
        let user_id = user.id;
        tokio::spawn(async move {
            if let Err(e) = notifier.notify_one_time_code(notice).await {
                warn!(user_id = %user_id, error = %format!("{e:#}"), "one-time code notification failed");
            }
        });
    }
}
