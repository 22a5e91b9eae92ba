use chrono::{Duration, Utc};
use uuid::Uuid;

use crate::domain::repository::RefreshTokenRepository;
use crate::domain::types::{REFRESH_TOKEN_TTL_MINS, RefreshToken};
use crate::error::{AuthServiceError, RefreshFailure};

/// Opaque 64-hex-char token value.
fn new_token_value() -> String {
    format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple())
}

/// One refresh token per user, rotated on every login.
pub struct RefreshTokens<R: RefreshTokenRepository> {
    pub repo: R,
}

impl<R: RefreshTokenRepository> RefreshTokens<R> {
    /// Create the user's token, or replace its value and reset its expiry.
    pub async fn issue_or_rotate(&self, user_id: Uuid) -> Result<RefreshToken, AuthServiceError> {
        let token = RefreshToken {
            user_id,
            token: new_token_value(),
            expires_at: Utc::now() + Duration::minutes(REFRESH_TOKEN_TTL_MINS),
        };
        self.repo.upsert(&token).await?;
        Ok(token)
    }

    /// Resolve a presented token to its owner. Does not rotate.
    pub async fn validate(&self, token: &str) -> Result<Uuid, AuthServiceError> {
        let record = self
            .repo
            .find_by_token(token)
            .await?
            .ok_or(AuthServiceError::InvalidRefreshToken(RefreshFailure::NotFound))?;
        if record.is_expired_at(Utc::now()) {
            return Err(AuthServiceError::InvalidRefreshToken(RefreshFailure::Expired));
        }
        Ok(record.user_id)
    }

    pub async fn revoke(&self, token: &str) -> Result<(), AuthServiceError> {
        if self.repo.delete_by_token(token).await? {
            Ok(())
        } else {
            Err(AuthServiceError::InvalidRefreshToken(RefreshFailure::NotFound))
        }
    }
}
