#![allow(async_fn_in_trait)]

use std::future::Future;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::types::{
    NewUser, OneTimeCode, OtpNotice, Redemption, RefreshToken, UserAccount,
};
use crate::error::AuthServiceError;

/// Port over the account store.
pub trait UserDirectory: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<UserAccount>, AuthServiceError>;

    async fn find_by_email(&self, email: &str) -> Result<Option<UserAccount>, AuthServiceError>;

    /// Insert an inactive account holding `user.role` together with its
    /// first one-time code, in one transaction.
    ///
    /// Fails with `EmailAlreadyExists` on a duplicate email and `RoleNotFound`
    /// when the role is not seeded. Nothing is written on failure.
    async fn create(&self, user: &NewUser) -> Result<UserAccount, AuthServiceError>;

    /// Overwrite the mutable fields and role set of an existing account.
    ///
    /// Activation and password reset do not go through here: they are applied
    /// by `OneTimeCodeRepository::redeem` in the transaction that consumes the code.
    async fn save(&self, user: &UserAccount) -> Result<(), AuthServiceError>;

    /// Returns `true` if deleted, `false` if not found.
    async fn delete(&self, id: Uuid) -> Result<bool, AuthServiceError>;
}

/// Repository for per-user one-time codes.
pub trait OneTimeCodeRepository: Send + Sync {
    /// Write `code` for the user in a single atomic statement.
    ///
    /// A fresh row expires at `fresh_expires_at`; an existing row is
    /// overwritten and expires at `reissue_expires_at`.
    async fn upsert(
        &self,
        user_id: Uuid,
        code: u32,
        fresh_expires_at: DateTime<Utc>,
        reissue_expires_at: DateTime<Utc>,
    ) -> Result<OneTimeCode, AuthServiceError>;

    async fn find_by_user(&self, user_id: Uuid) -> Result<Option<OneTimeCode>, AuthServiceError>;

    /// Delete the user's row if it still holds `code` and apply `redemption`
    /// to the account in the same transaction.
    ///
    /// Returns `false` when no matching row was deleted; nothing is applied then.
    async fn redeem(
        &self,
        user_id: Uuid,
        code: u32,
        redemption: &Redemption,
    ) -> Result<bool, AuthServiceError>;
}

/// Repository for per-user refresh tokens.
pub trait RefreshTokenRepository: Send + Sync {
    /// Insert or replace the user's token in a single atomic statement.
    async fn upsert(&self, token: &RefreshToken) -> Result<(), AuthServiceError>;

    async fn find_by_token(&self, token: &str)
    -> Result<Option<RefreshToken>, AuthServiceError>;

    /// Returns `true` if deleted, `false` if not found.
    async fn delete_by_token(&self, token: &str) -> Result<bool, AuthServiceError>;
}

/// Delivers one-time codes to their owner. Runs off the request path, so
/// the returned future must be `Send`.
pub trait Notifier: Send + Sync + 'static {
    fn notify_one_time_code(
        &self,
        notice: OtpNotice,
    ) -> impl Future<Output = anyhow::Result<()>> + Send;
}
