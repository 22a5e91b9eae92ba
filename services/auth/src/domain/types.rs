use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// Smallest one-time code (inclusive).
pub const OTP_MIN: u32 = 100_000;

/// Largest one-time code (inclusive).
pub const OTP_MAX: u32 = 999_999;

/// Lifetime of a one-time code written for a user with no existing record.
pub const OTP_FIRST_TTL_MINS: i64 = 15;

/// Lifetime of a one-time code that overwrites an existing record.
pub const OTP_RESEND_TTL_MINS: i64 = 2;

/// Refresh-token lifetime, reset on every rotation.
pub const REFRESH_TOKEN_TTL_MINS: i64 = 60;

/// Access-token lifetime unless overridden by `ACCESS_TOKEN_TTL_MINS`.
pub const DEFAULT_ACCESS_TOKEN_TTL_MINS: u64 = 15;

/// Role granted on registration. Must exist in the `roles` table.
pub const DEFAULT_ROLE: &str = "USER";

/// Minimum plaintext password length.
pub const MIN_PASSWORD_LEN: usize = 8;

/// Full account record as held by the user directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserAccount {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub picture: Option<String>,
    pub active: bool,
    pub roles: BTreeSet<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserAccount {
    pub fn state(&self) -> AccountState {
        if self.active {
            AccountState::Active
        } else {
            AccountState::PendingVerification
        }
    }

    pub fn profile(&self) -> UserProfile {
        UserProfile {
            id: self.id,
            name: self.name.clone(),
            email: self.email.clone(),
            picture: self.picture.clone(),
            active: self.active,
            roles: self.roles.clone(),
        }
    }
}

/// Lifecycle of a registered account. An unregistered account has no record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountState {
    PendingVerification,
    Active,
}

/// Public projection of an account, safe to return to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserProfile {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub picture: Option<String>,
    pub active: bool,
    pub roles: BTreeSet<String>,
}

/// Input to `UserDirectory::create`. The password is already hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub picture: Option<String>,
    pub role: String,
    /// Stored with the account in the same transaction.
    pub first_code: FirstCode,
}

/// Verification code written alongside a new account.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FirstCode {
    pub code: u32,
    pub expires_at: DateTime<Utc>,
}

/// Stored one-time code. At most one per user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OneTimeCode {
    pub user_id: Uuid,
    pub code: u32,
    pub expires_at: DateTime<Utc>,
}

impl OneTimeCode {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at < now
    }
}

/// Stored refresh token. At most one per user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshToken {
    pub user_id: Uuid,
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

impl RefreshToken {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at < now
    }
}

/// Account change applied in the same transaction that consumes a code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Redemption {
    Activate,
    SetPasswordHash(String),
}

/// What the notifier needs to email a one-time code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OtpNotice {
    pub name: String,
    pub email: String,
    pub code: u32,
}

/// Trim and lowercase an email address for lookup and storage.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_ascii_lowercase()
}

/// Accepts `local@domain.tld` with a conservative character set and an
/// alphabetic top-level domain of at least two characters.
pub fn validate_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    let local_ok = local
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || "._%+-".contains(c));
    let Some((host, tld)) = domain.rsplit_once('.') else {
        return false;
    };
    let host_ok = !host.is_empty()
        && host
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-');
    let tld_ok = tld.len() >= 2 && tld.chars().all(|c| c.is_ascii_alphabetic());
    local_ok && host_ok && tld_ok
}

pub fn validate_password(password: &str) -> bool {
    password.chars().count() >= MIN_PASSWORD_LEN
}

pub fn validate_name(name: &str) -> bool {
    !name.trim().is_empty()
}
