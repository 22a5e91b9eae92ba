use std::sync::{Arc, Mutex, PoisonError};

use chrono::{Duration, Utc};
use rand::rngs::StdRng;
use rand::{RngExt, SeedableRng};
use uuid::Uuid;

use crate::domain::repository::OneTimeCodeRepository;
use crate::domain::types::{
    FirstCode, OTP_FIRST_TTL_MINS, OTP_MAX, OTP_MIN, OTP_RESEND_TTL_MINS, OneTimeCode,
    Redemption,
};
use crate::error::{AuthServiceError, OtpFailure};

/// Source of six-digit codes in `OTP_MIN..=OTP_MAX`.
pub trait CodeSource: Send + Sync {
    fn next_code(&self) -> u32;
}

/// Production source backed by the thread-local CSPRNG.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadRngCodes;

impl CodeSource for ThreadRngCodes {
    fn next_code(&self) -> u32 {
        rand::rng().random_range(OTP_MIN..=OTP_MAX)
    }
}

/// Deterministic source: equal seeds yield equal sequences.
pub struct SeededCodes(Mutex<StdRng>);

impl SeededCodes {
    pub fn new(seed: u64) -> Self {
        Self(Mutex::new(StdRng::seed_from_u64(seed)))
    }
}

impl CodeSource for SeededCodes {
    fn next_code(&self) -> u32 {
        let mut rng = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        rng.random_range(OTP_MIN..=OTP_MAX)
    }
}

/// Issues, checks and consumes per-user one-time codes.
pub struct OneTimeCodes<C: OneTimeCodeRepository> {
    pub repo: C,
    pub source: Arc<dyn CodeSource>,
}

impl<C: OneTimeCodeRepository> OneTimeCodes<C> {
    /// Draw the code for an account that does not exist yet. The caller
    /// persists it with the account.
    pub fn first_code(&self) -> FirstCode {
        FirstCode {
            code: self.source.next_code(),
            expires_at: Utc::now() + Duration::minutes(OTP_FIRST_TTL_MINS),
        }
    }

    /// Write a new code for the user, replacing any existing one.
    pub async fn generate(&self, user_id: Uuid) -> Result<u32, AuthServiceError> {
        let code = self.source.next_code();
        let now = Utc::now();
        let stored = self
            .repo
            .upsert(
                user_id,
                code,
                now + Duration::minutes(OTP_FIRST_TTL_MINS),
                now + Duration::minutes(OTP_RESEND_TTL_MINS),
            )
            .await?;
        tracing::debug!(user_id = %user_id, expires_at = %stored.expires_at, "one-time code issued");
        Ok(stored.code)
    }

    /// Look up the user's code and check it against `supplied`.
    ///
    /// Reports `Missing`, then `Mismatch`, then `Expired`.
    pub async fn verify(
        &self,
        user_id: Uuid,
        supplied: u32,
    ) -> Result<OneTimeCode, AuthServiceError> {
        let record = self
            .repo
            .find_by_user(user_id)
            .await?
            .ok_or(AuthServiceError::InvalidOtp(OtpFailure::Missing))?;
        if record.code != supplied {
            return Err(AuthServiceError::InvalidOtp(OtpFailure::Mismatch));
        }
        if record.is_expired_at(Utc::now()) {
            return Err(AuthServiceError::InvalidOtp(OtpFailure::Expired));
        }
        Ok(record)
    }

    /// Consume a verified code and apply `redemption`. Of several concurrent
    /// redeemers exactly one succeeds; the rest see `Missing`.
    pub async fn redeem(
        &self,
        record: &OneTimeCode,
        redemption: Redemption,
    ) -> Result<(), AuthServiceError> {
        if self
            .repo
            .redeem(record.user_id, record.code, &redemption)
            .await?
        {
            Ok(())
        } else {
            Err(AuthServiceError::InvalidOtp(OtpFailure::Missing))
        }
    }
}
