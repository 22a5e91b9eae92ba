use anyhow::anyhow;
use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{
    PasswordHash, PasswordHasher as _, PasswordVerifier as _, SaltString,
};
use argon2::{Algorithm, Argon2, Params, Version};

use crate::domain::repository::UserDirectory;
use crate::domain::types::UserAccount;
use crate::error::AuthServiceError;

/// Argon2id cost parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HashParams {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl Default for HashParams {
    fn default() -> Self {
        Self {
            memory_kib: Params::DEFAULT_M_COST,
            iterations: Params::DEFAULT_T_COST,
            parallelism: Params::DEFAULT_P_COST,
        }
    }
}

/// Salted Argon2id hashing in PHC string format.
pub struct PasswordHasher {
    argon2: Argon2<'static>,
    // Verified against when the email is unknown so both paths cost the same.
    dummy_hash: String,
}

impl PasswordHasher {
    pub fn new(params: HashParams) -> Result<Self, AuthServiceError> {
        let params = Params::new(
            params.memory_kib,
            params.iterations,
            params.parallelism,
            None,
        )
        .map_err(|e| anyhow!("invalid argon2 params: {e}"))?;
        let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);
        let mut hasher = Self {
            argon2,
            dummy_hash: String::new(),
        };
        hasher.dummy_hash = hasher.hash("coin-keeper-dummy-password")?;
        Ok(hasher)
    }

    pub fn hash(&self, password: &str) -> Result<String, AuthServiceError> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = self
            .argon2
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| anyhow!("failed to hash password: {e}"))?;
        Ok(hash.to_string())
    }

    /// `false` for a wrong password and for a hash that does not parse.
    pub fn verify(&self, password: &str, hash: &str) -> bool {
        let Ok(parsed) = PasswordHash::new(hash) else {
            return false;
        };
        self.argon2
            .verify_password(password.as_bytes(), &parsed)
            .is_ok()
    }

    fn verify_dummy(&self, password: &str) {
        let _ = self.verify(password, &self.dummy_hash);
    }
}

/// Checks an email/password pair against the user directory.
pub struct CredentialVerifier<'a, U: UserDirectory> {
    pub users: &'a U,
    pub hasher: &'a PasswordHasher,
}

impl<U: UserDirectory> CredentialVerifier<'_, U> {
    /// Unknown email and wrong password both yield `InvalidCredentials`.
    pub async fn verify(
        &self,
        email: &str,
        password: &str,
    ) -> Result<UserAccount, AuthServiceError> {
        match self.users.find_by_email(email).await? {
            Some(user) if self.hasher.verify(password, &user.password_hash) => Ok(user),
            Some(_) => Err(AuthServiceError::InvalidCredentials),
            None => {
                self.hasher.verify_dummy(password);
                Err(AuthServiceError::InvalidCredentials)
            }
        }
    }
}
