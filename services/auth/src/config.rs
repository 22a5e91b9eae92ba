use serde::Deserialize;

use keeper_core::config::Config;

use crate::domain::types::DEFAULT_ACCESS_TOKEN_TTL_MINS;
use crate::usecase::password::HashParams;

/// Auth service configuration loaded from environment variables.
#[derive(Debug, Deserialize)]
pub struct AuthConfig {
    /// PostgreSQL connection URL.
    pub database_url: String,
    /// PEM file holding the RSA private key that signs access tokens.
    pub jwt_private_key_path: String,
    /// PEM file holding the matching public key.
    pub jwt_public_key_path: String,
    /// TCP port to listen on. Env var: `AUTH_PORT`.
    #[serde(default = "default_auth_port")]
    pub auth_port: u16,
    #[serde(default = "default_access_token_ttl_mins")]
    pub access_token_ttl_mins: u64,
    /// `iss` claim written and required on access tokens.
    #[serde(default = "default_jwt_issuer")]
    pub jwt_issuer: String,
    pub argon2_memory_kib: Option<u32>,
    pub argon2_iterations: Option<u32>,
    pub argon2_parallelism: Option<u32>,
}

fn default_auth_port() -> u16 {
    3112
}

fn default_access_token_ttl_mins() -> u64 {
    DEFAULT_ACCESS_TOKEN_TTL_MINS
}

fn default_jwt_issuer() -> String {
    "coin-keeper".to_owned()
}

impl Config for AuthConfig {}

impl AuthConfig {
    /// Argon2 costs, falling back to the library defaults per field.
    pub fn hash_params(&self) -> HashParams {
        let defaults = HashParams::default();
        HashParams {
            memory_kib: self.argon2_memory_kib.unwrap_or(defaults.memory_kib),
            iterations: self.argon2_iterations.unwrap_or(defaults.iterations),
            parallelism: self.argon2_parallelism.unwrap_or(defaults.parallelism),
        }
    }
}
