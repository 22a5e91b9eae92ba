use std::collections::BTreeSet;
use std::sync::Arc;

use anyhow::{Context, anyhow};
use chrono::Utc;
use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use uuid::Uuid;

use keeper_auth_types::token::{AccessTokenVerifier, JwtClaims};

use crate::error::AuthServiceError;

/// A signed access token and its expiry in unix seconds.
#[derive(Debug, Clone)]
pub struct IssuedAccessToken {
    pub token: String,
    pub expires_at: u64,
}

/// Signs RS256 access tokens with the service's private key.
pub struct JwtIssuer {
    encoding_key: EncodingKey,
    verifier: Arc<AccessTokenVerifier>,
    public_key_pem: String,
    issuer: String,
    ttl_secs: u64,
}

impl JwtIssuer {
    /// Fails unless `private_pem` and `public_pem` form a working key pair.
    pub fn from_rsa_pem(
        private_pem: &[u8],
        public_pem: &[u8],
        issuer: impl Into<String>,
        ttl_mins: u64,
    ) -> Result<Self, AuthServiceError> {
        let issuer = issuer.into();
        let encoding_key =
            EncodingKey::from_rsa_pem(private_pem).context("invalid JWT private key")?;
        let verifier = AccessTokenVerifier::from_rsa_pem(public_pem, issuer.clone())
            .context("invalid JWT public key")?;
        let public_key_pem = String::from_utf8(public_pem.to_vec())
            .context("JWT public key is not UTF-8")?;
        let jwt = Self {
            encoding_key,
            verifier: Arc::new(verifier),
            public_key_pem,
            issuer,
            ttl_secs: ttl_mins * 60,
        };

        let probe = jwt.issue(Uuid::nil(), &BTreeSet::new())?;
        jwt.verifier
            .verify(&probe.token)
            .map_err(|e| anyhow!("JWT key pair mismatch: {e}"))?;
        Ok(jwt)
    }

    pub fn issue(
        &self,
        user_id: Uuid,
        roles: &BTreeSet<String>,
    ) -> Result<IssuedAccessToken, AuthServiceError> {
        let iat = Utc::now().timestamp().max(0) as u64;
        let exp = iat + self.ttl_secs;
        let claims = JwtClaims {
            sub: user_id.to_string(),
            roles: roles.iter().cloned().collect(),
            iss: self.issuer.clone(),
            iat,
            exp,
            jti: Uuid::new_v4().to_string(),
        };
        let token = encode(&Header::new(Algorithm::RS256), &claims, &self.encoding_key)
            .map_err(|e| AuthServiceError::Internal(e.into()))?;
        Ok(IssuedAccessToken {
            token,
            expires_at: exp,
        })
    }

    /// Verifier for the matching public key, shared with the bearer extractor.
    pub fn verifier(&self) -> Arc<AccessTokenVerifier> {
        Arc::clone(&self.verifier)
    }

    pub fn public_key_pem(&self) -> &str {
        &self.public_key_pem
    }
}
