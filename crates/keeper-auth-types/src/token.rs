//! RS256 access-token validation.
//!
//! The auth service signs with its private key; every other service verifies
//! with the public key alone via [`AccessTokenVerifier`].

use std::collections::BTreeSet;

use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use serde::Deserialize;
#[cfg(any(feature = "USE_ONLY_IN_AUTH_SERVICE", test))]
use serde::Serialize;
use uuid::Uuid;

/// Claim name carrying role names, read by downstream authorization.
pub const ROLES_CLAIM: &str = "roles";

/// Identity extracted from a validated access token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenInfo {
    pub user_id: Uuid,
    pub roles: BTreeSet<String>,
    pub access_token_exp: u64,
}

impl TokenInfo {
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.contains(role)
    }
}

/// Errors returned by [`AccessTokenVerifier::verify`].
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("invalid signature")]
    InvalidSignature,
    #[error("token expired")]
    Expired,
    #[error("malformed token")]
    Malformed,
    #[error("invalid key: {0}")]
    InvalidKey(String),
}

/// JWT claims payload shared by the issuer (auth service) and all verifiers.
///
/// | Field | JWT claim | Meaning |
/// |-------|-----------|---------|
/// | `sub` | `sub` | user id (UUID string) |
/// | `roles` | custom | role names at issuance time |
/// | `iss` | `iss` | issuer name |
/// | `iat` | `iat` | issued at, seconds since epoch |
/// | `exp` | `exp` | expiry, seconds since epoch |
/// | `jti` | `jti` | random token id |
///
/// [`Serialize`] requires the **`USE_ONLY_IN_AUTH_SERVICE`** cargo feature;
/// only the auth service issues tokens.
#[derive(Debug, Clone, Deserialize)]
#[cfg_attr(any(feature = "USE_ONLY_IN_AUTH_SERVICE", test), derive(Serialize))]
pub struct JwtClaims {
    pub sub: String,
    #[serde(default)]
    pub roles: Vec<String>,
    pub iss: String,
    pub iat: u64,
    pub exp: u64,
    pub jti: String,
}

/// Public-key verifier for access tokens.
#[derive(Clone)]
pub struct AccessTokenVerifier {
    key: DecodingKey,
    issuer: String,
}

impl AccessTokenVerifier {
    /// Build from a PEM-encoded RSA public key (SPKI or PKCS#1).
    pub fn from_rsa_pem(pem: &[u8], issuer: impl Into<String>) -> Result<Self, AuthError> {
        let key = DecodingKey::from_rsa_pem(pem).map_err(|e| AuthError::InvalidKey(e.to_string()))?;
        Ok(Self {
            key,
            issuer: issuer.into(),
        })
    }

    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    /// Validate signature, issuer and expiry, returning the caller's identity.
    ///
    /// Default leeway of 60s tolerates clock skew between services.
    pub fn verify(&self, token: &str) -> Result<TokenInfo, AuthError> {
        let claims = self.decode_claims(token)?;
        let user_id = claims
            .sub
            .parse::<Uuid>()
            .map_err(|_| AuthError::Malformed)?;
        Ok(TokenInfo {
            user_id,
            roles: claims.roles.into_iter().collect(),
            access_token_exp: claims.exp,
        })
    }

    /// Validate and return the raw claims.
    pub fn decode_claims(&self, token: &str) -> Result<JwtClaims, AuthError> {
        let mut validation = Validation::new(Algorithm::RS256);
        validation.validate_exp = true;
        validation.set_issuer(&[self.issuer.as_str()]);
        validation.set_required_spec_claims(&["exp", "sub", "iss"]);

        let data = decode::<JwtClaims>(token, &self.key, &validation).map_err(|e| {
            match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::Expired,
                ErrorKind::InvalidSignature
                | ErrorKind::InvalidRsaKey(_)
                | ErrorKind::InvalidAlgorithm => AuthError::InvalidSignature,
                _ => AuthError::Malformed,
            }
        })?;
        Ok(data.claims)
    }
}

impl std::fmt::Debug for AccessTokenVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessTokenVerifier")
            .field("issuer", &self.issuer)
            .finish_non_exhaustive()
    }
}
