//! Bearer access-token extractor.

use std::sync::Arc;

use axum::extract::{FromRef, FromRequestParts};
use http::StatusCode;
use http::header::AUTHORIZATION;
use http::request::Parts;

use crate::token::{AccessTokenVerifier, TokenInfo};

/// Caller identity proven by an `Authorization: Bearer <jwt>` header.
///
/// The router state must expose an `Arc<AccessTokenVerifier>` via [`FromRef`].
/// Returns 401 if the header is absent, not a bearer credential, or the token
/// fails validation. Role checks are left to handlers.
#[derive(Debug, Clone)]
pub struct BearerIdentity(pub TokenInfo);

impl<S> FromRequestParts<S> for BearerIdentity
where
    Arc<AccessTokenVerifier>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = StatusCode;

    // Validation is synchronous, so everything happens before the returned
    // future; the future itself borrows nothing from `parts` or `state`.
    fn from_request_parts(
        parts: &mut Parts,
        state: &S,
    ) -> impl std::future::Future<Output = Result<Self, Self::Rejection>> + Send {
        let verifier = Arc::<AccessTokenVerifier>::from_ref(state);
        let result = bearer_token(parts)
            .ok_or(StatusCode::UNAUTHORIZED)
            .and_then(|token| {
                verifier.verify(token).map_err(|e| {
                    tracing::debug!(error = %e, "rejected bearer token");
                    StatusCode::UNAUTHORIZED
                })
            })
            .map(BearerIdentity);

        async move { result }
    }
}

fn bearer_token(parts: &Parts) -> Option<&str> {
    let value = parts.headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}
