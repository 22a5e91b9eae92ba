use std::sync::Arc;

use axum::extract::FromRef;
use sea_orm::DatabaseConnection;

use keeper_auth_types::token::AccessTokenVerifier;

use crate::infra::db::{DbOneTimeCodeRepository, DbRefreshTokenRepository, DbUserDirectory};
use crate::infra::notifier::OutboxNotifier;
use crate::usecase::auth::AuthenticationService;
use crate::usecase::otp::{CodeSource, OneTimeCodes};
use crate::usecase::password::PasswordHasher;
use crate::usecase::refresh::RefreshTokens;
use crate::usecase::token::JwtIssuer;

pub type DbAuthenticationService = AuthenticationService<
    DbUserDirectory,
    DbOneTimeCodeRepository,
    DbRefreshTokenRepository,
    OutboxNotifier,
>;

/// Shared application state passed to every handler via axum `State`.
#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub issuer: Arc<JwtIssuer>,
    pub hasher: Arc<PasswordHasher>,
    pub codes: Arc<dyn CodeSource>,
}

impl AppState {
    pub fn user_directory(&self) -> DbUserDirectory {
        DbUserDirectory {
            db: self.db.clone(),
        }
    }

    pub fn one_time_code_repo(&self) -> DbOneTimeCodeRepository {
        DbOneTimeCodeRepository {
            db: self.db.clone(),
        }
    }

    pub fn refresh_token_repo(&self) -> DbRefreshTokenRepository {
        DbRefreshTokenRepository {
            db: self.db.clone(),
        }
    }

    pub fn auth_service(&self) -> DbAuthenticationService {
        AuthenticationService {
            users: self.user_directory(),
            codes: OneTimeCodes {
                repo: self.one_time_code_repo(),
                source: Arc::clone(&self.codes),
            },
            refresh_tokens: RefreshTokens {
                repo: self.refresh_token_repo(),
            },
            issuer: Arc::clone(&self.issuer),
            hasher: Arc::clone(&self.hasher),
            notifier: Arc::new(OutboxNotifier {
                db: self.db.clone(),
            }),
        }
    }
}

impl FromRef<AppState> for Arc<AccessTokenVerifier> {
    fn from_ref(state: &AppState) -> Self {
        state.issuer.verifier()
    }
}
