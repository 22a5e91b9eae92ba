use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use uuid::Uuid;

use keeper_auth::domain::repository::{
    Notifier, OneTimeCodeRepository, RefreshTokenRepository, UserDirectory,
};
use keeper_auth::domain::types::{
    NewUser, OneTimeCode, OtpNotice, Redemption, RefreshToken, UserAccount,
};
use keeper_auth::error::AuthServiceError;
use keeper_auth::usecase::auth::AuthenticationService;
use keeper_auth::usecase::otp::{CodeSource, OneTimeCodes, SeededCodes, ThreadRngCodes};
use keeper_auth::usecase::password::{HashParams, PasswordHasher};
use keeper_auth::usecase::refresh::RefreshTokens;
use keeper_auth::usecase::token::JwtIssuer;

pub const PRIVATE_PEM: &str = include_str!("../../../../fixtures/keys/jwt_private.pem");
pub const PUBLIC_PEM: &str = include_str!("../../../../fixtures/keys/jwt_public.pem");
pub const OTHER_PRIVATE_PEM: &str = include_str!("../../../../fixtures/keys/other_private.pem");
pub const ISSUER: &str = "coin-keeper";

pub type UsersHandle = Arc<Mutex<HashMap<Uuid, UserAccount>>>;
pub type CodesHandle = Arc<Mutex<HashMap<Uuid, OneTimeCode>>>;
pub type TokensHandle = Arc<Mutex<HashMap<Uuid, RefreshToken>>>;

// ── MockUserDirectory ────────────────────────────────────────────────────────

/// Shares the code map so `create` stores the account and its first code together.
pub struct MockUserDirectory {
    pub users: UsersHandle,
    pub codes: CodesHandle,
    pub roles: BTreeSet<String>,
    /// Make `create` fail at the code write, after the account checks pass.
    pub fail_code_insert: bool,
}

impl MockUserDirectory {
    pub fn new() -> Self {
        Self {
            users: Arc::new(Mutex::new(HashMap::new())),
            codes: Arc::new(Mutex::new(HashMap::new())),
            roles: BTreeSet::from(["USER".to_owned(), "ADMIN".to_owned()]),
            fail_code_insert: false,
        }
    }

    /// A directory whose role table was never seeded.
    pub fn without_roles() -> Self {
        Self {
            roles: BTreeSet::new(),
            ..Self::new()
        }
    }

    /// Returns a shared handle to the stored accounts for post-execution inspection.
    pub fn users_handle(&self) -> UsersHandle {
        Arc::clone(&self.users)
    }
}

impl UserDirectory for MockUserDirectory {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<UserAccount>, AuthServiceError> {
        Ok(self.users.lock().unwrap().get(&id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<UserAccount>, AuthServiceError> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .values()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn create(&self, user: &NewUser) -> Result<UserAccount, AuthServiceError> {
        if !self.roles.contains(&user.role) {
            return Err(AuthServiceError::RoleNotFound);
        }
        let mut users = self.users.lock().unwrap();
        let mut codes = self.codes.lock().unwrap();
        if users.values().any(|u| u.email == user.email) {
            return Err(AuthServiceError::EmailAlreadyExists);
        }
        if self.fail_code_insert {
            return Err(AuthServiceError::Internal(anyhow::anyhow!("code store down")));
        }
        let now = Utc::now();
        let account = UserAccount {
            id: Uuid::now_v7(),
            name: user.name.clone(),
            email: user.email.clone(),
            password_hash: user.password_hash.clone(),
            picture: user.picture.clone(),
            active: false,
            roles: BTreeSet::from([user.role.clone()]),
            created_at: now,
            updated_at: now,
        };
        codes.insert(
            account.id,
            OneTimeCode {
                user_id: account.id,
                code: user.first_code.code,
                expires_at: user.first_code.expires_at,
            },
        );
        users.insert(account.id, account.clone());
        Ok(account)
    }

    async fn save(&self, user: &UserAccount) -> Result<(), AuthServiceError> {
        if !user.roles.is_subset(&self.roles) {
            return Err(AuthServiceError::RoleNotFound);
        }
        let mut users = self.users.lock().unwrap();
        match users.get_mut(&user.id) {
            Some(stored) => {
                *stored = user.clone();
                Ok(())
            }
            None => Err(AuthServiceError::UserNotFound),
        }
    }

    async fn delete(&self, id: Uuid) -> Result<bool, AuthServiceError> {
        Ok(self.users.lock().unwrap().remove(&id).is_some())
    }
}

// ── MockOneTimeCodeRepo ──────────────────────────────────────────────────────

/// Shares the directory's maps so redemption can apply its account change.
pub struct MockOneTimeCodeRepo {
    pub codes: CodesHandle,
    pub users: UsersHandle,
}

impl MockOneTimeCodeRepo {
    pub fn new(directory: &MockUserDirectory) -> Self {
        Self {
            codes: Arc::clone(&directory.codes),
            users: directory.users_handle(),
        }
    }

    /// Returns a shared handle to the stored codes for post-execution inspection.
    pub fn codes_handle(&self) -> CodesHandle {
        Arc::clone(&self.codes)
    }
}

impl OneTimeCodeRepository for MockOneTimeCodeRepo {
    async fn upsert(
        &self,
        user_id: Uuid,
        code: u32,
        fresh_expires_at: DateTime<Utc>,
        reissue_expires_at: DateTime<Utc>,
    ) -> Result<OneTimeCode, AuthServiceError> {
        let mut codes = self.codes.lock().unwrap();
        let record = codes
            .entry(user_id)
            .and_modify(|existing| {
                existing.code = code;
                existing.expires_at = reissue_expires_at;
            })
            .or_insert(OneTimeCode {
                user_id,
                code,
                expires_at: fresh_expires_at,
            });
        Ok(record.clone())
    }

    async fn find_by_user(&self, user_id: Uuid) -> Result<Option<OneTimeCode>, AuthServiceError> {
        Ok(self.codes.lock().unwrap().get(&user_id).cloned())
    }

    async fn redeem(
        &self,
        user_id: Uuid,
        code: u32,
        redemption: &Redemption,
    ) -> Result<bool, AuthServiceError> {
        let mut codes = self.codes.lock().unwrap();
        if codes.get(&user_id).map(|c| c.code) != Some(code) {
            return Ok(false);
        }
        codes.remove(&user_id);
        let mut users = self.users.lock().unwrap();
        if let Some(user) = users.get_mut(&user_id) {
            match redemption {
                Redemption::Activate => user.active = true,
                Redemption::SetPasswordHash(hash) => user.password_hash = hash.clone(),
            }
            user.updated_at = Utc::now();
        }
        Ok(true)
    }
}

// ── MockRefreshTokenRepo ─────────────────────────────────────────────────────

pub struct MockRefreshTokenRepo {
    pub tokens: TokensHandle,
}

impl MockRefreshTokenRepo {
    pub fn new() -> Self {
        Self {
            tokens: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Returns a shared handle to the stored tokens for post-execution inspection.
    pub fn tokens_handle(&self) -> TokensHandle {
        Arc::clone(&self.tokens)
    }
}

impl RefreshTokenRepository for MockRefreshTokenRepo {
    async fn upsert(&self, token: &RefreshToken) -> Result<(), AuthServiceError> {
        self.tokens
            .lock()
            .unwrap()
            .insert(token.user_id, token.clone());
        Ok(())
    }

    async fn find_by_token(
        &self,
        token: &str,
    ) -> Result<Option<RefreshToken>, AuthServiceError> {
        Ok(self
            .tokens
            .lock()
            .unwrap()
            .values()
            .find(|t| t.token == token)
            .cloned())
    }

    async fn delete_by_token(&self, token: &str) -> Result<bool, AuthServiceError> {
        let mut tokens = self.tokens.lock().unwrap();
        let owner = tokens
            .values()
            .find(|t| t.token == token)
            .map(|t| t.user_id);
        Ok(owner.and_then(|id| tokens.remove(&id)).is_some())
    }
}

// ── Notifiers ────────────────────────────────────────────────────────────────

/// Forwards every notice to a channel the test reads from.
pub struct RecordingNotifier {
    pub tx: mpsc::UnboundedSender<OtpNotice>,
}

impl Notifier for RecordingNotifier {
    async fn notify_one_time_code(&self, notice: OtpNotice) -> anyhow::Result<()> {
        self.tx.send(notice)?;
        Ok(())
    }
}

pub struct FailingNotifier;

impl Notifier for FailingNotifier {
    async fn notify_one_time_code(&self, _notice: OtpNotice) -> anyhow::Result<()> {
        anyhow::bail!("smtp unreachable")
    }
}

// ── Test fixture helpers ─────────────────────────────────────────────────────

pub fn test_hasher() -> Arc<PasswordHasher> {
    Arc::new(
        PasswordHasher::new(HashParams {
            memory_kib: 1024,
            iterations: 1,
            parallelism: 1,
        })
        .unwrap(),
    )
}

pub fn test_issuer() -> Arc<JwtIssuer> {
    Arc::new(
        JwtIssuer::from_rsa_pem(PRIVATE_PEM.as_bytes(), PUBLIC_PEM.as_bytes(), ISSUER, 15)
            .unwrap(),
    )
}

pub type TestService = AuthenticationService<
    MockUserDirectory,
    MockOneTimeCodeRepo,
    MockRefreshTokenRepo,
    RecordingNotifier,
>;

/// Service over in-memory stores plus handles into each store.
pub struct Harness {
    pub service: TestService,
    pub users: UsersHandle,
    pub codes: CodesHandle,
    pub tokens: TokensHandle,
    pub notices: mpsc::UnboundedReceiver<OtpNotice>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_source(Arc::new(ThreadRngCodes))
    }

    pub fn seeded(seed: u64) -> Self {
        Self::with_source(Arc::new(SeededCodes::new(seed)))
    }

    pub fn with_source(source: Arc<dyn CodeSource>) -> Self {
        let directory = MockUserDirectory::new();
        let users = directory.users_handle();
        let code_repo = MockOneTimeCodeRepo::new(&directory);
        let codes = code_repo.codes_handle();
        let token_repo = MockRefreshTokenRepo::new();
        let tokens = token_repo.tokens_handle();
        let (tx, notices) = mpsc::unbounded_channel();

        let service = AuthenticationService {
            users: directory,
            codes: OneTimeCodes {
                repo: code_repo,
                source,
            },
            refresh_tokens: RefreshTokens { repo: token_repo },
            issuer: test_issuer(),
            hasher: test_hasher(),
            notifier: Arc::new(RecordingNotifier { tx }),
        };

        Self {
            service,
            users,
            codes,
            tokens,
            notices,
        }
    }

    pub fn user(&self, id: Uuid) -> UserAccount {
        self.users.lock().unwrap().get(&id).cloned().unwrap()
    }

    pub fn stored_code(&self, user_id: Uuid) -> Option<OneTimeCode> {
        self.codes.lock().unwrap().get(&user_id).cloned()
    }

    pub fn stored_token(&self, user_id: Uuid) -> Option<RefreshToken> {
        self.tokens.lock().unwrap().get(&user_id).cloned()
    }

    /// Move the user's code expiry into the past.
    pub fn expire_code(&self, user_id: Uuid) {
        let mut codes = self.codes.lock().unwrap();
        let code = codes.get_mut(&user_id).unwrap();
        code.expires_at = Utc::now() - chrono::Duration::seconds(1);
    }

    /// Move the user's refresh-token expiry into the past.
    pub fn expire_token(&self, user_id: Uuid) {
        let mut tokens = self.tokens.lock().unwrap();
        let token = tokens.get_mut(&user_id).unwrap();
        token.expires_at = Utc::now() - chrono::Duration::seconds(1);
    }

    /// Wait for the next notice dispatched by the service.
    pub async fn next_notice(&mut self) -> OtpNotice {
        tokio::time::timeout(std::time::Duration::from_secs(5), self.notices.recv())
            .await
            .expect("no notice within 5s")
            .expect("notifier channel closed")
    }
}
