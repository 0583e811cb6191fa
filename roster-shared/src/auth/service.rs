/// Authentication service
///
/// [`AuthService`] owns the stores and settings and implements registration,
/// password sign-in, provider-chain resolution of the current session, token
/// refresh and API key management. It is constructed once at startup and
/// shared behind an `Arc`.
///
/// Argon2 work runs on `tokio::task::spawn_blocking` so it never stalls the
/// async executor.
///
/// # Example
///
/// ```
/// use roster_shared::auth::credentials::Credentials;
/// use roster_shared::auth::password::PasswordParams;
/// use roster_shared::auth::service::{AuthService, AuthSettings};
/// use roster_shared::store::Stores;
///
/// # async fn example() -> Result<(), roster_shared::error::AuthError> {
/// let mut settings = AuthSettings::new("test-secret-key-at-least-32-bytes-long");
/// settings.password = PasswordParams::fast();
///
/// let auth = AuthService::new(Stores::memory(), settings)?;
/// auth.register("a@x.com", "pw1").await?;
///
/// let session = auth.authenticate(&Credentials::new("a@x.com", "pw1")).await?;
/// assert_eq!(session.email, "a@x.com");
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Duration, Utc};
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use super::api_key::{display_prefix, generate_api_key};
use super::credentials::{Credentials, RequestCredentials};
use super::digest;
use super::jwt::{create_token, validate_refresh_token, Claims, JwtSettings, TokenType};
use super::password::{
    hash_password_with, validate_password, validate_password_strength, verify_password,
    PasswordParams,
};
use super::provider::AuthProvider;
use super::basic;
use crate::error::{AuthError, AuthResult};
use crate::models::api_key::{ApiKey, NewApiKey};
use crate::models::session::{AuthMethod, Session, StoredSession};
use crate::models::user::{normalize_email, NewUserAuth, UserAuth};
use crate::store::{ApiKeyStore, SessionStore, Stores, UserStore};

/// Message for every failed provider chain; the per-provider reason is only logged
pub const UNAUTHENTICATED: &str = "Authentication required";

/// Password acceptance rules applied at registration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PasswordPolicy {
    /// Non-blank, at most 1024 bytes
    #[default]
    Basic,

    /// Basic plus length and character-class requirements
    Strict,
}

impl FromStr for PasswordPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "basic" => Ok(PasswordPolicy::Basic),
            "strict" => Ok(PasswordPolicy::Strict),
            other => Err(format!("Unknown password policy: {}", other)),
        }
    }
}

/// Tunables for [`AuthService`]
#[derive(Debug, Clone)]
pub struct AuthSettings {
    /// Token signing; the secret also keys Digest nonces
    pub jwt: JwtSettings,

    /// Realm announced in Basic/Digest challenges and mixed into HA1
    pub realm: String,

    /// Lifetime of session cache entries
    pub session_ttl: Duration,

    /// How long revoked or expired API keys stay listed before they are purged
    pub api_key_retention: Duration,

    /// Maximum Digest nonce age
    pub nonce_ttl: Duration,

    pub password: PasswordParams,

    pub password_policy: PasswordPolicy,

    /// Enabled providers, in evaluation order
    pub providers: Vec<AuthProvider>,
}

impl AuthSettings {
    /// Defaults: realm `roster`, 14 day sessions, 30 day key retention,
    /// 5 minute nonces, every provider enabled
    pub fn new(jwt_secret: impl Into<String>) -> Self {
        Self {
            jwt: JwtSettings::new(jwt_secret),
            realm: "roster".to_string(),
            session_ttl: Duration::days(14),
            api_key_retention: Duration::days(30),
            nonce_ttl: Duration::minutes(5),
            password: PasswordParams::default(),
            password_policy: PasswordPolicy::Basic,
            providers: AuthProvider::ALL.to_vec(),
        }
    }

    pub fn is_enabled(&self, provider: AuthProvider) -> bool {
        self.providers.contains(&provider)
    }
}

/// Result of a successful credentials sign-in
#[derive(Debug, Clone)]
pub struct SignIn {
    pub session_id: Uuid,
    pub user_auth_id: Uuid,
    pub email: String,
    pub bearer_token: String,
    pub refresh_token: String,
}

#[derive(Debug, Validate)]
struct NewAccount {
    #[validate(
        length(min = 1, message = "Email is required"),
        email(message = "Email must be a valid address")
    )]
    email: String,

    #[validate(custom(function = "check_password"))]
    password: String,
}

fn check_password(password: &str) -> Result<(), ValidationError> {
    validate_password(password).map_err(|message| {
        let mut error = ValidationError::new("password");
        error.message = Some(message.into());
        error
    })
}

#[derive(Debug, Validate)]
struct NewKeyRequest {
    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
    name: String,
}

/// Registration, sign-in and session resolution
pub struct AuthService {
    users: Arc<dyn UserStore>,
    sessions: Arc<dyn SessionStore>,
    api_keys: Arc<dyn ApiKeyStore>,
    settings: AuthSettings,

    /// Verified against when the email is unknown, so both failure paths
    /// cost one Argon2 verification
    dummy_hash: String,
}

impl AuthService {
    pub fn new(stores: Stores, settings: AuthSettings) -> AuthResult<Self> {
        let dummy_hash = hash_password_with("roster-dummy-password", &settings.password)?;

        Ok(Self {
            users: stores.users,
            sessions: stores.sessions,
            api_keys: stores.api_keys,
            settings,
            dummy_hash,
        })
    }

    pub fn settings(&self) -> &AuthSettings {
        &self.settings
    }

    pub fn users(&self) -> &dyn UserStore {
        self.users.as_ref()
    }

    pub fn sessions(&self) -> &dyn SessionStore {
        self.sessions.as_ref()
    }

    pub fn api_keys(&self) -> &dyn ApiKeyStore {
        self.api_keys.as_ref()
    }

    /// Creates an account with an empty role set
    ///
    /// # Errors
    ///
    /// - `InvalidInput` for an empty or malformed email, an empty or over-long
    ///   password, or a password failing the strict policy
    /// - `DuplicateEmail` when the email is already registered
    pub async fn register(&self, email: &str, password: &str) -> AuthResult<UserAuth> {
        let account = NewAccount {
            email: normalize_email(email),
            password: password.to_string(),
        };
        account.validate()?;

        if self.settings.password_policy == PasswordPolicy::Strict {
            validate_password_strength(&account.password)
                .map_err(|message| AuthError::invalid("password", &message))?;
        }

        let params = self.settings.password;
        let to_hash = account.password.clone();
        let password_hash = tokio::task::spawn_blocking(move || hash_password_with(&to_hash, &params))
            .await
            .map_err(|e| AuthError::Internal(format!("Hashing task failed: {}", e)))??;

        let digest_ha1_hash = digest::ha1(&account.email, &self.settings.realm, &account.password);

        let user = self
            .users
            .create(NewUserAuth {
                email: account.email,
                password_hash,
                digest_ha1_hash: Some(digest_ha1_hash),
                roles: Vec::new(),
            })
            .await?;

        info!(user_auth_id = %user.id, "Registered account");
        Ok(user)
    }

    /// Checks an email and password
    ///
    /// Unknown emails and wrong passwords both yield `InvalidCredentials`
    /// after exactly one Argon2 verification.
    pub async fn authenticate(&self, credentials: &Credentials) -> AuthResult<Session> {
        let user = self.users.find_by_email(&credentials.email).await?;

        let hash = self.hash_for(user.as_ref());
        let password = credentials.password.clone();

        let verified = tokio::task::spawn_blocking(move || verify_password(&password, &hash))
            .await
            .map_err(|e| AuthError::Internal(format!("Verification task failed: {}", e)))??;

        match user {
            Some(user) if verified => Ok(Session::for_user(&user, AuthMethod::Credentials)),
            _ => {
                debug!("Rejected credentials");
                Err(AuthError::InvalidCredentials)
            }
        }
    }

    /// The hash a sign-in attempt verifies against; unknown accounts get the dummy
    fn hash_for(&self, user: Option<&UserAuth>) -> String {
        match user {
            Some(user) => user.password_hash.clone(),
            None => self.dummy_hash.clone(),
        }
    }

    /// Resolves the caller through the enabled providers
    ///
    /// The first provider producing a session wins. Credential failures fall
    /// through to the next provider; storage failures abort.
    pub async fn current_session(&self, req: &RequestCredentials<'_>) -> AuthResult<Session> {
        let mut last_failure: Option<AuthError> = None;

        for provider in &self.settings.providers {
            match provider.authenticate(self, req).await {
                Ok(Some(session)) => {
                    debug!(provider = %provider, user_auth_id = %session.user_auth_id, "Authenticated");
                    return Ok(session);
                }
                Ok(None) => {}
                Err(err) if err.is_credential_failure() => {
                    debug!(provider = %provider, error = %err, "Provider rejected credentials");
                    last_failure = Some(err);
                }
                Err(err) => return Err(err),
            }
        }

        match last_failure {
            Some(err) => debug!(error = %err, "No provider accepted the request"),
            None => debug!("No credentials provided"),
        }
        Err(AuthError::Unauthenticated(UNAUTHENTICATED.to_string()))
    }

    /// Authenticates, stores a session cache entry and issues tokens
    pub async fn sign_in(&self, credentials: &Credentials) -> AuthResult<SignIn> {
        let mut session = self.authenticate(credentials).await?;

        let stored = StoredSession::issue(&session, self.settings.session_ttl);
        let session_id = stored.id;
        self.sessions.put(stored).await?;
        session.session_id = Some(session_id);

        let bearer_token = self.issue_token(&session, TokenType::Access)?;
        let refresh_token = self.issue_token(&session, TokenType::Refresh)?;

        info!(user_auth_id = %session.user_auth_id, session_id = %session_id, "Signed in");
        Ok(SignIn {
            session_id,
            user_auth_id: session.user_auth_id,
            email: session.email,
            bearer_token,
            refresh_token,
        })
    }

    /// Drops the session cache entry behind `session`, if any
    ///
    /// Returns whether an entry was removed. Token-based sessions have nothing
    /// to remove.
    pub async fn sign_out(&self, session: &Session) -> AuthResult<bool> {
        match session.session_id {
            Some(id) => {
                let removed = self.sessions.remove(id).await?;
                info!(user_auth_id = %session.user_auth_id, session_id = %id, "Signed out");
                Ok(removed)
            }
            None => Ok(false),
        }
    }

    /// Exchanges a refresh token for a new access token
    ///
    /// The account is re-read so deleted accounts cannot refresh and role
    /// changes reach the new token. Tokens bound to a session stop refreshing
    /// once that session is signed out or expires.
    pub async fn refresh_access_token(&self, refresh_token: &str) -> AuthResult<String> {
        let claims = validate_refresh_token(refresh_token, &self.settings.jwt)?;
        if let Some(sid) = claims.sid {
            self.ensure_session_live(sid).await?;
        }

        let user = self
            .users
            .find_by_id(claims.sub)
            .await?
            .ok_or_else(|| AuthError::Unauthenticated("Account no longer exists".to_string()))?;

        let mut session = Session::for_user(&user, AuthMethod::Jwt);
        session.session_id = claims.sid;
        self.issue_token(&session, TokenType::Access)
    }

    /// Fails with `Unauthenticated` unless the session cache entry exists and is unexpired
    pub(crate) async fn ensure_session_live(&self, session_id: Uuid) -> AuthResult<()> {
        match self.sessions.get(session_id).await? {
            Some(_) => Ok(()),
            None => {
                debug!(session_id = %session_id, "Token refers to an ended session");
                Err(AuthError::Unauthenticated("Session has ended".to_string()))
            }
        }
    }

    fn issue_token(&self, session: &Session, token_type: TokenType) -> AuthResult<String> {
        let claims = Claims::new(session, token_type, &self.settings.jwt);
        Ok(create_token(&claims, &self.settings.jwt.secret)?)
    }

    /// Creates an API key for the caller
    ///
    /// Returns the record and the plaintext key; the plaintext is not
    /// recoverable afterwards.
    pub async fn create_api_key(
        &self,
        session: &Session,
        name: &str,
        expires_at: Option<DateTime<Utc>>,
    ) -> AuthResult<(ApiKey, String)> {
        let request = NewKeyRequest {
            name: name.trim().to_string(),
        };
        request.validate()?;

        if matches!(expires_at, Some(at) if at <= Utc::now()) {
            return Err(AuthError::invalid("expiresAt", "Expiry must be in the future"));
        }

        let (key, key_hash) = generate_api_key();
        let record = self
            .api_keys
            .create(NewApiKey {
                user_auth_id: session.user_auth_id,
                name: request.name,
                key_prefix: display_prefix(&key),
                key_hash,
                expires_at,
            })
            .await?;

        info!(user_auth_id = %session.user_auth_id, api_key_id = %record.id, "Created API key");
        Ok((record, key))
    }

    /// The caller's keys, newest first
    pub async fn list_api_keys(&self, session: &Session) -> AuthResult<Vec<ApiKey>> {
        self.api_keys.list_by_user(session.user_auth_id).await
    }

    /// Revokes one of the caller's keys
    ///
    /// Keys owned by other accounts are reported as not found.
    pub async fn revoke_api_key(&self, session: &Session, id: Uuid) -> AuthResult<()> {
        if self.api_keys.revoke(session.user_auth_id, id).await? {
            info!(user_auth_id = %session.user_auth_id, api_key_id = %id, "Revoked API key");
            Ok(())
        } else {
            Err(AuthError::NotFound(format!("API key {}", id)))
        }
    }

    /// `WWW-Authenticate` values for a 401 response
    ///
    /// Bearer is announced when JWT or API keys are enabled; Digest carries a
    /// fresh nonce.
    pub fn challenges(&self) -> Vec<String> {
        let realm = &self.settings.realm;
        let mut values = Vec::new();

        if self.settings.is_enabled(AuthProvider::Jwt) || self.settings.is_enabled(AuthProvider::ApiKey) {
            values.push(format!("Bearer realm=\"{}\"", realm));
        }

        if self.settings.is_enabled(AuthProvider::Basic) {
            values.push(basic::challenge(realm));
        }

        if self.settings.is_enabled(AuthProvider::Digest) {
            match digest::issue_nonce(self.settings.jwt.secret.as_bytes(), Utc::now().timestamp()) {
                Ok(nonce) => values.push(digest::challenge(realm, &nonce, false)),
                Err(e) => warn!(error = %e, "Could not issue Digest nonce"),
            }
        }

        values
    }

    /// Removes expired session cache entries
    pub async fn purge_expired_sessions(&self) -> AuthResult<u64> {
        let purged = self.sessions.purge_expired().await?;
        if purged > 0 {
            info!(purged, "Purged expired sessions");
        }
        Ok(purged)
    }

    /// Deletes API keys that have been revoked or expired for longer than the retention window
    pub async fn purge_inactive_api_keys(&self) -> AuthResult<u64> {
        let cutoff = Utc::now() - self.settings.api_key_retention;
        let purged = self.api_keys.purge_inactive(cutoff).await?;
        if purged > 0 {
            info!(purged, "Purged inactive API keys");
        }
        Ok(purged)
    }
}
