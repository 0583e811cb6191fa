/// Authentication providers
///
/// Each provider recognizes one kind of credential. [`AuthService::current_session`]
/// runs the enabled providers in their fixed order
/// (`jwt → api_key → session → basic → digest`); the derived `Ord` encodes
/// that order.
///
/// A provider returns:
/// - `Ok(None)` when its credential is absent from the request
/// - `Ok(Some(session))` when the credential checks out
/// - `Err(_)` when the credential is present but wrong, or storage failed
///
/// [`AuthService::current_session`]: super::service::AuthService::current_session

use chrono::Utc;
use std::fmt;
use std::str::FromStr;
use tracing::debug;

use super::api_key::{constant_time_compare, hash_api_key, validate_api_key_format};
use super::basic::parse_basic;
use super::credentials::RequestCredentials;
use super::digest::{self, DigestError};
use super::jwt::{looks_like_jwt, validate_access_token};
use super::service::AuthService;
use crate::error::{AuthError, AuthResult};
use crate::models::session::{AuthMethod, Session};

/// One authentication scheme
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AuthProvider {
    /// `Authorization: Bearer <jwt>`
    Jwt,

    /// `Authorization: Bearer rk_...` or `X-Api-Key`
    ApiKey,

    /// `X-Session-Id` header or `ss-id` cookie
    Session,

    /// `Authorization: Basic`
    Basic,

    /// `Authorization: Digest`
    Digest,
}

impl AuthProvider {
    /// Every provider, in evaluation order
    pub const ALL: [AuthProvider; 5] = [
        AuthProvider::Jwt,
        AuthProvider::ApiKey,
        AuthProvider::Session,
        AuthProvider::Basic,
        AuthProvider::Digest,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            AuthProvider::Jwt => "jwt",
            AuthProvider::ApiKey => "api_key",
            AuthProvider::Session => "session",
            AuthProvider::Basic => "basic",
            AuthProvider::Digest => "digest",
        }
    }

    /// Parses a comma-separated provider list
    ///
    /// The result is sorted into evaluation order and deduplicated, so the
    /// order given in configuration does not matter.
    ///
    /// # Example
    ///
    /// ```
    /// use roster_shared::auth::provider::AuthProvider;
    ///
    /// let providers = AuthProvider::parse_list("digest, jwt,basic").unwrap();
    /// assert_eq!(providers, vec![AuthProvider::Jwt, AuthProvider::Basic, AuthProvider::Digest]);
    /// assert!(AuthProvider::parse_list("jwt,oauth").is_err());
    /// ```
    pub fn parse_list(value: &str) -> Result<Vec<AuthProvider>, String> {
        let mut providers = value
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(AuthProvider::from_str)
            .collect::<Result<Vec<_>, _>>()?;

        if providers.is_empty() {
            return Err("At least one auth provider must be enabled".to_string());
        }

        providers.sort();
        providers.dedup();
        Ok(providers)
    }

    /// Runs this provider against a request
    pub async fn authenticate(
        &self,
        auth: &AuthService,
        req: &RequestCredentials<'_>,
    ) -> AuthResult<Option<Session>> {
        match self {
            AuthProvider::Jwt => jwt(auth, req).await,
            AuthProvider::ApiKey => api_key(auth, req).await,
            AuthProvider::Session => session(auth, req).await,
            AuthProvider::Basic => basic(auth, req).await,
            AuthProvider::Digest => digest_auth(auth, req).await,
        }
    }
}

impl fmt::Display for AuthProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for AuthProvider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "jwt" => Ok(AuthProvider::Jwt),
            "api_key" | "apikey" => Ok(AuthProvider::ApiKey),
            "session" => Ok(AuthProvider::Session),
            "basic" => Ok(AuthProvider::Basic),
            "digest" => Ok(AuthProvider::Digest),
            other => Err(format!("Unknown auth provider: {}", other)),
        }
    }
}

async fn jwt(auth: &AuthService, req: &RequestCredentials<'_>) -> AuthResult<Option<Session>> {
    let token = match req.bearer() {
        Some(token) if looks_like_jwt(token) => token,
        _ => return Ok(None),
    };

    let claims = validate_access_token(token, &auth.settings().jwt)?;
    if let Some(sid) = claims.sid {
        auth.ensure_session_live(sid).await?;
    }
    Ok(Some(claims.to_session()))
}

async fn api_key(auth: &AuthService, req: &RequestCredentials<'_>) -> AuthResult<Option<Session>> {
    let key = match req.api_key_header() {
        Some(key) => key,
        None => match req.bearer() {
            Some(token) if !looks_like_jwt(token) => token,
            _ => return Ok(None),
        },
    };

    if !validate_api_key_format(key) {
        return Err(AuthError::Unauthenticated("Invalid API key format".to_string()));
    }

    let record = auth
        .api_keys()
        .find_by_hash(&hash_api_key(key))
        .await?
        .ok_or_else(|| AuthError::Unauthenticated("Invalid or revoked API key".to_string()))?;

    let user = auth
        .users()
        .find_by_id(record.user_auth_id)
        .await?
        .ok_or_else(|| AuthError::Unauthenticated("API key owner no longer exists".to_string()))?;

    debug!(api_key_id = %record.id, user_auth_id = %user.id, "API key accepted");
    Ok(Some(Session::for_user(&user, AuthMethod::ApiKey)))
}

async fn session(auth: &AuthService, req: &RequestCredentials<'_>) -> AuthResult<Option<Session>> {
    let id = match req.parsed_session_id() {
        None => return Ok(None),
        Some(Ok(id)) => id,
        Some(Err(_)) => {
            return Err(AuthError::Unauthenticated("Malformed session ID".to_string()));
        }
    };

    let stored = auth
        .sessions()
        .get(id)
        .await?
        .ok_or_else(|| AuthError::Unauthenticated("Session expired or unknown".to_string()))?;

    Ok(Some(stored.to_session()))
}

async fn basic(auth: &AuthService, req: &RequestCredentials<'_>) -> AuthResult<Option<Session>> {
    if !req.has_scheme("basic") {
        return Ok(None);
    }

    let credentials = req
        .authorization()
        .and_then(parse_basic)
        .ok_or_else(|| AuthError::Unauthenticated("Malformed Basic credentials".to_string()))?;

    let mut session = auth.authenticate(&credentials).await?;
    session.method = AuthMethod::Basic;
    Ok(Some(session))
}

async fn digest_auth(auth: &AuthService, req: &RequestCredentials<'_>) -> AuthResult<Option<Session>> {
    if !req.has_scheme("digest") {
        return Ok(None);
    }

    let header = req.authorization().unwrap_or_default();
    let response = digest::parse_digest(header).map_err(digest_failure)?;
    let settings = auth.settings();

    if response.realm != settings.realm {
        return Err(AuthError::Unauthenticated("Digest realm mismatch".to_string()));
    }

    if response.uri != req.uri {
        return Err(AuthError::Unauthenticated("Digest URI does not match request".to_string()));
    }

    digest::verify_nonce(
        &response.nonce,
        settings.jwt.secret.as_bytes(),
        settings.nonce_ttl.num_seconds(),
        Utc::now().timestamp(),
    )
    .map_err(digest_failure)?;

    let user = auth
        .users()
        .find_by_email(&response.username)
        .await?
        .ok_or(AuthError::InvalidCredentials)?;

    let ha1 = user.digest_ha1_hash.as_deref().ok_or(AuthError::InvalidCredentials)?;
    let expected = digest::expected_response(ha1, req.method, &response);

    if !constant_time_compare(&expected, &response.response.to_ascii_lowercase()) {
        return Err(AuthError::InvalidCredentials);
    }

    Ok(Some(Session::for_user(&user, AuthMethod::Digest)))
}

fn digest_failure(err: DigestError) -> AuthError {
    AuthError::Unauthenticated(err.to_string())
}
