/// JWT token generation and validation module
///
/// Tokens are signed using HS256 (HMAC-SHA256) and carry the caller's account
/// ID, email and roles, so the JWT provider can build a session without a
/// store lookup.
///
/// # Security
///
/// - **Algorithm**: HS256 (HMAC with SHA-256)
/// - **Expiration**: Configurable (default 24 hours for access, 30 days for refresh)
/// - **Validation**: Signature, expiration, not-before and issuer checks
/// - **Secret Management**: Secrets should be at least 32 bytes (256 bits)
///
/// # Example
///
/// ```
/// use roster_shared::auth::jwt::{create_token, validate_access_token, Claims, JwtSettings, TokenType};
/// use roster_shared::models::session::{AuthMethod, Session};
/// use uuid::Uuid;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let settings = JwtSettings::new("test-secret-key-at-least-32-bytes-long");
/// let session = Session {
///     user_auth_id: Uuid::new_v4(),
///     email: "a@x.com".to_string(),
///     roles: vec![],
///     method: AuthMethod::Credentials,
///     session_id: None,
/// };
///
/// let claims = Claims::new(&session, TokenType::Access, &settings);
/// let token = create_token(&claims, &settings.secret)?;
///
/// let validated = validate_access_token(&token, &settings)?;
/// assert_eq!(validated.sub, session.user_auth_id);
/// # Ok(())
/// # }
/// ```

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::session::{AuthMethod, Session};

/// Default issuer claim
pub const DEFAULT_ISSUER: &str = "roster";

/// Error type for JWT operations
#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    /// Failed to create token
    #[error("Failed to create token: {0}")]
    CreateError(String),

    /// Failed to validate token
    #[error("Failed to validate token: {0}")]
    ValidationError(String),

    /// Token has expired
    #[error("Token has expired")]
    Expired,

    /// Invalid issuer
    #[error("Invalid issuer: expected {expected}")]
    InvalidIssuer { expected: String },

    /// Wrong token type for the operation
    #[error("Expected {expected} token")]
    WrongType { expected: &'static str },
}

/// Token type identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    /// Access token, used on every request
    Access,

    /// Refresh token, exchanged for new access tokens
    Refresh,
}

impl TokenType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenType::Access => "access",
            TokenType::Refresh => "refresh",
        }
    }
}

/// Signing secret, issuer and token lifetimes
#[derive(Debug, Clone)]
pub struct JwtSettings {
    pub secret: String,
    pub issuer: String,
    pub access_ttl: Duration,
    pub refresh_ttl: Duration,
}

impl JwtSettings {
    /// Settings with the default issuer and lifetimes (24h access, 30d refresh)
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            issuer: DEFAULT_ISSUER.to_string(),
            access_ttl: Duration::hours(24),
            refresh_ttl: Duration::days(30),
        }
    }

    pub fn ttl(&self, token_type: TokenType) -> Duration {
        match token_type {
            TokenType::Access => self.access_ttl,
            TokenType::Refresh => self.refresh_ttl,
        }
    }
}

/// JWT claims structure
///
/// # Standard Claims
///
/// - `sub`: Subject (account ID)
/// - `iss`: Issuer
/// - `iat`, `exp`, `nbf`: Issued at, expiration, not before (Unix seconds)
///
/// # Custom Claims
///
/// - `email`, `roles`: copied from the account at issue time
/// - `token_type`: Access or refresh token
/// - `sid`: session cache entry the token was issued with; logging out of
///   that session invalidates the token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub iss: String,
    pub iat: i64,
    pub exp: i64,
    pub nbf: i64,
    pub email: String,
    #[serde(default)]
    pub roles: Vec<String>,
    pub token_type: TokenType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sid: Option<Uuid>,
}

impl Claims {
    /// Creates claims for `session` with the configured lifetime
    pub fn new(session: &Session, token_type: TokenType, settings: &JwtSettings) -> Self {
        Self::with_expiration(session, token_type, &settings.issuer, settings.ttl(token_type))
    }

    /// Creates claims with a custom lifetime
    pub fn with_expiration(
        session: &Session,
        token_type: TokenType,
        issuer: &str,
        expires_in: Duration,
    ) -> Self {
        let now = Utc::now();
        let expiration = now + expires_in;

        Self {
            sub: session.user_auth_id,
            iss: issuer.to_string(),
            iat: now.timestamp(),
            exp: expiration.timestamp(),
            nbf: now.timestamp(),
            email: session.email.clone(),
            roles: session.roles.clone(),
            token_type,
            sid: session.session_id,
        }
    }

    pub fn is_expired(&self) -> bool {
        Utc::now().timestamp() >= self.exp
    }

    /// Request-scoped session for the token holder
    pub fn to_session(&self) -> Session {
        Session {
            user_auth_id: self.sub,
            email: self.email.clone(),
            roles: self.roles.clone(),
            method: AuthMethod::Jwt,
            session_id: self.sid,
        }
    }
}

/// Signs claims with HS256
pub fn create_token(claims: &Claims, secret: &str) -> Result<String, JwtError> {
    let header = Header::new(Algorithm::HS256);
    let key = EncodingKey::from_secret(secret.as_bytes());

    encode(&header, claims, &key)
        .map_err(|e| JwtError::CreateError(format!("Token encoding failed: {}", e)))
}

/// Validates a JWT token and extracts claims
///
/// Verifies signature, expiration, not-before and issuer.
pub fn validate_token(token: &str, settings: &JwtSettings) -> Result<Claims, JwtError> {
    let key = DecodingKey::from_secret(settings.secret.as_bytes());

    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_issuer(&[settings.issuer.as_str()]);
    validation.validate_exp = true;
    validation.validate_nbf = true;
    validation.leeway = 0;

    let token_data = decode::<Claims>(token, &key, &validation).map_err(|e| match e.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => JwtError::Expired,
        jsonwebtoken::errors::ErrorKind::InvalidIssuer => JwtError::InvalidIssuer {
            expected: settings.issuer.clone(),
        },
        _ => JwtError::ValidationError(format!("Token validation failed: {}", e)),
    })?;

    Ok(token_data.claims)
}

/// Validates token and checks it's an access token
pub fn validate_access_token(token: &str, settings: &JwtSettings) -> Result<Claims, JwtError> {
    let claims = validate_token(token, settings)?;

    if claims.token_type != TokenType::Access {
        return Err(JwtError::WrongType { expected: "access" });
    }

    Ok(claims)
}

/// Validates token and checks it's a refresh token
pub fn validate_refresh_token(token: &str, settings: &JwtSettings) -> Result<Claims, JwtError> {
    let claims = validate_token(token, settings)?;

    if claims.token_type != TokenType::Refresh {
        return Err(JwtError::WrongType { expected: "refresh" });
    }

    Ok(claims)
}

/// Cheap shape check used to skip non-JWT bearer values (e.g. API keys)
pub fn looks_like_jwt(token: &str) -> bool {
    token.split('.').count() == 3 && !token.contains(' ')
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret-key-at-least-32-bytes-long";

    fn session() -> Session {
        Session {
            user_auth_id: Uuid::new_v4(),
            email: "a@x.com".to_string(),
            roles: vec!["Admin".to_string()],
            method: AuthMethod::Credentials,
            session_id: None,
        }
    }

    #[test]
    fn test_default_lifetimes() {
        let settings = JwtSettings::new(SECRET);
        assert_eq!(settings.ttl(TokenType::Access), Duration::hours(24));
        assert_eq!(settings.ttl(TokenType::Refresh), Duration::days(30));
        assert_eq!(settings.issuer, "roster");
    }

    #[test]
    fn test_create_and_validate_token() {
        let settings = JwtSettings::new(SECRET);
        let s = session();

        let claims = Claims::new(&s, TokenType::Access, &settings);
        let token = create_token(&claims, SECRET).expect("Should create token");

        let validated = validate_token(&token, &settings).expect("Should validate token");
        assert_eq!(validated.sub, s.user_auth_id);
        assert_eq!(validated.email, "a@x.com");
        assert_eq!(validated.roles, vec!["Admin".to_string()]);
        assert_eq!(validated.iss, "roster");

        let restored = validated.to_session();
        assert_eq!(restored.method, AuthMethod::Jwt);
        assert_eq!(restored.user_auth_id, s.user_auth_id);
        assert_eq!(restored.session_id, None);
    }

    #[test]
    fn test_session_id_travels_in_token() {
        let settings = JwtSettings::new(SECRET);
        let mut s = session();
        s.session_id = Some(Uuid::new_v4());

        let token = create_token(&Claims::new(&s, TokenType::Refresh, &settings), SECRET).unwrap();
        let claims = validate_refresh_token(&token, &settings).unwrap();
        assert_eq!(claims.sid, s.session_id);
        assert_eq!(claims.to_session().session_id, s.session_id);
    }

    #[test]
    fn test_validate_with_wrong_secret() {
        let settings = JwtSettings::new(SECRET);
        let claims = Claims::new(&session(), TokenType::Access, &settings);
        let token = create_token(&claims, SECRET).unwrap();

        let other = JwtSettings::new("another-secret-key-at-least-32-bytes");
        assert!(validate_token(&token, &other).is_err());
    }

    #[test]
    fn test_validate_wrong_issuer() {
        let settings = JwtSettings::new(SECRET);
        let claims = Claims::with_expiration(&session(), TokenType::Access, "someone-else", Duration::hours(1));
        let token = create_token(&claims, SECRET).unwrap();

        assert!(matches!(
            validate_token(&token, &settings),
            Err(JwtError::InvalidIssuer { .. })
        ));
    }

    #[test]
    fn test_validate_expired_token() {
        let settings = JwtSettings::new(SECRET);
        let claims = Claims::with_expiration(
            &session(),
            TokenType::Access,
            DEFAULT_ISSUER,
            Duration::seconds(-3600),
        );
        assert!(claims.is_expired());

        let token = create_token(&claims, SECRET).unwrap();
        assert!(matches!(validate_token(&token, &settings), Err(JwtError::Expired)));
    }

    #[test]
    fn test_token_types_are_not_interchangeable() {
        let settings = JwtSettings::new(SECRET);
        let access = create_token(&Claims::new(&session(), TokenType::Access, &settings), SECRET).unwrap();
        let refresh = create_token(&Claims::new(&session(), TokenType::Refresh, &settings), SECRET).unwrap();

        assert!(validate_access_token(&access, &settings).is_ok());
        assert!(validate_access_token(&refresh, &settings).is_err());
        assert!(validate_refresh_token(&refresh, &settings).is_ok());
        assert!(matches!(
            validate_refresh_token(&access, &settings),
            Err(JwtError::WrongType { expected: "refresh" })
        ));
    }

    #[test]
    fn test_looks_like_jwt() {
        assert!(looks_like_jwt("aaa.bbb.ccc"));
        assert!(!looks_like_jwt("rk_abcdefghijklmnopqrstuvwxyz123456"));
    }
}
