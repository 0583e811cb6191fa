/// Session types
///
/// [`Session`] is the request-scoped caller identity the auth middleware puts
/// into request extensions. [`StoredSession`] is the session cache entry
/// created by credentials sign-in and looked up by the session provider.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE auth_sessions (
///     id UUID PRIMARY KEY,
///     user_auth_id UUID NOT NULL REFERENCES user_auth(id) ON DELETE CASCADE,
///     email CITEXT NOT NULL,
///     roles TEXT[] NOT NULL DEFAULT '{}',
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     expires_at TIMESTAMPTZ NOT NULL
/// );
/// ```

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::user::UserAuth;

/// How the caller proved its identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthMethod {
    /// JWT bearer token
    Jwt,

    /// API key
    ApiKey,

    /// Session cache entry
    Session,

    /// HTTP Basic
    Basic,

    /// HTTP Digest
    Digest,

    /// Email and password in a request body
    Credentials,
}

/// Authenticated caller, valid for one request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Account the caller authenticated as
    pub user_auth_id: Uuid,

    /// Email copied from the account when the session was created
    pub email: String,

    /// Roles copied from the account when the session was created
    pub roles: Vec<String>,

    /// Provider that produced this session
    pub method: AuthMethod,

    /// Cache entry backing this session, if any
    pub session_id: Option<Uuid>,
}

impl Session {
    pub fn for_user(user: &UserAuth, method: AuthMethod) -> Self {
        Self {
            user_auth_id: user.id,
            email: user.email.clone(),
            roles: user.roles.clone(),
            method,
            session_id: None,
        }
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }
}

/// Session cache entry
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct StoredSession {
    pub id: Uuid,
    pub user_auth_id: Uuid,
    pub email: String,
    pub roles: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl StoredSession {
    /// New cache entry for `session`, expiring after `ttl`
    pub fn issue(session: &Session, ttl: Duration) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_auth_id: session.user_auth_id,
            email: session.email.clone(),
            roles: session.roles.clone(),
            created_at: now,
            expires_at: now + ttl,
        }
    }

    pub fn is_expired(&self) -> bool {
        self.expires_at <= Utc::now()
    }

    /// Request-scoped session backed by this entry
    pub fn to_session(&self) -> Session {
        Session {
            user_auth_id: self.user_auth_id,
            email: self.email.clone(),
            roles: self.roles.clone(),
            method: AuthMethod::Session,
            session_id: Some(self.id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

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
    fn test_issue_and_restore() {
        let original = session();
        let stored = StoredSession::issue(&original, Duration::minutes(5));
        assert!(!stored.is_expired());

        let restored = stored.to_session();
        assert_eq!(restored.user_auth_id, original.user_auth_id);
        assert_eq!(restored.email, original.email);
        assert_eq!(restored.method, AuthMethod::Session);
        assert_eq!(restored.session_id, Some(stored.id));
    }

    #[test]
    fn test_negative_ttl_is_expired() {
        let stored = StoredSession::issue(&session(), Duration::seconds(-1));
        assert!(stored.is_expired());
    }

    #[test]
    fn test_has_role() {
        let s = session();
        assert!(s.has_role("Admin"));
        assert!(!s.has_role("admin"));
    }

    #[test]
    fn test_auth_method_serialization() {
        assert_eq!(serde_json::to_string(&AuthMethod::ApiKey).unwrap(), "\"api_key\"");
        assert_eq!(serde_json::to_string(&AuthMethod::Jwt).unwrap(), "\"jwt\"");
    }
}
