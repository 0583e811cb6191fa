/// API key model
///
/// API keys are long-lived credentials bound to one account, an alternative to
/// JWT bearer tokens for server-to-server callers.
///
/// # Security
///
/// - Keys are stored as SHA-256 hashes (never plaintext)
/// - Keys are prefixed with "rk_" for identification
/// - Full key is only returned on creation (never again)
/// - Keys can be revoked or set to expire
///
/// # Schema
///
/// ```sql
/// CREATE TABLE api_keys (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     user_auth_id UUID NOT NULL REFERENCES user_auth(id) ON DELETE CASCADE,
///     name VARCHAR(100) NOT NULL,
///     key_prefix VARCHAR(16) NOT NULL,
///     key_hash VARCHAR(64) NOT NULL UNIQUE,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     last_used_at TIMESTAMPTZ,
///     revoked_at TIMESTAMPTZ,
///     expires_at TIMESTAMPTZ
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// API key record
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct ApiKey {
    /// Unique API key ID
    pub id: Uuid,

    /// Account this key authenticates as
    pub user_auth_id: Uuid,

    /// Human-readable name for the key
    pub name: String,

    /// Leading characters of the key, for display ("rk_Ab3dE9f...")
    pub key_prefix: String,

    /// SHA-256 hash of the full key
    pub key_hash: String,

    pub created_at: DateTime<Utc>,

    pub last_used_at: Option<DateTime<Utc>>,

    /// When the key was revoked (if applicable)
    pub revoked_at: Option<DateTime<Utc>>,

    /// Optional expiration date
    pub expires_at: Option<DateTime<Utc>>,
}

/// Input for storing a new API key
#[derive(Debug, Clone)]
pub struct NewApiKey {
    pub user_auth_id: Uuid,
    pub name: String,
    pub key_prefix: String,
    pub key_hash: String,
    pub expires_at: Option<DateTime<Utc>>,
}

/// Masked listing entry; never contains the key or its hash
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiKeyView {
    pub id: Uuid,
    pub name: String,
    pub key_prefix: String,
    pub created_at: DateTime<Utc>,
    pub last_used_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
    pub revoked: bool,
}

impl ApiKey {
    pub fn from_new(data: NewApiKey) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_auth_id: data.user_auth_id,
            name: data.name,
            key_prefix: data.key_prefix,
            key_hash: data.key_hash,
            created_at: Utc::now(),
            last_used_at: None,
            revoked_at: None,
            expires_at: data.expires_at,
        }
    }

    /// Checks if the API key is expired
    pub fn is_expired(&self) -> bool {
        match self.expires_at {
            Some(expires_at) => expires_at <= Utc::now(),
            None => false,
        }
    }

    /// Revoked or expired keys never authenticate
    pub fn is_active(&self) -> bool {
        self.revoked_at.is_none() && !self.is_expired()
    }

    /// Whether the key was revoked or expired before `cutoff`
    pub fn inactive_since(&self, cutoff: DateTime<Utc>) -> bool {
        self.revoked_at.is_some_and(|at| at < cutoff) || self.expires_at.is_some_and(|at| at < cutoff)
    }

    pub fn view(&self) -> ApiKeyView {
        ApiKeyView {
            id: self.id,
            name: self.name.clone(),
            key_prefix: self.key_prefix.clone(),
            created_at: self.created_at,
            last_used_at: self.last_used_at,
            expires_at: self.expires_at,
            revoked: self.revoked_at.is_some(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn key(expires_at: Option<DateTime<Utc>>) -> ApiKey {
        ApiKey::from_new(NewApiKey {
            user_auth_id: Uuid::new_v4(),
            name: "ci".to_string(),
            key_prefix: "rk_abcdefg".to_string(),
            key_hash: "0".repeat(64),
            expires_at,
        })
    }

    #[test]
    fn test_is_active() {
        assert!(key(None).is_active());
        assert!(key(Some(Utc::now() + Duration::hours(1))).is_active());
        assert!(!key(Some(Utc::now() - Duration::seconds(1))).is_active());

        let mut revoked = key(None);
        revoked.revoked_at = Some(Utc::now());
        assert!(!revoked.is_active());
    }

    #[test]
    fn test_view_is_masked() {
        let json = serde_json::to_string(&key(None).view()).unwrap();
        assert!(json.contains("keyPrefix"));
        assert!(!json.contains("keyHash"));
        assert!(!json.contains(&"0".repeat(64)));
    }
}
