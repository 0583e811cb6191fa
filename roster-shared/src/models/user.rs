/// UserAuth model
///
/// A `UserAuth` is a registered account: identity, credential hashes and
/// roles. Records are created by registration and read by sign-in and user
/// listing; nothing in this crate updates or deletes them.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE user_auth (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     email CITEXT NOT NULL,
///     password_hash VARCHAR(255) NOT NULL,
///     digest_ha1_hash VARCHAR(64),
///     roles TEXT[] NOT NULL DEFAULT '{}',
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     CONSTRAINT user_auth_email_key UNIQUE (email)
/// );
/// ```
///
/// The full record is never serialized to clients. Use [`UserAuthView`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Registered account, as stored
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct UserAuth {
    /// Unique account ID (UUID v4)
    pub id: Uuid,

    /// Login identifier, trimmed and lower-cased
    pub email: String,

    /// Argon2id PHC string
    pub password_hash: String,

    /// Hex SHA-256 of `email:realm:password` for Digest auth
    pub digest_ha1_hash: Option<String>,

    /// Role names; empty on registration
    pub roles: Vec<String>,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

/// Input for creating a new account
///
/// Hashes are computed by the auth service before this reaches a store.
#[derive(Debug, Clone)]
pub struct NewUserAuth {
    pub email: String,
    pub password_hash: String,
    pub digest_ha1_hash: Option<String>,
    pub roles: Vec<String>,
}

/// Client-facing projection of [`UserAuth`] without credential material
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserAuthView {
    pub id: Uuid,
    pub email: String,
    pub roles: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&UserAuth> for UserAuthView {
    fn from(user: &UserAuth) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            roles: user.roles.clone(),
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

impl From<UserAuth> for UserAuthView {
    fn from(user: UserAuth) -> Self {
        Self {
            id: user.id,
            email: user.email,
            roles: user.roles,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

impl UserAuth {
    /// Builds a record from creation input, for stores that generate IDs themselves
    pub fn from_new(data: NewUserAuth) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            email: data.email,
            password_hash: data.password_hash,
            digest_ha1_hash: data.digest_ha1_hash,
            roles: data.roles,
            created_at: now,
            updated_at: now,
        }
    }

    /// Client-facing view
    pub fn view(&self) -> UserAuthView {
        UserAuthView::from(self)
    }
}

/// Normalizes an email for storage and lookup
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> UserAuth {
        UserAuth::from_new(NewUserAuth {
            email: "a@x.com".to_string(),
            password_hash: "$argon2id$v=19$secret".to_string(),
            digest_ha1_hash: Some("ab".repeat(32)),
            roles: vec![],
        })
    }

    #[test]
    fn test_view_has_no_credential_fields() {
        let json = serde_json::to_value(sample().view()).unwrap();
        let obj = json.as_object().unwrap();

        assert!(obj.contains_key("id"));
        assert_eq!(obj["email"], "a@x.com");
        assert!(obj.contains_key("createdAt"));
        assert!(!obj.contains_key("passwordHash"));
        assert!(!obj.contains_key("password_hash"));
        assert!(!obj.contains_key("digestHa1Hash"));
        assert!(!json.to_string().contains("argon2id"));
    }

    #[test]
    fn test_from_new_starts_without_roles() {
        let user = sample();
        assert!(user.roles.is_empty());
        assert_eq!(user.created_at, user.updated_at);
    }

    #[test]
    fn test_normalize_email() {
        assert_eq!(normalize_email("  Bob@Example.COM "), "bob@example.com");
    }
}
