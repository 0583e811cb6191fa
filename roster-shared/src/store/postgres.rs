/// Postgres store backend
///
/// Queries run against the tables created by the embedded migrations.
/// `email` is a `CITEXT` column: lookups compare case-insensitively and the
/// `user_auth_email_key` constraint rejects duplicates regardless of case.
/// The column is cast to `TEXT` on the way out.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::debug;
use uuid::Uuid;

use super::{ApiKeyStore, SessionStore, UserStore};
use crate::error::AuthResult;
use crate::models::api_key::{ApiKey, NewApiKey};
use crate::models::session::StoredSession;
use crate::models::user::{normalize_email, NewUserAuth, UserAuth};

const USER_COLUMNS: &str =
    "id, email::TEXT AS email, password_hash, digest_ha1_hash, roles, created_at, updated_at";

const SESSION_COLUMNS: &str = "id, user_auth_id, email::TEXT AS email, roles, created_at, expires_at";

const API_KEY_COLUMNS: &str =
    "id, user_auth_id, name, key_prefix, key_hash, created_at, last_used_at, revoked_at, expires_at";

/// Accounts in `user_auth`
#[derive(Debug, Clone)]
pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn create(&self, data: NewUserAuth) -> AuthResult<UserAuth> {
        let user = sqlx::query_as::<_, UserAuth>(&format!(
            r#"
            INSERT INTO user_auth (email, password_hash, digest_ha1_hash, roles)
            VALUES ($1, $2, $3, $4)
            RETURNING {}
            "#,
            USER_COLUMNS
        ))
        .bind(normalize_email(&data.email))
        .bind(data.password_hash)
        .bind(data.digest_ha1_hash)
        .bind(&data.roles)
        .fetch_one(&self.pool)
        .await?;

        debug!(user_auth_id = %user.id, "Inserted user_auth row");
        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> AuthResult<Option<UserAuth>> {
        let user = sqlx::query_as::<_, UserAuth>(&format!(
            "SELECT {} FROM user_auth WHERE email = $1::CITEXT",
            USER_COLUMNS
        ))
        .bind(normalize_email(email))
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn find_by_id(&self, id: Uuid) -> AuthResult<Option<UserAuth>> {
        let user = sqlx::query_as::<_, UserAuth>(&format!(
            "SELECT {} FROM user_auth WHERE id = $1",
            USER_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn list_all(&self) -> AuthResult<Vec<UserAuth>> {
        // seq preserves insertion order; created_at can tie
        let users = sqlx::query_as::<_, UserAuth>(&format!(
            "SELECT {} FROM user_auth ORDER BY seq ASC",
            USER_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(users)
    }

    async fn ping(&self) -> AuthResult<()> {
        crate::db::pool::health_check(&self.pool).await?;
        Ok(())
    }
}

/// Session cache in `auth_sessions`
#[derive(Debug, Clone)]
pub struct PgSessionStore {
    pool: PgPool,
}

impl PgSessionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SessionStore for PgSessionStore {
    async fn put(&self, session: StoredSession) -> AuthResult<()> {
        sqlx::query(
            r#"
            INSERT INTO auth_sessions (id, user_auth_id, email, roles, created_at, expires_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (id) DO UPDATE SET expires_at = EXCLUDED.expires_at
            "#,
        )
        .bind(session.id)
        .bind(session.user_auth_id)
        .bind(&session.email)
        .bind(&session.roles)
        .bind(session.created_at)
        .bind(session.expires_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get(&self, id: Uuid) -> AuthResult<Option<StoredSession>> {
        let session = sqlx::query_as::<_, StoredSession>(&format!(
            "SELECT {} FROM auth_sessions WHERE id = $1 AND expires_at > NOW()",
            SESSION_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(session)
    }

    async fn remove(&self, id: Uuid) -> AuthResult<bool> {
        let result = sqlx::query("DELETE FROM auth_sessions WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn purge_expired(&self) -> AuthResult<u64> {
        let result = sqlx::query("DELETE FROM auth_sessions WHERE expires_at <= NOW()")
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}

/// API keys in `api_keys`
#[derive(Debug, Clone)]
pub struct PgApiKeyStore {
    pool: PgPool,
}

impl PgApiKeyStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ApiKeyStore for PgApiKeyStore {
    async fn create(&self, data: NewApiKey) -> AuthResult<ApiKey> {
        let key = sqlx::query_as::<_, ApiKey>(&format!(
            r#"
            INSERT INTO api_keys (user_auth_id, name, key_prefix, key_hash, expires_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {}
            "#,
            API_KEY_COLUMNS
        ))
        .bind(data.user_auth_id)
        .bind(data.name)
        .bind(data.key_prefix)
        .bind(data.key_hash)
        .bind(data.expires_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(key)
    }

    async fn find_by_hash(&self, key_hash: &str) -> AuthResult<Option<ApiKey>> {
        let key = sqlx::query_as::<_, ApiKey>(&format!(
            r#"
            UPDATE api_keys
            SET last_used_at = NOW()
            WHERE key_hash = $1
              AND revoked_at IS NULL
              AND (expires_at IS NULL OR expires_at > NOW())
            RETURNING {}
            "#,
            API_KEY_COLUMNS
        ))
        .bind(key_hash)
        .fetch_optional(&self.pool)
        .await?;

        Ok(key)
    }

    async fn list_by_user(&self, user_auth_id: Uuid) -> AuthResult<Vec<ApiKey>> {
        let keys = sqlx::query_as::<_, ApiKey>(&format!(
            "SELECT {} FROM api_keys WHERE user_auth_id = $1 ORDER BY created_at DESC",
            API_KEY_COLUMNS
        ))
        .bind(user_auth_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(keys)
    }

    async fn revoke(&self, user_auth_id: Uuid, id: Uuid) -> AuthResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE api_keys
            SET revoked_at = NOW()
            WHERE id = $1 AND user_auth_id = $2 AND revoked_at IS NULL
            "#,
        )
        .bind(id)
        .bind(user_auth_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn purge_inactive(&self, cutoff: DateTime<Utc>) -> AuthResult<u64> {
        let result = sqlx::query(
            r#"
            DELETE FROM api_keys
            WHERE revoked_at < $1 OR expires_at < $1
            "#,
        )
        .bind(cutoff)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}
