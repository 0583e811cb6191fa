/// Persistence for accounts, session cache entries and API keys
///
/// Each concern is an `async_trait` so the service layer can run against
/// Postgres in production and against in-process maps in tests and local
/// development.
///
/// # Backends
///
/// - `postgres`: sqlx queries against the embedded migrations
/// - `memory`: `tokio::sync::RwLock` maps, lost on restart
///
/// # Example
///
/// ```
/// use roster_shared::models::user::NewUserAuth;
/// use roster_shared::store::Stores;
///
/// # async fn example() -> Result<(), roster_shared::error::AuthError> {
/// let stores = Stores::memory();
/// let user = stores.users.create(NewUserAuth {
///     email: "a@x.com".to_string(),
///     password_hash: "$argon2id$...".to_string(),
///     digest_ha1_hash: None,
///     roles: vec![],
/// }).await?;
///
/// assert!(stores.users.find_by_email("A@X.com").await?.is_some());
/// # let _ = user;
/// # Ok(())
/// # }
/// ```

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::AuthResult;
use crate::models::api_key::{ApiKey, NewApiKey};
use crate::models::session::StoredSession;
use crate::models::user::{NewUserAuth, UserAuth};

/// Registered accounts
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Persists a new account
    ///
    /// Fails with `DuplicateEmail` when the (normalized) email exists.
    async fn create(&self, data: NewUserAuth) -> AuthResult<UserAuth>;

    /// Case-insensitive lookup
    async fn find_by_email(&self, email: &str) -> AuthResult<Option<UserAuth>>;

    async fn find_by_id(&self, id: Uuid) -> AuthResult<Option<UserAuth>>;

    /// All accounts in insertion order
    async fn list_all(&self) -> AuthResult<Vec<UserAuth>>;

    /// Readiness check
    async fn ping(&self) -> AuthResult<()>;
}

/// Session cache
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn put(&self, session: StoredSession) -> AuthResult<()>;

    /// Returns the entry only while it is unexpired
    async fn get(&self, id: Uuid) -> AuthResult<Option<StoredSession>>;

    /// Returns whether an entry was removed
    async fn remove(&self, id: Uuid) -> AuthResult<bool>;

    /// Drops expired entries, returning how many were removed
    async fn purge_expired(&self) -> AuthResult<u64>;
}

/// API keys
#[async_trait]
pub trait ApiKeyStore: Send + Sync {
    async fn create(&self, data: NewApiKey) -> AuthResult<ApiKey>;

    /// Looks up an active (unrevoked, unexpired) key and records its use
    async fn find_by_hash(&self, key_hash: &str) -> AuthResult<Option<ApiKey>>;

    /// All keys owned by a user, newest first
    async fn list_by_user(&self, user_auth_id: Uuid) -> AuthResult<Vec<ApiKey>>;

    /// Revokes a key owned by `user_auth_id`
    ///
    /// Returns `false` when the key does not exist, belongs to someone else or
    /// is already revoked.
    async fn revoke(&self, user_auth_id: Uuid, id: Uuid) -> AuthResult<bool>;

    /// Deletes keys revoked or expired before `cutoff`, returning how many
    async fn purge_inactive(&self, cutoff: DateTime<Utc>) -> AuthResult<u64>;
}

/// The three stores, wired against one backend
#[derive(Clone)]
pub struct Stores {
    pub users: Arc<dyn UserStore>,
    pub sessions: Arc<dyn SessionStore>,
    pub api_keys: Arc<dyn ApiKeyStore>,
}

impl Stores {
    /// In-process stores
    pub fn memory() -> Self {
        Self {
            users: Arc::new(memory::MemoryUserStore::default()),
            sessions: Arc::new(memory::MemorySessionStore::default()),
            api_keys: Arc::new(memory::MemoryApiKeyStore::default()),
        }
    }

    /// Postgres stores sharing one pool
    pub fn postgres(pool: PgPool) -> Self {
        Self {
            users: Arc::new(postgres::PgUserStore::new(pool.clone())),
            sessions: Arc::new(postgres::PgSessionStore::new(pool.clone())),
            api_keys: Arc::new(postgres::PgApiKeyStore::new(pool)),
        }
    }
}
