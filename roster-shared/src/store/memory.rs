/// In-process store backend
///
/// Every store keeps its records behind a `tokio::sync::RwLock`. Guards are
/// never held across another await, and duplicate-email detection happens
/// under the same write lock as the insert, so concurrent registrations of
/// one email produce exactly one record.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{ApiKeyStore, SessionStore, UserStore};
use crate::error::{AuthError, AuthResult};
use crate::models::api_key::{ApiKey, NewApiKey};
use crate::models::session::StoredSession;
use crate::models::user::{normalize_email, NewUserAuth, UserAuth};

/// Accounts in insertion order
#[derive(Debug, Default)]
pub struct MemoryUserStore {
    users: RwLock<Vec<UserAuth>>,
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn create(&self, mut data: NewUserAuth) -> AuthResult<UserAuth> {
        data.email = normalize_email(&data.email);

        let mut users = self.users.write().await;
        if users.iter().any(|u| u.email == data.email) {
            return Err(AuthError::DuplicateEmail);
        }

        let user = UserAuth::from_new(data);
        users.push(user.clone());
        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> AuthResult<Option<UserAuth>> {
        let email = normalize_email(email);
        let users = self.users.read().await;
        Ok(users.iter().find(|u| u.email == email).cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> AuthResult<Option<UserAuth>> {
        let users = self.users.read().await;
        Ok(users.iter().find(|u| u.id == id).cloned())
    }

    async fn list_all(&self) -> AuthResult<Vec<UserAuth>> {
        Ok(self.users.read().await.clone())
    }

    async fn ping(&self) -> AuthResult<()> {
        Ok(())
    }
}

/// Session cache keyed by session ID
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    sessions: RwLock<HashMap<Uuid, StoredSession>>,
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn put(&self, session: StoredSession) -> AuthResult<()> {
        self.sessions.write().await.insert(session.id, session);
        Ok(())
    }

    async fn get(&self, id: Uuid) -> AuthResult<Option<StoredSession>> {
        let sessions = self.sessions.read().await;
        Ok(sessions.get(&id).filter(|s| !s.is_expired()).cloned())
    }

    async fn remove(&self, id: Uuid) -> AuthResult<bool> {
        Ok(self.sessions.write().await.remove(&id).is_some())
    }

    async fn purge_expired(&self) -> AuthResult<u64> {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, s| !s.is_expired());
        Ok((before - sessions.len()) as u64)
    }
}

/// API keys in creation order
#[derive(Debug, Default)]
pub struct MemoryApiKeyStore {
    keys: RwLock<Vec<ApiKey>>,
}

#[async_trait]
impl ApiKeyStore for MemoryApiKeyStore {
    async fn create(&self, data: NewApiKey) -> AuthResult<ApiKey> {
        let mut keys = self.keys.write().await;
        if keys.iter().any(|k| k.key_hash == data.key_hash) {
            return Err(AuthError::Internal("API key hash collision".to_string()));
        }

        let key = ApiKey::from_new(data);
        keys.push(key.clone());
        Ok(key)
    }

    async fn find_by_hash(&self, key_hash: &str) -> AuthResult<Option<ApiKey>> {
        let mut keys = self.keys.write().await;
        let found = keys
            .iter_mut()
            .find(|k| k.key_hash == key_hash && k.is_active())
            .map(|k| {
                k.last_used_at = Some(Utc::now());
                k.clone()
            });
        Ok(found)
    }

    async fn list_by_user(&self, user_auth_id: Uuid) -> AuthResult<Vec<ApiKey>> {
        let keys = self.keys.read().await;
        Ok(keys
            .iter()
            .rev()
            .filter(|k| k.user_auth_id == user_auth_id)
            .cloned()
            .collect())
    }

    async fn revoke(&self, user_auth_id: Uuid, id: Uuid) -> AuthResult<bool> {
        let mut keys = self.keys.write().await;
        match keys
            .iter_mut()
            .find(|k| k.id == id && k.user_auth_id == user_auth_id && k.revoked_at.is_none())
        {
            Some(key) => {
                key.revoked_at = Some(Utc::now());
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn purge_inactive(&self, cutoff: DateTime<Utc>) -> AuthResult<u64> {
        let mut keys = self.keys.write().await;
        let before = keys.len();
        keys.retain(|k| !k.inactive_since(cutoff));
        Ok((before - keys.len()) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::session::{AuthMethod, Session};
    use chrono::Duration;
    use std::sync::Arc;

    fn new_user(email: &str) -> NewUserAuth {
        NewUserAuth {
            email: email.to_string(),
            password_hash: "$argon2id$hash".to_string(),
            digest_ha1_hash: None,
            roles: vec![],
        }
    }

    fn new_key(user_auth_id: Uuid, hash: &str) -> NewApiKey {
        NewApiKey {
            user_auth_id,
            name: "ci".to_string(),
            key_prefix: "rk_abcdefg".to_string(),
            key_hash: hash.to_string(),
            expires_at: None,
        }
    }

    #[tokio::test]
    async fn test_create_normalizes_and_rejects_duplicates() {
        let store = MemoryUserStore::default();
        let user = store.create(new_user("  A@X.com ")).await.unwrap();
        assert_eq!(user.email, "a@x.com");

        let dup = store.create(new_user("a@X.COM")).await;
        assert!(matches!(dup, Err(AuthError::DuplicateEmail)));
        assert_eq!(store.list_all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_duplicate_registration_keeps_one_record() {
        let store = Arc::new(MemoryUserStore::default());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = store.clone();
                tokio::spawn(async move { store.create(new_user("race@x.com")).await })
            })
            .collect();

        let mut created = 0;
        for handle in handles {
            if handle.await.unwrap().is_ok() {
                created += 1;
            }
        }

        assert_eq!(created, 1);
        assert_eq!(store.list_all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_list_all_keeps_insertion_order() {
        let store = MemoryUserStore::default();
        for email in ["c@x.com", "a@x.com", "b@x.com"] {
            store.create(new_user(email)).await.unwrap();
        }

        let emails: Vec<_> = store.list_all().await.unwrap().into_iter().map(|u| u.email).collect();
        assert_eq!(emails, vec!["c@x.com", "a@x.com", "b@x.com"]);
    }

    #[tokio::test]
    async fn test_find_by_email_and_id() {
        let store = MemoryUserStore::default();
        let user = store.create(new_user("a@x.com")).await.unwrap();

        assert_eq!(store.find_by_email("A@x.COM").await.unwrap().unwrap().id, user.id);
        assert!(store.find_by_email("b@x.com").await.unwrap().is_none());
        assert_eq!(store.find_by_id(user.id).await.unwrap().unwrap().email, "a@x.com");
        assert!(store.find_by_id(Uuid::new_v4()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_session_expiry_and_purge() {
        let store = MemorySessionStore::default();
        let session = Session {
            user_auth_id: Uuid::new_v4(),
            email: "a@x.com".to_string(),
            roles: vec![],
            method: AuthMethod::Credentials,
            session_id: None,
        };

        let live = StoredSession::issue(&session, Duration::minutes(5));
        let dead = StoredSession::issue(&session, Duration::seconds(-1));
        store.put(live.clone()).await.unwrap();
        store.put(dead.clone()).await.unwrap();

        assert!(store.get(live.id).await.unwrap().is_some());
        assert!(store.get(dead.id).await.unwrap().is_none());

        assert_eq!(store.purge_expired().await.unwrap(), 1);
        assert!(store.remove(live.id).await.unwrap());
        assert!(!store.remove(live.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_api_key_lifecycle() {
        let store = MemoryApiKeyStore::default();
        let owner = Uuid::new_v4();
        let key = store.create(new_key(owner, "hash-1")).await.unwrap();

        let found = store.find_by_hash("hash-1").await.unwrap().unwrap();
        assert!(found.last_used_at.is_some());

        // Only the owner can revoke
        assert!(!store.revoke(Uuid::new_v4(), key.id).await.unwrap());
        assert!(store.revoke(owner, key.id).await.unwrap());
        assert!(!store.revoke(owner, key.id).await.unwrap());

        assert!(store.find_by_hash("hash-1").await.unwrap().is_none());
        assert_eq!(store.list_by_user(owner).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_expired_api_key_is_not_found() {
        let store = MemoryApiKeyStore::default();
        let mut data = new_key(Uuid::new_v4(), "hash-2");
        data.expires_at = Some(Utc::now() - Duration::minutes(1));
        store.create(data).await.unwrap();

        assert!(store.find_by_hash("hash-2").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_purge_inactive_keys() {
        let store = MemoryApiKeyStore::default();
        let owner = Uuid::new_v4();

        let live = store.create(new_key(owner, "live")).await.unwrap();
        let revoked = store.create(new_key(owner, "revoked")).await.unwrap();
        store.revoke(owner, revoked.id).await.unwrap();
        let mut stale = new_key(owner, "stale");
        stale.expires_at = Some(Utc::now() - Duration::days(2));
        store.create(stale).await.unwrap();

        // Inside the retention window nothing goes
        assert_eq!(store.purge_inactive(Utc::now() - Duration::days(3)).await.unwrap(), 0);
        assert_eq!(store.list_by_user(owner).await.unwrap().len(), 3);

        assert_eq!(store.purge_inactive(Utc::now() + Duration::seconds(1)).await.unwrap(), 2);
        let remaining = store.list_by_user(owner).await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].id, live.id);
    }
}
