use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::{AsyncCommands, RedisError};
use shared::errors::{Result, ServiceError};
use shared::{User, UserId};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, error};

use crate::state::ConversationState;

const USER_KEY_PREFIX: &str = "user_";
const STATE_KEY_PREFIX: &str = "state_";

/// Opaque string key-value capability backing all per-user data.
#[async_trait]
pub trait StateStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;
    async fn put(&self, key: &str, value: String) -> Result<()>;
    async fn delete(&self, key: &str) -> Result<()>;
    async fn count_keys(&self, prefix: &str) -> Result<usize>;
}

#[derive(Clone)]
pub struct RedisStore {
    redis: MultiplexedConnection,
}

impl RedisStore {
    pub fn new(redis: MultiplexedConnection) -> Self {
        Self { redis }
    }

    pub async fn connect(url: &str) -> Result<Self> {
        let client = redis::Client::open(url)?;
        let redis = client.get_multiplexed_tokio_connection().await?;
        Ok(Self::new(redis))
    }
}

#[async_trait]
impl StateStore for RedisStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut conn = self.redis.clone();

        conn.get(key).await.map_err(|e: RedisError| {
            error!(key = key, error = %e, "Failed to read key from Redis");
            ServiceError::Storage(e.to_string())
        })
    }

    async fn put(&self, key: &str, value: String) -> Result<()> {
        let mut conn = self.redis.clone();

        conn.set(key, value).await.map_err(|e: RedisError| {
            error!(key = key, error = %e, "Failed to write key to Redis");
            ServiceError::Storage(e.to_string())
        })
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let mut conn = self.redis.clone();

        conn.del(key).await.map_err(|e: RedisError| {
            error!(key = key, error = %e, "Failed to delete key from Redis");
            ServiceError::Storage(e.to_string())
        })
    }

    async fn count_keys(&self, prefix: &str) -> Result<usize> {
        let mut conn = self.redis.clone();

        let keys: Vec<String> = conn.keys(format!("{}*", prefix)).await.map_err(|e: RedisError| {
            error!(prefix = prefix, error = %e, "Failed to list keys in Redis");
            ServiceError::Storage(e.to_string())
        })?;

        Ok(keys.len())
    }
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    entries: Arc<RwLock<HashMap<String, String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }
}

#[async_trait]
impl StateStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn put(&self, key: &str, value: String) -> Result<()> {
        self.entries.write().await.insert(key.to_string(), value);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.entries.write().await.remove(key);
        Ok(())
    }

    async fn count_keys(&self, prefix: &str) -> Result<usize> {
        Ok(self
            .entries
            .read()
            .await
            .keys()
            .filter(|k| k.starts_with(prefix))
            .count())
    }
}

pub fn user_key(user_id: UserId) -> String {
    format!("{}{}", USER_KEY_PREFIX, user_id)
}

pub fn state_key(user_id: UserId) -> String {
    format!("{}{}", STATE_KEY_PREFIX, user_id)
}

/// Typed access to the `user_<id>` and `state_<id>` keys.
#[derive(Clone)]
pub struct StateRepository {
    store: Arc<dyn StateStore>,
}

impl StateRepository {
    pub fn new(store: Arc<dyn StateStore>) -> Self {
        Self { store }
    }

    pub async fn get_user(&self, user_id: UserId) -> Result<Option<User>> {
        match self.store.get(&user_key(user_id)).await? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    pub async fn save_user(&self, user: &User) -> Result<()> {
        let raw = serde_json::to_string(user)
            .map_err(|e| ServiceError::Internal(format!("Failed to encode user: {}", e)))?;
        self.store.put(&user_key(user.telegram_id), raw).await
    }

    pub async fn get_state(&self, user_id: UserId) -> Result<ConversationState> {
        match self.store.get(&state_key(user_id)).await? {
            Some(raw) => Ok(serde_json::from_str(&raw)?),
            None => {
                debug!(user_id = %user_id, "No stored state, treating as idle");
                Ok(ConversationState::Idle)
            }
        }
    }

    pub async fn set_state(&self, user_id: UserId, state: &ConversationState) -> Result<()> {
        let raw = serde_json::to_string(state)
            .map_err(|e| ServiceError::Internal(format!("Failed to encode state: {}", e)))?;
        self.store.put(&state_key(user_id), raw).await
    }

    pub async fn clear_state(&self, user_id: UserId) -> Result<()> {
        self.store.delete(&state_key(user_id)).await
    }

    pub async fn count_users(&self) -> Result<usize> {
        self.store.count_keys(USER_KEY_PREFIX).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::FullName;

    fn repository() -> (MemoryStore, StateRepository) {
        let store = MemoryStore::new();
        let repo = StateRepository::new(Arc::new(store.clone()));
        (store, repo)
    }

    #[test]
    fn test_keys_are_namespaced() {
        assert_eq!(user_key(UserId(42)), "user_42");
        assert_eq!(state_key(UserId(42)), "state_42");
    }

    #[tokio::test]
    async fn test_missing_state_is_idle() {
        let (_, repo) = repository();
        assert_eq!(repo.get_state(UserId(1)).await.unwrap(), ConversationState::Idle);
    }

    #[tokio::test]
    async fn test_state_round_trip() {
        let (_, repo) = repository();
        let state = ConversationState::WaitingRegistration;

        repo.set_state(UserId(5), &state).await.unwrap();

        assert_eq!(repo.get_state(UserId(5)).await.unwrap(), state);
    }

    #[tokio::test]
    async fn test_clear_state() {
        let (store, repo) = repository();
        repo.set_state(UserId(5), &ConversationState::WaitingStartTime).await.unwrap();
        repo.clear_state(UserId(5)).await.unwrap();

        assert_eq!(store.len().await, 0);
        assert_eq!(repo.get_state(UserId(5)).await.unwrap(), ConversationState::Idle);
    }

    #[tokio::test]
    async fn test_malformed_state_is_storage_error() {
        let (store, repo) = repository();
        store.put("state_9", "{not json".to_string()).await.unwrap();

        let err = repo.get_state(UserId(9)).await.unwrap_err();
        assert!(matches!(err, ServiceError::Storage(_)));
    }

    #[tokio::test]
    async fn test_user_round_trip() {
        let (store, repo) = repository();
        let user = User::new(UserId(77), FullName::new("Petrov Petr").unwrap());

        repo.save_user(&user).await.unwrap();

        assert_eq!(repo.get_user(UserId(77)).await.unwrap(), Some(user));
        assert_eq!(repo.count_users().await.unwrap(), 1);
        assert_eq!(store.count_keys("state_").await.unwrap(), 0);
        assert!(repo.get_user(UserId(78)).await.unwrap().is_none());
    }
}
