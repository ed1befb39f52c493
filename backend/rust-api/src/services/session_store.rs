use std::collections::HashMap;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use tokio::sync::Mutex;

use super::repository::StoreError;
use crate::metrics::track_cache_operation;
use crate::models::TestSession;

/// Storage for in-progress test sessions between requests.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn save(&self, session: &TestSession) -> Result<(), StoreError>;
    async fn load(&self, session_id: &str) -> Result<Option<TestSession>, StoreError>;
    /// Deletes the session. Returns `false` when it was already gone.
    async fn remove(&self, session_id: &str) -> Result<bool, StoreError>;
    async fn ping(&self) -> Result<(), StoreError>;
}

fn session_key(session_id: &str) -> String {
    format!("test_session:{}", session_id)
}

pub struct RedisSessionStore {
    redis: ConnectionManager,
    ttl_seconds: u64,
}

impl RedisSessionStore {
    pub fn new(redis: ConnectionManager, ttl_seconds: u64) -> Self {
        Self { redis, ttl_seconds }
    }
}

#[async_trait]
impl SessionStore for RedisSessionStore {
    async fn save(&self, session: &TestSession) -> Result<(), StoreError> {
        let mut conn = self.redis.clone();
        let payload = serde_json::to_string(session).map_err(StoreError::write)?;

        // TTL is refreshed on every save, so it counts from the last interaction
        track_cache_operation("setex", async {
            redis::cmd("SETEX")
                .arg(session_key(&session.id))
                .arg(self.ttl_seconds)
                .arg(payload)
                .query_async::<()>(&mut conn)
                .await
                .map_err(StoreError::write)
        })
        .await
    }

    async fn load(&self, session_id: &str) -> Result<Option<TestSession>, StoreError> {
        let mut conn = self.redis.clone();

        let payload: Option<String> = track_cache_operation("get", async {
            redis::cmd("GET")
                .arg(session_key(session_id))
                .query_async::<Option<String>>(&mut conn)
                .await
                .map_err(StoreError::query)
        })
        .await?;

        payload
            .map(|json| serde_json::from_str(&json).map_err(StoreError::query))
            .transpose()
    }

    async fn remove(&self, session_id: &str) -> Result<bool, StoreError> {
        let mut conn = self.redis.clone();

        let deleted: u64 = track_cache_operation("del", async {
            redis::cmd("DEL")
                .arg(session_key(session_id))
                .query_async::<u64>(&mut conn)
                .await
                .map_err(StoreError::write)
        })
        .await?;

        Ok(deleted > 0)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        let mut conn = self.redis.clone();
        tokio::time::timeout(
            std::time::Duration::from_millis(500),
            redis::cmd("PING").query_async::<String>(&mut conn),
        )
        .await
        .map_err(|_| StoreError::Unavailable("Redis timeout after 500ms".to_string()))?
        .map_err(|e| StoreError::Unavailable(format!("Redis error: {}", e)))?;
        Ok(())
    }
}

/// Process-local session store. Sessions never expire.
#[derive(Default)]
pub struct InMemorySessionStore {
    sessions: Mutex<HashMap<String, TestSession>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.sessions.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.lock().await.is_empty()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn save(&self, session: &TestSession) -> Result<(), StoreError> {
        self.sessions
            .lock()
            .await
            .insert(session.id.clone(), session.clone());
        Ok(())
    }

    async fn load(&self, session_id: &str) -> Result<Option<TestSession>, StoreError> {
        Ok(self.sessions.lock().await.get(session_id).cloned())
    }

    async fn remove(&self, session_id: &str) -> Result<bool, StoreError> {
        Ok(self.sessions.lock().await.remove(session_id).is_some())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
