use deadpool_redis::{Connection, Pool};
use redis::AsyncCommands;
use serde::{Serialize, de::DeserializeOwned};
use std::{sync::Arc, time::Duration};
use tracing::{debug, error, warn};

/// Best-effort JSON cache on top of a pooled redis connection.
///
/// Every failure is logged and swallowed so callers can treat the cache as
/// optional: a miss and an unreachable redis look the same.
#[derive(Clone)]
pub struct CacheStore {
    pool: Arc<Pool>,
    namespace: String,
}

impl CacheStore {
    pub fn new(pool: Pool, namespace: impl Into<String>) -> Self {
        Self {
            pool: Arc::new(pool),
            namespace: namespace.into(),
        }
    }

    fn key(&self, key: &str) -> String {
        format!("{}:{}", self.namespace, key)
    }

    async fn conn(&self) -> Option<Connection> {
        match self.pool.get().await {
            Ok(conn) => Some(conn),
            Err(e) => {
                error!("Failed to get redis connection: {:?}", e);
                None
            }
        }
    }

    pub async fn get<T>(&self, key: &str) -> Option<T>
    where
        T: DeserializeOwned,
    {
        let key = self.key(key);
        let mut conn = self.conn().await?;

        let raw: Option<String> = match conn.get(&key).await {
            Ok(raw) => raw,
            Err(e) => {
                error!("Redis GET failed for '{}': {:?}", key, e);
                return None;
            }
        };

        let Some(raw) = raw else {
            debug!("Cache miss for '{key}'");
            return None;
        };

        match serde_json::from_str::<T>(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!("Dropping undecodable cache entry '{}': {:?}", key, e);
                self.delete_raw(&mut conn, &key).await;
                None
            }
        }
    }

    pub async fn set<T>(&self, key: &str, value: &T, ttl: Duration)
    where
        T: Serialize,
    {
        let key = self.key(key);

        let json = match serde_json::to_string(value) {
            Ok(json) => json,
            Err(e) => {
                error!("Failed to serialize cache entry '{}': {:?}", key, e);
                return;
            }
        };

        let Some(mut conn) = self.conn().await else {
            return;
        };

        let result: redis::RedisResult<()> = conn.set_ex(&key, json, ttl.as_secs().max(1)).await;

        match result {
            Ok(()) => debug!("Cached '{}' for {:?}", key, ttl),
            Err(e) => error!("Redis SETEX failed for '{}': {:?}", key, e),
        }
    }

    pub async fn delete(&self, key: &str) {
        let key = self.key(key);
        if let Some(mut conn) = self.conn().await {
            self.delete_raw(&mut conn, &key).await;
        }
    }

    async fn delete_raw(&self, conn: &mut Connection, key: &str) {
        let result: redis::RedisResult<()> = conn.del(key).await;
        if let Err(e) = result {
            error!("Redis DEL failed for '{}': {:?}", key, e);
        }
    }
}
