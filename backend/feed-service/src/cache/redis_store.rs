use async_trait::async_trait;
use chrono::{DateTime, Utc};
use redis::aio::ConnectionManager;
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

use super::{cache_key, CacheStore};
use crate::error::{AppError, Result};
use crate::models::{CachedFeed, FeedType};

/// Redis-backed feed cache. Entries carry a native `EX` matching their TTL.
#[derive(Clone)]
pub struct RedisCacheStore {
    client: Arc<ConnectionManager>,
}

impl RedisCacheStore {
    pub async fn new(redis_url: &str) -> Result<Self> {
        let client = redis::Client::open(redis_url)
            .map_err(|e| AppError::Cache(format!("Failed to create Redis client: {}", e)))?;

        let manager = ConnectionManager::new(client)
            .await
            .map_err(|e| AppError::Cache(format!("Failed to create Redis connection: {}", e)))?;

        Ok(Self {
            client: Arc::new(manager),
        })
    }

    /// Ping Redis to check connection health and keep the connection alive.
    pub async fn ping(&self) -> Result<()> {
        redis::cmd("PING")
            .query_async::<_, String>(&mut self.conn())
            .await
            .map_err(|e| {
                warn!("Redis PING failed: {}", e);
                AppError::Cache(format!("Redis health check failed: {}", e))
            })?;
        Ok(())
    }

    fn conn(&self) -> ConnectionManager {
        self.client.as_ref().clone()
    }
}

#[async_trait]
impl CacheStore for RedisCacheStore {
    async fn get(&self, user_id: Uuid, feed_type: FeedType) -> Result<Option<CachedFeed>> {
        let key = cache_key(user_id, feed_type);

        let value: Option<String> = redis::cmd("GET")
            .arg(&key)
            .query_async(&mut self.conn())
            .await
            .map_err(|e| {
                warn!("Redis GET failed for {}: {}", key, e);
                AppError::Cache(format!("Redis error: {}", e))
            })?;

        match value {
            Some(json) => Ok(Some(serde_json::from_str::<CachedFeed>(&json)?)),
            None => Ok(None),
        }
    }

    async fn put(&self, feed: CachedFeed) -> Result<()> {
        let key = cache_key(feed.user_id, feed.feed_type);
        let ttl_secs = (feed.expires_at - feed.generated_at).num_seconds().max(1);
        let json = serde_json::to_string(&feed)?;

        redis::cmd("SET")
            .arg(&key)
            .arg(&json)
            .arg("EX")
            .arg(ttl_secs)
            .query_async::<_, ()>(&mut self.conn())
            .await
            .map_err(|e| {
                warn!("Redis SET failed for {}: {}", key, e);
                AppError::Cache(format!("Redis error: {}", e))
            })?;

        Ok(())
    }

    async fn delete(&self, user_id: Uuid, feed_type: FeedType) -> Result<()> {
        let key = cache_key(user_id, feed_type);
        redis::cmd("DEL")
            .arg(&key)
            .query_async::<_, ()>(&mut self.conn())
            .await
            .map_err(|e| {
                warn!("Redis DEL failed for {}: {}", key, e);
                AppError::Cache(format!("Redis error: {}", e))
            })?;
        Ok(())
    }

    /// Uses SCAN instead of KEYS to avoid blocking Redis.
    async fn delete_user(&self, user_id: Uuid) -> Result<usize> {
        let pattern = format!("feed:{}:*", user_id);
        let mut cursor: u64 = 0;
        let mut total_deleted = 0;

        loop {
            let (next_cursor, keys): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(&pattern)
                .arg("COUNT")
                .arg(100)
                .query_async(&mut self.conn())
                .await
                .map_err(|e| {
                    warn!("Redis SCAN failed for {}: {}", pattern, e);
                    AppError::Cache(format!("Redis error: {}", e))
                })?;

            if !keys.is_empty() {
                redis::cmd("DEL")
                    .arg(&keys)
                    .query_async::<_, ()>(&mut self.conn())
                    .await
                    .map_err(|e| {
                        warn!("Redis DEL failed: {}", e);
                        AppError::Cache(format!("Redis error: {}", e))
                    })?;
                total_deleted += keys.len();
            }

            cursor = next_cursor;
            if cursor == 0 {
                break;
            }
        }

        if total_deleted > 0 {
            debug!(
                "Deleted {} feed cache keys for user {}",
                total_deleted, user_id
            );
        }
        Ok(total_deleted)
    }

    /// Redis expires entries on its own.
    async fn sweep_expired(&self, _now: DateTime<Utc>) -> Result<usize> {
        Ok(0)
    }
}
