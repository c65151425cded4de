use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use uuid::Uuid;

use super::CacheStore;
use crate::error::Result;
use crate::models::{CachedFeed, FeedType};

/// Process-local cache store. Expired entries linger until read-filtered or swept.
#[derive(Default)]
pub struct MemoryCacheStore {
    entries: DashMap<(Uuid, FeedType), CachedFeed>,
}

impl MemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl CacheStore for MemoryCacheStore {
    async fn get(&self, user_id: Uuid, feed_type: FeedType) -> Result<Option<CachedFeed>> {
        Ok(self
            .entries
            .get(&(user_id, feed_type))
            .map(|entry| entry.value().clone()))
    }

    async fn put(&self, feed: CachedFeed) -> Result<()> {
        self.entries.insert((feed.user_id, feed.feed_type), feed);
        Ok(())
    }

    async fn delete(&self, user_id: Uuid, feed_type: FeedType) -> Result<()> {
        self.entries.remove(&(user_id, feed_type));
        Ok(())
    }

    async fn delete_user(&self, user_id: Uuid) -> Result<usize> {
        let removed = FeedType::ALL
            .iter()
            .filter(|feed_type| self.entries.remove(&(user_id, **feed_type)).is_some())
            .count();
        Ok(removed)
    }

    async fn sweep_expired(&self, now: DateTime<Utc>) -> Result<usize> {
        let before = self.entries.len();
        self.entries.retain(|_, feed| feed.is_live(now));
        Ok(before.saturating_sub(self.entries.len()))
    }
}
