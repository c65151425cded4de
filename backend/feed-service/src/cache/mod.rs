//! Feed cache keyed by `(user_id, feed_type)`.
//!
//! One live entry per key, TTL measured from generation time against the
//! injected [`Clock`]. Entries are replaced wholesale; there is no in-place
//! mutation, so the last writer for a key wins.
//!
//! Storage is pluggable:
//! - [`MemoryCacheStore`]: process-local `DashMap`
//! - [`RedisCacheStore`]: `feed:{user_id}:{feed_type}` keys with native expiry

mod memory;
mod redis_store;

pub use memory::MemoryCacheStore;
pub use redis_store::RedisCacheStore;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use crate::clock::Clock;
use crate::error::Result;
use crate::models::{CachedFeed, FeedItem, FeedType};

pub fn cache_key(user_id: Uuid, feed_type: FeedType) -> String {
    format!("feed:{}:{}", user_id, feed_type)
}

#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, user_id: Uuid, feed_type: FeedType) -> Result<Option<CachedFeed>>;

    /// Replace the entry for `(feed.user_id, feed.feed_type)`.
    async fn put(&self, feed: CachedFeed) -> Result<()>;

    async fn delete(&self, user_id: Uuid, feed_type: FeedType) -> Result<()>;

    /// Remove every feed type for a user. Returns the number of entries removed.
    async fn delete_user(&self, user_id: Uuid) -> Result<usize>;

    /// Remove entries whose `expires_at` is before `now`.
    async fn sweep_expired(&self, now: DateTime<Utc>) -> Result<usize>;
}

/// Outcome of a cache read.
#[derive(Debug, Clone, PartialEq)]
pub enum CacheLookup {
    Hit(CachedFeed),
    Expired,
    Miss,
}

#[derive(Clone)]
pub struct FeedCache {
    store: Arc<dyn CacheStore>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
}

impl FeedCache {
    pub fn new(store: Arc<dyn CacheStore>, clock: Arc<dyn Clock>, ttl: Duration) -> Self {
        Self { store, clock, ttl }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Read the live entry for a key, if any.
    pub async fn lookup(&self, user_id: Uuid, feed_type: FeedType) -> Result<CacheLookup> {
        match self.store.get(user_id, feed_type).await? {
            Some(feed) if feed.is_live(self.clock.now()) => {
                debug!(user_id = %user_id, feed_type = %feed_type, "Feed cache hit");
                Ok(CacheLookup::Hit(feed))
            }
            Some(_) => {
                debug!(user_id = %user_id, feed_type = %feed_type, "Feed cache entry expired");
                Ok(CacheLookup::Expired)
            }
            None => {
                debug!(user_id = %user_id, feed_type = %feed_type, "Feed cache miss");
                Ok(CacheLookup::Miss)
            }
        }
    }

    /// Stamp a freshly ranked list with `generated_at`/`expires_at`.
    pub fn entry(
        &self,
        user_id: Uuid,
        feed_type: FeedType,
        items: Vec<FeedItem>,
        generated_at: DateTime<Utc>,
    ) -> CachedFeed {
        CachedFeed {
            user_id,
            feed_type,
            items,
            generated_at,
            expires_at: generated_at + self.ttl,
        }
    }

    pub async fn store(&self, feed: CachedFeed) -> Result<()> {
        let (user_id, feed_type, len) = (feed.user_id, feed.feed_type, feed.items.len());
        self.store.put(feed).await?;
        debug!(
            user_id = %user_id,
            feed_type = %feed_type,
            items = len,
            ttl_secs = self.ttl.num_seconds(),
            "Cached feed"
        );
        Ok(())
    }

    /// Drop one `(user, feed_type)` entry.
    pub async fn refresh(&self, user_id: Uuid, feed_type: FeedType) -> Result<()> {
        self.store.delete(user_id, feed_type).await
    }

    /// Drop every cached feed for a user.
    pub async fn invalidate(&self, user_id: Uuid) -> Result<usize> {
        let removed = self.store.delete_user(user_id).await?;
        if removed > 0 {
            debug!(user_id = %user_id, removed, "Invalidated feed caches");
        }
        Ok(removed)
    }

    pub async fn sweep_expired(&self) -> Result<usize> {
        self.store.sweep_expired(self.clock.now()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    fn cache() -> (FeedCache, ManualClock) {
        let clock = ManualClock::new(Utc::now());
        let cache = FeedCache::new(
            Arc::new(MemoryCacheStore::new()),
            Arc::new(clock.clone()),
            Duration::hours(1),
        );
        (cache, clock)
    }

    #[test]
    fn test_cache_key_format() {
        let user = Uuid::nil();
        assert_eq!(
            cache_key(user, FeedType::Trending),
            "feed:00000000-0000-0000-0000-000000000000:trending"
        );
    }

    #[tokio::test]
    async fn test_entry_expires_one_ttl_after_generation() {
        let (cache, clock) = cache();
        let user = Uuid::new_v4();
        let entry = cache.entry(user, FeedType::Home, vec![], clock.now());
        assert_eq!(entry.expires_at - entry.generated_at, Duration::hours(1));

        cache.store(entry.clone()).await.unwrap();
        assert_eq!(
            cache.lookup(user, FeedType::Home).await.unwrap(),
            CacheLookup::Hit(entry)
        );

        clock.advance(Duration::minutes(61));
        assert_eq!(
            cache.lookup(user, FeedType::Home).await.unwrap(),
            CacheLookup::Expired
        );
    }

    #[tokio::test]
    async fn test_invalidate_clears_every_feed_type() {
        let (cache, clock) = cache();
        let user = Uuid::new_v4();
        let other = Uuid::new_v4();
        for feed_type in FeedType::ALL {
            cache
                .store(cache.entry(user, feed_type, vec![], clock.now()))
                .await
                .unwrap();
        }
        cache
            .store(cache.entry(other, FeedType::Home, vec![], clock.now()))
            .await
            .unwrap();

        assert_eq!(cache.invalidate(user).await.unwrap(), 4);
        for feed_type in FeedType::ALL {
            assert_eq!(
                cache.lookup(user, feed_type).await.unwrap(),
                CacheLookup::Miss
            );
        }
        assert!(matches!(
            cache.lookup(other, FeedType::Home).await.unwrap(),
            CacheLookup::Hit(_)
        ));
    }

    #[tokio::test]
    async fn test_refresh_drops_single_key() {
        let (cache, clock) = cache();
        let user = Uuid::new_v4();
        cache
            .store(cache.entry(user, FeedType::Home, vec![], clock.now()))
            .await
            .unwrap();
        cache
            .store(cache.entry(user, FeedType::Trending, vec![], clock.now()))
            .await
            .unwrap();

        cache.refresh(user, FeedType::Home).await.unwrap();
        assert_eq!(
            cache.lookup(user, FeedType::Home).await.unwrap(),
            CacheLookup::Miss
        );
        assert!(matches!(
            cache.lookup(user, FeedType::Trending).await.unwrap(),
            CacheLookup::Hit(_)
        ));
    }
}
