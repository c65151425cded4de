//! Personalized feed ranking and caching engine.
//!
//! Candidates come from four strategies (home, following, trending, discover),
//! are scored on recency, engagement and relationship, capped per author and
//! cached per `(user, feed_type)` for one TTL window. Interactions feed an
//! on-demand interest profile and invalidate the user's cached feeds.

pub mod cache;
pub mod clock;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod jobs;
pub mod metrics;
pub mod models;
pub mod services;
pub mod tasks;
pub mod upstream;
pub mod utils;

pub use cache::{CacheStore, FeedCache, MemoryCacheStore, RedisCacheStore};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{Config, RankingConfig, UpstreamConfig};
pub use error::{AppError, Result};
pub use models::{FeedItem, FeedReason, FeedType, Post, UserInteraction, Visibility};
pub use services::{Collaborators, FeedEngine, FeedPage};
pub use tasks::{FeedTask, TaskDispatcher, TaskFailure};
