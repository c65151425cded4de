use anyhow::{anyhow, bail, ensure, Context};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub app: AppConfig,
    #[serde(default)]
    pub database: Option<DatabaseConfig>,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub upstream: UpstreamConfig,
    #[serde(default)]
    pub ranking: RankingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub env: String,
    pub port: u16,
    pub log_level: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    Memory,
    Redis,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    pub backend: CacheBackend,
    pub redis_url: String,
    /// How often expired entries are swept from the cache store.
    pub sweep_interval_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            backend: CacheBackend::Memory,
            redis_url: "redis://127.0.0.1:6379".to_string(),
            sweep_interval_secs: 300,
        }
    }
}

/// Per-collaborator call deadlines.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamConfig {
    pub graph_timeout_secs: u64,
    pub posts_timeout_secs: u64,
    pub identity_timeout_secs: u64,
    pub interactions_timeout_secs: u64,
    pub cache_write_timeout_secs: u64,
    pub cache_invalidate_timeout_secs: u64,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            graph_timeout_secs: 5,
            posts_timeout_secs: 30,
            identity_timeout_secs: 5,
            interactions_timeout_secs: 5,
            cache_write_timeout_secs: 10,
            cache_invalidate_timeout_secs: 5,
        }
    }
}

impl UpstreamConfig {
    pub fn graph_timeout(&self) -> Duration {
        Duration::from_secs(self.graph_timeout_secs)
    }

    pub fn posts_timeout(&self) -> Duration {
        Duration::from_secs(self.posts_timeout_secs)
    }

    pub fn identity_timeout(&self) -> Duration {
        Duration::from_secs(self.identity_timeout_secs)
    }

    pub fn interactions_timeout(&self) -> Duration {
        Duration::from_secs(self.interactions_timeout_secs)
    }

    pub fn cache_write_timeout(&self) -> Duration {
        Duration::from_secs(self.cache_write_timeout_secs)
    }

    pub fn cache_invalidate_timeout(&self) -> Duration {
        Duration::from_secs(self.cache_invalidate_timeout_secs)
    }
}

/// Weights and windows used by scoring, candidate selection, diversity and caching.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankingConfig {
    pub recency_weight: f64,
    pub engagement_weight: f64,
    pub relationship_weight: f64,
    /// Divisor applied to the raw engagement score.
    pub engagement_normalizer: f64,
    pub following_affinity: f64,
    pub self_affinity: f64,
    pub public_affinity: f64,
    /// Multiplier applied once when a post shares a tag with the interest profile.
    pub interest_boost: f64,
    pub diversity_cap: usize,
    pub cache_ttl_secs: i64,
    pub interest_window_days: i64,
    pub interest_top_k: usize,
    pub personalized_window_hours: i64,
    pub following_window_hours: i64,
    pub trending_window_hours: i64,
    pub discover_window_hours: i64,
    pub trending_threshold: f64,
    pub trending_view_weight: f64,
    pub discover_interest_bonus: f64,
    pub discover_age_penalty_per_hour: f64,
    pub discover_grace_hours: f64,
    pub discover_min_likes: u64,
    /// Rows requested from the post store per generator, widened for deep pages.
    pub candidate_pool_size: usize,
    pub home_oversample: usize,
    pub default_oversample: usize,
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self {
            recency_weight: 0.30,
            engagement_weight: 0.25,
            relationship_weight: 0.20,
            engagement_normalizer: 100.0,
            following_affinity: 1.0,
            self_affinity: 0.8,
            public_affinity: 0.3,
            interest_boost: 1.2,
            diversity_cap: 3,
            cache_ttl_secs: 3600,
            interest_window_days: 30,
            interest_top_k: 10,
            personalized_window_hours: 7 * 24,
            following_window_hours: 3 * 24,
            trending_window_hours: 24,
            discover_window_hours: 2 * 24,
            trending_threshold: 10.0,
            trending_view_weight: 0.1,
            discover_interest_bonus: 10.0,
            discover_age_penalty_per_hour: 0.5,
            discover_grace_hours: 24.0,
            discover_min_likes: 5,
            candidate_pool_size: 500,
            home_oversample: 3,
            default_oversample: 2,
        }
    }
}

impl RankingConfig {
    pub fn cache_ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.cache_ttl_secs)
    }

    /// Rejects values that would break cache expiry or empty every feed.
    pub fn validate(&self) -> anyhow::Result<()> {
        ensure!(
            self.cache_ttl_secs > 0,
            "FEED_CACHE_TTL_SECS must be positive, got {}",
            self.cache_ttl_secs
        );
        ensure!(self.diversity_cap > 0, "FEED_DIVERSITY_CAP must be positive");
        ensure!(
            self.candidate_pool_size > 0,
            "FEED_CANDIDATE_POOL_SIZE must be positive"
        );
        ensure!(self.home_oversample > 0, "FEED_HOME_OVERSAMPLE must be positive");
        ensure!(
            self.default_oversample > 0,
            "FEED_DEFAULT_OVERSAMPLE must be positive"
        );
        Ok(())
    }

    fn from_env() -> anyhow::Result<Self> {
        let d = Self::default();
        let config = Self {
            recency_weight: env_or("FEED_RECENCY_WEIGHT", d.recency_weight)?,
            engagement_weight: env_or("FEED_ENGAGEMENT_WEIGHT", d.engagement_weight)?,
            relationship_weight: env_or("FEED_RELATIONSHIP_WEIGHT", d.relationship_weight)?,
            engagement_normalizer: env_or("FEED_ENGAGEMENT_NORMALIZER", d.engagement_normalizer)?,
            following_affinity: env_or("FEED_FOLLOWING_AFFINITY", d.following_affinity)?,
            self_affinity: env_or("FEED_SELF_AFFINITY", d.self_affinity)?,
            public_affinity: env_or("FEED_PUBLIC_AFFINITY", d.public_affinity)?,
            interest_boost: env_or("FEED_INTEREST_BOOST", d.interest_boost)?,
            diversity_cap: env_or("FEED_DIVERSITY_CAP", d.diversity_cap)?,
            cache_ttl_secs: env_or("FEED_CACHE_TTL_SECS", d.cache_ttl_secs)?,
            interest_window_days: env_or("FEED_INTEREST_WINDOW_DAYS", d.interest_window_days)?,
            interest_top_k: env_or("FEED_INTEREST_TOP_K", d.interest_top_k)?,
            personalized_window_hours: env_or(
                "FEED_PERSONALIZED_WINDOW_HOURS",
                d.personalized_window_hours,
            )?,
            following_window_hours: env_or(
                "FEED_FOLLOWING_WINDOW_HOURS",
                d.following_window_hours,
            )?,
            trending_window_hours: env_or("FEED_TRENDING_WINDOW_HOURS", d.trending_window_hours)?,
            discover_window_hours: env_or("FEED_DISCOVER_WINDOW_HOURS", d.discover_window_hours)?,
            trending_threshold: env_or("FEED_TRENDING_THRESHOLD", d.trending_threshold)?,
            trending_view_weight: env_or("FEED_TRENDING_VIEW_WEIGHT", d.trending_view_weight)?,
            discover_interest_bonus: env_or(
                "FEED_DISCOVER_INTEREST_BONUS",
                d.discover_interest_bonus,
            )?,
            discover_age_penalty_per_hour: env_or(
                "FEED_DISCOVER_AGE_PENALTY",
                d.discover_age_penalty_per_hour,
            )?,
            discover_grace_hours: env_or("FEED_DISCOVER_GRACE_HOURS", d.discover_grace_hours)?,
            discover_min_likes: env_or("FEED_DISCOVER_MIN_LIKES", d.discover_min_likes)?,
            candidate_pool_size: env_or("FEED_CANDIDATE_POOL_SIZE", d.candidate_pool_size)?,
            home_oversample: env_or("FEED_HOME_OVERSAMPLE", d.home_oversample)?,
            default_oversample: env_or("FEED_DEFAULT_OVERSAMPLE", d.default_oversample)?,
        };
        config.validate()?;
        Ok(config)
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let _ = dotenvy::dotenv();

        let database = match std::env::var("DATABASE_URL") {
            Ok(url) if !url.is_empty() => Some(DatabaseConfig {
                url,
                max_connections: env_or("DATABASE_MAX_CONNECTIONS", 10u32)?,
            }),
            _ => None,
        };

        let cache_defaults = CacheConfig::default();
        let backend = match std::env::var("FEED_CACHE_BACKEND")
            .unwrap_or_else(|_| "memory".to_string())
            .as_str()
        {
            "redis" => CacheBackend::Redis,
            "memory" => CacheBackend::Memory,
            other => bail!("Unknown FEED_CACHE_BACKEND '{}'", other),
        };

        let upstream_defaults = UpstreamConfig::default();

        Ok(Config {
            app: AppConfig {
                env: std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
                port: env_or("APP_PORT", 8000u16)?,
                log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            },
            database,
            cache: CacheConfig {
                backend,
                redis_url: std::env::var("REDIS_URL").unwrap_or(cache_defaults.redis_url),
                sweep_interval_secs: env_or(
                    "FEED_CACHE_SWEEP_INTERVAL_SECS",
                    cache_defaults.sweep_interval_secs,
                )?,
            },
            upstream: UpstreamConfig {
                graph_timeout_secs: env_or(
                    "GRAPH_TIMEOUT_SECS",
                    upstream_defaults.graph_timeout_secs,
                )?,
                posts_timeout_secs: env_or(
                    "POSTS_TIMEOUT_SECS",
                    upstream_defaults.posts_timeout_secs,
                )?,
                identity_timeout_secs: env_or(
                    "IDENTITY_TIMEOUT_SECS",
                    upstream_defaults.identity_timeout_secs,
                )?,
                interactions_timeout_secs: env_or(
                    "INTERACTIONS_TIMEOUT_SECS",
                    upstream_defaults.interactions_timeout_secs,
                )?,
                cache_write_timeout_secs: env_or(
                    "CACHE_WRITE_TIMEOUT_SECS",
                    upstream_defaults.cache_write_timeout_secs,
                )?,
                cache_invalidate_timeout_secs: env_or(
                    "CACHE_INVALIDATE_TIMEOUT_SECS",
                    upstream_defaults.cache_invalidate_timeout_secs,
                )?,
            },
            ranking: RankingConfig::from_env().context("Invalid ranking configuration")?,
        })
    }
}

fn env_or<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .parse()
            .map_err(|e: T::Err| anyhow!("Invalid value for {}: {}", key, e)),
        Err(_) => Ok(default),
    }
}
