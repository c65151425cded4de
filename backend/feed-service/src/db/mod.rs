//! PostgreSQL implementations of the collaborator traits.
//!
//! Queries are runtime-checked (`sqlx::query_as`), so the crate builds
//! without a live database. Schema lives in `migrations/`.

pub mod graph_repo;
pub mod identity_repo;
pub mod interaction_repo;
pub mod posts_repo;

pub use graph_repo::PgSocialGraph;
pub use identity_repo::PgIdentityProvider;
pub use interaction_repo::PgInteractionStore;
pub use posts_repo::PgPostStore;

use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;
use tracing::info;

use crate::config::DatabaseConfig;

pub async fn create_pool(config: &DatabaseConfig) -> Result<PgPool, sqlx::Error> {
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(Duration::from_secs(10))
        .idle_timeout(Duration::from_secs(600))
        .test_before_acquire(true)
        .connect(&config.url)
        .await?;

    sqlx::query("SELECT 1").execute(&pool).await?;
    info!(
        max_connections = config.max_connections,
        "Database pool created and verified"
    );
    Ok(pool)
}

/// Counters are stored as BIGINT; negative values never reach the engine.
pub(crate) fn count(value: i64) -> u64 {
    value.max(0) as u64
}
