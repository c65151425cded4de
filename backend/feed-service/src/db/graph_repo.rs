use async_trait::async_trait;
use sqlx::PgPool;
use std::collections::HashSet;
use tracing::error;
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::upstream::SocialGraph;

/// Follow edges from the `follows` table. Pending requests are not followees.
pub struct PgSocialGraph {
    pool: PgPool,
}

impl PgSocialGraph {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SocialGraph for PgSocialGraph {
    async fn get_following(&self, user_id: Uuid) -> Result<HashSet<Uuid>> {
        let following = sqlx::query_scalar::<_, Uuid>(
            r#"
            SELECT following_id
            FROM follows
            WHERE follower_id = $1
                AND status = 'accepted'
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            error!("Failed to load following set for {}: {}", user_id, e);
            AppError::Upstream(e.to_string())
        })?;

        Ok(following.into_iter().collect())
    }
}
