use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::error;
use uuid::Uuid;

use super::count;
use crate::error::{AppError, Result};
use crate::models::{InteractionType, UserInteraction};
use crate::upstream::InteractionStore;

/// Append-only `user_interactions` table.
pub struct PgInteractionStore {
    pool: PgPool,
}

impl PgInteractionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl InteractionStore for PgInteractionStore {
    async fn append(&self, interaction: UserInteraction) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO user_interactions (
                id, user_id, content_id, interaction_type, interaction_score,
                time_spent_seconds, source, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(interaction.id)
        .bind(interaction.user_id)
        .bind(interaction.content_id)
        .bind(interaction.interaction_type.as_str())
        .bind(interaction.interaction_score)
        .bind(interaction.time_spent_seconds as i64)
        .bind(interaction.source.as_str())
        .bind(interaction.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            error!("Failed to record interaction: {}", e);
            AppError::Upstream(e.to_string())
        })?;

        Ok(())
    }

    async fn list_since(
        &self,
        user_id: Uuid,
        since: DateTime<Utc>,
    ) -> Result<Vec<UserInteraction>> {
        let rows = sqlx::query_as::<
            _,
            (
                Uuid,          // id
                Uuid,          // content_id
                String,        // interaction_type
                f64,           // interaction_score
                i64,           // time_spent_seconds
                String,        // source
                DateTime<Utc>, // created_at
            ),
        >(
            r#"
            SELECT id, content_id, interaction_type, interaction_score,
                   time_spent_seconds, source, created_at
            FROM user_interactions
            WHERE user_id = $1
                AND created_at >= $2
            ORDER BY created_at DESC
            "#,
        )
        .bind(user_id)
        .bind(since)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            error!("Failed to load interactions for {}: {}", user_id, e);
            AppError::Upstream(e.to_string())
        })?;

        rows.into_iter()
            .map(
                |(id, content_id, kind, score, time_spent, source, created_at)| {
                    Ok(UserInteraction {
                        id,
                        user_id,
                        content_id,
                        interaction_type: InteractionType::from(kind),
                        interaction_score: score,
                        time_spent_seconds: count(time_spent),
                        source: source.parse()?,
                        created_at,
                    })
                },
            )
            .collect()
    }
}
