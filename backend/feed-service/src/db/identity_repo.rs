use async_trait::async_trait;
use sqlx::PgPool;
use std::collections::HashMap;
use tracing::error;
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::models::AuthorSummary;
use crate::upstream::IdentityProvider;

pub struct PgIdentityProvider {
    pool: PgPool,
}

impl PgIdentityProvider {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl IdentityProvider for PgIdentityProvider {
    async fn get_author_summaries(&self, ids: Vec<Uuid>) -> Result<HashMap<Uuid, AuthorSummary>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let rows = sqlx::query_as::<_, (Uuid, String, Option<String>)>(
            r#"
            SELECT id, COALESCE(display_name, username) AS display_name, avatar_url
            FROM users
            WHERE id = ANY($1)
            "#,
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            error!("Failed to load author summaries: {}", e);
            AppError::Upstream(e.to_string())
        })?;

        Ok(rows
            .into_iter()
            .map(|(id, display_name, avatar)| {
                (
                    id,
                    AuthorSummary {
                        display_name,
                        avatar,
                    },
                )
            })
            .collect())
    }
}
