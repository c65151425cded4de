use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::error;
use uuid::Uuid;

use super::count;
use crate::error::{AppError, Result};
use crate::models::{Post, Visibility};
use crate::upstream::{Audience, PostQuery, PostSort, PostStore};

const POST_COLUMNS: &str = r#"
    id, user_id, visibility, hashtags,
    likes_count, comments_count, shares_count, views_count,
    is_promoted, created_at
"#;

#[derive(Debug, sqlx::FromRow)]
struct PostRow {
    id: Uuid,
    user_id: Uuid,
    visibility: String,
    hashtags: Vec<String>,
    likes_count: i64,
    comments_count: i64,
    shares_count: i64,
    views_count: i64,
    is_promoted: bool,
    created_at: DateTime<Utc>,
}

impl From<PostRow> for Post {
    fn from(row: PostRow) -> Self {
        Post {
            id: row.id,
            author_id: row.user_id,
            visibility: Visibility::from_db(&row.visibility),
            created_at: row.created_at,
            likes_count: count(row.likes_count),
            comments_count: count(row.comments_count),
            shares_count: count(row.shares_count),
            views_count: count(row.views_count),
            hashtags: row.hashtags,
            is_promoted: row.is_promoted,
        }
    }
}

/// Reads live (not soft-deleted) posts.
pub struct PgPostStore {
    pool: PgPool,
}

impl PgPostStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PostStore for PgPostStore {
    async fn query_posts(&self, query: PostQuery) -> Result<Vec<Post>> {
        let filter = &query.filter;
        let (viewer_id, following): (Option<Uuid>, Vec<Uuid>) = match &filter.audience {
            Audience::Public => (None, Vec::new()),
            Audience::Viewer {
                viewer_id,
                following,
            } => (Some(*viewer_id), following.iter().copied().collect()),
        };
        let authors: Option<Vec<Uuid>> = filter
            .authors
            .as_ref()
            .map(|a| a.iter().copied().collect());
        let excluded: Vec<Uuid> = filter.excluded_authors.iter().copied().collect();
        let tags: Option<Vec<String>> = filter
            .tags
            .as_ref()
            .map(|t| t.tags.iter().cloned().collect());
        let or_min_likes: Option<i64> = filter
            .tags
            .as_ref()
            .and_then(|t| t.or_min_likes)
            .map(|likes| likes as i64);
        let sort = match query.sort {
            PostSort::NewestFirst => "newest",
            PostSort::MostEngaged => "engagement",
        };

        let sql = format!(
            r#"
            SELECT {POST_COLUMNS}
            FROM posts
            WHERE deleted_at IS NULL
                AND created_at >= $1
                AND ($2::UUID[] IS NULL OR user_id = ANY($2))
                AND NOT (user_id = ANY($3))
                AND (
                    visibility = 'public'
                    OR ($4::UUID IS NOT NULL AND user_id = $4)
                    OR (visibility = 'friends' AND user_id = ANY($5))
                )
                AND (
                    $6::TEXT[] IS NULL
                    OR hashtags && $6
                    OR ($7::BIGINT IS NOT NULL AND likes_count >= $7)
                )
            ORDER BY
                CASE WHEN $8 = 'engagement'
                    THEN likes_count + 2 * comments_count + 3 * shares_count
                END DESC NULLS LAST,
                created_at DESC
            LIMIT $9
            "#
        );

        let rows = sqlx::query_as::<_, PostRow>(&sql)
            .bind(filter.created_after)
            .bind(authors)
            .bind(excluded)
            .bind(viewer_id)
            .bind(following)
            .bind(tags)
            .bind(or_min_likes)
            .bind(sort)
            .bind(i64::try_from(query.limit).unwrap_or(i64::MAX))
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                error!("Failed to query feed candidates: {}", e);
                AppError::Upstream(e.to_string())
            })?;

        Ok(rows.into_iter().map(Post::from).collect())
    }

    async fn get_posts(&self, ids: Vec<Uuid>) -> Result<Vec<Post>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let sql = format!(
            "SELECT {POST_COLUMNS} FROM posts WHERE id = ANY($1) AND deleted_at IS NULL"
        );
        let rows = sqlx::query_as::<_, PostRow>(&sql)
            .bind(ids)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                error!("Failed to load posts by id: {}", e);
                AppError::Upstream(e.to_string())
            })?;

        Ok(rows.into_iter().map(Post::from).collect())
    }
}
