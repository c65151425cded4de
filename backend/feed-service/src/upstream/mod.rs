//! Collaborator interfaces consumed by the feed engine.
//!
//! The engine never owns posts, follows or user profiles; it reads them through
//! these traits. Every call is wrapped in [`with_deadline`] by the caller so a
//! slow collaborator surfaces as `UpstreamTimeout` rather than a hung request.

pub mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::time::Duration;
use tokio::time::timeout;
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::models::{AuthorSummary, Post, UserInteraction};

/// Which visibility rules a query applies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Audience {
    /// Only publicly visible posts.
    Public,
    /// Public posts, friends-only posts from followees, and the viewer's own posts.
    Viewer {
        viewer_id: Uuid,
        following: HashSet<Uuid>,
    },
}

/// Tag-based eligibility.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagFilter {
    pub tags: HashSet<String>,
    /// When set, posts with at least this many likes pass even without a tag match.
    pub or_min_likes: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostFilter {
    pub audience: Audience,
    pub created_after: DateTime<Utc>,
    /// Restrict to these authors when present.
    pub authors: Option<HashSet<Uuid>>,
    pub excluded_authors: HashSet<Uuid>,
    pub tags: Option<TagFilter>,
}

impl PostFilter {
    pub fn new(audience: Audience, created_after: DateTime<Utc>) -> Self {
        Self {
            audience,
            created_after,
            authors: None,
            excluded_authors: HashSet::new(),
            tags: None,
        }
    }

    pub fn authors(mut self, authors: HashSet<Uuid>) -> Self {
        self.authors = Some(authors);
        self
    }

    pub fn excluding(mut self, authors: HashSet<Uuid>) -> Self {
        self.excluded_authors = authors;
        self
    }

    pub fn tags(mut self, tags: TagFilter) -> Self {
        self.tags = Some(tags);
        self
    }

    /// Evaluate the filter against a single post. Used by in-memory stores.
    pub fn matches(&self, post: &Post) -> bool {
        use crate::models::Visibility;

        if post.created_at < self.created_after {
            return false;
        }
        if let Some(authors) = &self.authors {
            if !authors.contains(&post.author_id) {
                return false;
            }
        }
        if self.excluded_authors.contains(&post.author_id) {
            return false;
        }

        let visible = match &self.audience {
            Audience::Public => post.visibility == Visibility::Public,
            Audience::Viewer {
                viewer_id,
                following,
            } => {
                post.visibility == Visibility::Public
                    || post.author_id == *viewer_id
                    || (post.visibility == Visibility::Friends
                        && following.contains(&post.author_id))
            }
        };
        if !visible {
            return false;
        }

        match &self.tags {
            None => true,
            Some(filter) => {
                post.has_any_tag(&filter.tags)
                    || filter
                        .or_min_likes
                        .map(|min| post.likes_count >= min)
                        .unwrap_or(false)
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostSort {
    NewestFirst,
    /// `likes + 2·comments + 3·shares` descending, newest first on ties.
    MostEngaged,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostQuery {
    pub filter: PostFilter,
    pub sort: PostSort,
    pub limit: usize,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SocialGraph: Send + Sync {
    /// Accepted followees of `user_id`.
    async fn get_following(&self, user_id: Uuid) -> Result<HashSet<Uuid>>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PostStore: Send + Sync {
    async fn query_posts(&self, query: PostQuery) -> Result<Vec<Post>>;

    async fn get_posts(&self, ids: Vec<Uuid>) -> Result<Vec<Post>>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn get_author_summaries(&self, ids: Vec<Uuid>) -> Result<HashMap<Uuid, AuthorSummary>>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait InteractionStore: Send + Sync {
    async fn append(&self, interaction: UserInteraction) -> Result<()>;

    async fn list_since(&self, user_id: Uuid, since: DateTime<Utc>)
        -> Result<Vec<UserInteraction>>;
}

/// Run an upstream call under a deadline. Expiry maps to `UpstreamTimeout`;
/// there is no retry.
pub async fn with_deadline<F, T>(operation: &'static str, deadline: Duration, future: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match timeout(deadline, future).await {
        Ok(result) => result,
        Err(_) => {
            tracing::warn!(
                operation,
                deadline_ms = deadline.as_millis() as u64,
                "Upstream call exceeded deadline"
            );
            Err(AppError::UpstreamTimeout {
                operation,
                deadline,
            })
        }
    }
}
