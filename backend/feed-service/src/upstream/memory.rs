//! In-process collaborators used for local development and tests.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

use super::{IdentityProvider, InteractionStore, PostQuery, PostSort, PostStore, SocialGraph};
use crate::error::Result;
use crate::models::{AuthorSummary, Post, UserInteraction};

#[derive(Default)]
pub struct InMemorySocialGraph {
    following: DashMap<Uuid, HashSet<Uuid>>,
}

impl InMemorySocialGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn follow(&self, follower: Uuid, followee: Uuid) {
        self.following.entry(follower).or_default().insert(followee);
    }

    pub fn unfollow(&self, follower: Uuid, followee: Uuid) {
        if let Some(mut set) = self.following.get_mut(&follower) {
            set.remove(&followee);
        }
    }
}

#[async_trait]
impl SocialGraph for InMemorySocialGraph {
    async fn get_following(&self, user_id: Uuid) -> Result<HashSet<Uuid>> {
        Ok(self
            .following
            .get(&user_id)
            .map(|set| set.clone())
            .unwrap_or_default())
    }
}

#[derive(Default)]
pub struct InMemoryPostStore {
    posts: DashMap<Uuid, Post>,
}

impl InMemoryPostStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, post: Post) {
        self.posts.insert(post.id, post);
    }
}

#[async_trait]
impl PostStore for InMemoryPostStore {
    async fn query_posts(&self, query: PostQuery) -> Result<Vec<Post>> {
        let mut posts: Vec<Post> = self
            .posts
            .iter()
            .filter(|entry| query.filter.matches(entry.value()))
            .map(|entry| entry.value().clone())
            .collect();

        match query.sort {
            PostSort::NewestFirst => {
                posts.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)))
            }
            PostSort::MostEngaged => posts.sort_by(|a, b| {
                b.engagement_score()
                    .partial_cmp(&a.engagement_score())
                    .unwrap_or(std::cmp::Ordering::Equal)
                    .then(b.created_at.cmp(&a.created_at))
                    .then(a.id.cmp(&b.id))
            }),
        }

        posts.truncate(query.limit);
        Ok(posts)
    }

    async fn get_posts(&self, ids: Vec<Uuid>) -> Result<Vec<Post>> {
        Ok(ids
            .iter()
            .filter_map(|id| self.posts.get(id).map(|p| p.value().clone()))
            .collect())
    }
}

#[derive(Default)]
pub struct InMemoryIdentityProvider {
    authors: DashMap<Uuid, AuthorSummary>,
}

impl InMemoryIdentityProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, user_id: Uuid, summary: AuthorSummary) {
        self.authors.insert(user_id, summary);
    }
}

#[async_trait]
impl IdentityProvider for InMemoryIdentityProvider {
    async fn get_author_summaries(&self, ids: Vec<Uuid>) -> Result<HashMap<Uuid, AuthorSummary>> {
        Ok(ids
            .into_iter()
            .filter_map(|id| self.authors.get(&id).map(|a| (id, a.value().clone())))
            .collect())
    }
}

#[derive(Default)]
pub struct InMemoryInteractionStore {
    by_user: DashMap<Uuid, Vec<UserInteraction>>,
}

impl InMemoryInteractionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count_for(&self, user_id: Uuid) -> usize {
        self.by_user.get(&user_id).map(|v| v.len()).unwrap_or(0)
    }
}

#[async_trait]
impl InteractionStore for InMemoryInteractionStore {
    async fn append(&self, interaction: UserInteraction) -> Result<()> {
        self.by_user
            .entry(interaction.user_id)
            .or_default()
            .push(interaction);
        Ok(())
    }

    async fn list_since(
        &self,
        user_id: Uuid,
        since: DateTime<Utc>,
    ) -> Result<Vec<UserInteraction>> {
        Ok(self
            .by_user
            .get(&user_id)
            .map(|records| {
                records
                    .iter()
                    .filter(|r| r.created_at >= since)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }
}
