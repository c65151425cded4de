//! Candidate selection strategies.
//!
//! Each feed mode is bound to one generator through an exhaustive match on
//! [`FeedType`]; Home additionally blends the Trending and Discover pools into
//! the personalized pool on a single score scale.

mod discover;
mod following;
mod personalized;
mod trending;

pub use discover::DiscoverGenerator;
pub use following::FollowingGenerator;
pub use personalized::PersonalizedGenerator;
pub use trending::TrendingGenerator;

use chrono::{DateTime, Utc};
use std::cmp::Ordering;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;
use uuid::Uuid;

use super::scoring::{Scorer, ScoringContext};
use crate::error::Result;
use crate::models::{FeedReason, FeedType, Post};
use crate::upstream::{with_deadline, PostQuery, PostStore};

/// A scored candidate produced by a generator.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub post: Post,
    pub score: f64,
    pub reason: FeedReason,
}

/// Inputs shared by all generators for one request.
#[derive(Debug, Clone, Copy)]
pub struct GenerationContext<'a> {
    pub user_id: Uuid,
    pub following: &'a HashSet<Uuid>,
    pub interest_tags: &'a HashSet<String>,
    pub now: DateTime<Utc>,
    pub limit: usize,
}

impl<'a> GenerationContext<'a> {
    pub fn scoring(&self) -> ScoringContext<'a> {
        ScoringContext {
            user_id: self.user_id,
            following: self.following,
            interest_tags: self.interest_tags,
            now: self.now,
        }
    }

    pub fn since_hours(&self, hours: i64) -> DateTime<Utc> {
        self.now - chrono::Duration::hours(hours)
    }
}

/// Post store access bounded by the configured deadline.
#[derive(Clone)]
pub struct CandidateSource {
    store: Arc<dyn PostStore>,
    deadline: Duration,
}

impl CandidateSource {
    pub fn new(store: Arc<dyn PostStore>, deadline: Duration) -> Self {
        Self { store, deadline }
    }

    pub async fn fetch(&self, query: PostQuery) -> Result<Vec<Post>> {
        with_deadline("query_posts", self.deadline, self.store.query_posts(query)).await
    }
}

/// Score descending, then newest first, then post id for a total order.
pub fn compare_candidates(a: &Candidate, b: &Candidate) -> Ordering {
    b.score
        .partial_cmp(&a.score)
        .unwrap_or(Ordering::Equal)
        .then_with(|| b.post.created_at.cmp(&a.post.created_at))
        .then_with(|| a.post.id.cmp(&b.post.id))
}

pub fn sort_candidates(candidates: &mut [Candidate]) {
    candidates.sort_by(compare_candidates);
}

pub struct Generators {
    personalized: PersonalizedGenerator,
    following: FollowingGenerator,
    trending: TrendingGenerator,
    discover: DiscoverGenerator,
    scorer: Scorer,
}

impl Generators {
    pub fn new(source: CandidateSource, scorer: Scorer) -> Self {
        Self {
            personalized: PersonalizedGenerator::new(source.clone(), scorer.clone()),
            following: FollowingGenerator::new(source.clone(), scorer.clone()),
            trending: TrendingGenerator::new(source.clone(), scorer.clone()),
            discover: DiscoverGenerator::new(source, scorer.clone()),
            scorer,
        }
    }

    pub async fn generate(
        &self,
        feed_type: FeedType,
        ctx: &GenerationContext<'_>,
    ) -> Result<Vec<Candidate>> {
        let candidates = match feed_type {
            FeedType::Home => self.blend_home(ctx).await?,
            FeedType::Following => self.following.generate(ctx).await?,
            FeedType::Trending => self.trending.generate(ctx).await?,
            FeedType::Discover => self.discover.generate(ctx).await?,
        };

        debug!(
            user_id = %ctx.user_id,
            feed_type = %feed_type,
            candidates = candidates.len(),
            "Generated feed candidates"
        );
        Ok(candidates)
    }

    /// Personalized pool plus Trending and Discover contributions. Secondary
    /// pools are re-scored with the full scoring function; a post seen in an
    /// earlier pool keeps that pool's entry.
    async fn blend_home(&self, ctx: &GenerationContext<'_>) -> Result<Vec<Candidate>> {
        let (personalized, trending, discover) = tokio::try_join!(
            self.personalized.generate(ctx),
            self.trending.generate(ctx),
            self.discover.generate(ctx),
        )?;

        let scoring = ctx.scoring();
        let mut seen: HashSet<Uuid> = HashSet::new();
        let mut blended = Vec::with_capacity(personalized.len() + trending.len() + discover.len());

        for candidate in personalized {
            if seen.insert(candidate.post.id) {
                blended.push(candidate);
            }
        }
        for mut candidate in trending.into_iter().chain(discover) {
            if seen.insert(candidate.post.id) {
                candidate.score = self.scorer.final_score(&candidate.post, &scoring);
                blended.push(candidate);
            }
        }

        sort_candidates(&mut blended);
        blended.truncate(ctx.limit);
        Ok(blended)
    }
}
