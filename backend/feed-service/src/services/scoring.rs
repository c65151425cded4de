//! Signal aggregation for feed candidates.
//!
//! Combines recency, engagement and author relationship into one score:
//!
//! ```text
//! final = recency_w · 1/(1 + hours/24)
//!       + engagement_w · (likes + 2·comments + 3·shares) / normalizer
//!       + relationship_w · affinity(author)
//! final *= interest_boost   (once, when any hashtag is in the interest set)
//! ```
//!
//! Pure and deterministic: identical inputs always give identical scores.

use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::sync::Arc;
use uuid::Uuid;

use crate::config::RankingConfig;
use crate::models::Post;

/// Per-request inputs shared by every candidate.
#[derive(Debug, Clone, Copy)]
pub struct ScoringContext<'a> {
    pub user_id: Uuid,
    pub following: &'a HashSet<Uuid>,
    pub interest_tags: &'a HashSet<String>,
    pub now: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct Scorer {
    config: Arc<RankingConfig>,
}

impl Scorer {
    pub fn new(config: Arc<RankingConfig>) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RankingConfig {
        &self.config
    }

    /// Fractional hours since `created_at`; clock skew clamps to zero.
    pub fn hours_since(created_at: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
        let millis = (now - created_at).num_milliseconds().max(0);
        millis as f64 / 3_600_000.0
    }

    pub fn recency_score(&self, post: &Post, now: DateTime<Utc>) -> f64 {
        1.0 / (1.0 + Self::hours_since(post.created_at, now) / 24.0)
    }

    pub fn relationship_score(&self, post: &Post, ctx: &ScoringContext<'_>) -> f64 {
        if ctx.following.contains(&post.author_id) {
            self.config.following_affinity
        } else if post.author_id == ctx.user_id {
            self.config.self_affinity
        } else {
            self.config.public_affinity
        }
    }

    pub fn normalized_engagement(&self, post: &Post) -> f64 {
        post.engagement_score() / self.config.engagement_normalizer
    }

    pub fn final_score(&self, post: &Post, ctx: &ScoringContext<'_>) -> f64 {
        let recency = self.recency_score(post, ctx.now);
        let linear = self.config.recency_weight * recency
            + self.config.engagement_weight * self.normalized_engagement(post)
            + self.config.relationship_weight * self.relationship_score(post, ctx);

        // A misconfigured normalizer must not poison the ordering.
        let base = if linear.is_finite() {
            linear
        } else {
            tracing::warn!(post_id = %post.id, "Non-finite score, falling back to recency");
            crate::metrics::record_degradation("scoring");
            self.config.recency_weight * recency
        };

        let boosted = if post.has_any_tag(ctx.interest_tags) {
            base * self.config.interest_boost
        } else {
            base
        };

        boosted.max(0.0)
    }

    /// `likes + 2·comments + 3·shares + view_weight·views`
    pub fn trending_score(&self, post: &Post) -> f64 {
        post.engagement_score() + self.config.trending_view_weight * post.views_count as f64
    }

    /// Engagement plus a flat bonus for interest matches, minus an age penalty
    /// once the post is older than the grace period.
    pub fn discovery_score(
        &self,
        post: &Post,
        interest_tags: &HashSet<String>,
        now: DateTime<Utc>,
    ) -> f64 {
        let bonus = if post.has_any_tag(interest_tags) {
            self.config.discover_interest_bonus
        } else {
            0.0
        };
        let overdue = (Self::hours_since(post.created_at, now) - self.config.discover_grace_hours)
            .max(0.0);
        post.engagement_score() + bonus - self.config.discover_age_penalty_per_hour * overdue
    }
}
