//! Interest profile derived from recent interactions.
//!
//! Not persisted: every call aggregates the trailing window of interactions,
//! sums their scores per hashtag of the interacted post and keeps the top-k.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::clock::Clock;
use crate::config::RankingConfig;
use crate::error::Result;
use crate::metrics;
use crate::upstream::{with_deadline, InteractionStore, PostStore};

#[derive(Clone)]
pub struct InterestProfileBuilder {
    interactions: Arc<dyn InteractionStore>,
    posts: Arc<dyn PostStore>,
    clock: Arc<dyn Clock>,
    window: chrono::Duration,
    top_k: usize,
    interactions_deadline: Duration,
    posts_deadline: Duration,
}

impl InterestProfileBuilder {
    pub fn new(
        interactions: Arc<dyn InteractionStore>,
        posts: Arc<dyn PostStore>,
        clock: Arc<dyn Clock>,
        config: &RankingConfig,
        interactions_deadline: Duration,
        posts_deadline: Duration,
    ) -> Self {
        Self {
            interactions,
            posts,
            clock,
            window: chrono::Duration::days(config.interest_window_days),
            top_k: config.interest_top_k,
            interactions_deadline,
            posts_deadline,
        }
    }

    /// Weighted tags, highest score first; ties order by tag name.
    pub async fn build(&self, user_id: Uuid) -> Result<Vec<(String, f64)>> {
        let since = self.clock.now() - self.window;
        let interactions = with_deadline(
            "list_interactions",
            self.interactions_deadline,
            self.interactions.list_since(user_id, since),
        )
        .await?;

        if interactions.is_empty() {
            return Ok(Vec::new());
        }

        let content_ids: Vec<Uuid> = interactions
            .iter()
            .map(|i| i.content_id)
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        let posts = with_deadline(
            "get_posts",
            self.posts_deadline,
            self.posts.get_posts(content_ids),
        )
        .await?;
        let tags_by_post: HashMap<Uuid, Vec<String>> =
            posts.into_iter().map(|p| (p.id, p.hashtags)).collect();

        let mut weights: HashMap<String, f64> = HashMap::new();
        for interaction in &interactions {
            if let Some(tags) = tags_by_post.get(&interaction.content_id) {
                for tag in tags {
                    *weights.entry(tag.clone()).or_insert(0.0) += interaction.interaction_score;
                }
            }
        }

        let mut ranked: Vec<(String, f64)> = weights.into_iter().collect();
        ranked.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.0.cmp(&b.0))
        });
        ranked.truncate(self.top_k);

        debug!(
            user_id = %user_id,
            interactions = interactions.len(),
            tags = ranked.len(),
            "Derived interest profile"
        );
        Ok(ranked)
    }

    /// Top tags as a set. Any failure degrades to the empty set.
    pub async fn interest_tags(&self, user_id: Uuid) -> HashSet<String> {
        match self.build(user_id).await {
            Ok(ranked) => ranked.into_iter().map(|(tag, _)| tag).collect(),
            Err(e) => {
                warn!(user_id = %user_id, error = %e, "Interest profile unavailable, continuing without it");
                metrics::record_degradation("interest_profile");
                HashSet::new()
            }
        }
    }
}
