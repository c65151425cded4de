use super::{sort_candidates, Candidate, CandidateSource, GenerationContext};
use crate::error::Result;
use crate::models::FeedReason;
use crate::services::scoring::Scorer;
use crate::upstream::{Audience, PostFilter, PostQuery, PostSort};

/// Public posts from the trending window whose trending score clears the
/// threshold. Scored by trending score, not the personalized function.
pub struct TrendingGenerator {
    source: CandidateSource,
    scorer: Scorer,
}

impl TrendingGenerator {
    pub fn new(source: CandidateSource, scorer: Scorer) -> Self {
        Self { source, scorer }
    }

    pub async fn generate(&self, ctx: &GenerationContext<'_>) -> Result<Vec<Candidate>> {
        let config = self.scorer.config();
        let filter = PostFilter::new(
            Audience::Public,
            ctx.since_hours(config.trending_window_hours),
        );
        let posts = self
            .source
            .fetch(PostQuery {
                filter,
                sort: PostSort::MostEngaged,
                limit: config.candidate_pool_size.max(ctx.limit),
            })
            .await?;

        let mut candidates: Vec<Candidate> = posts
            .into_iter()
            .filter_map(|post| {
                let score = self.scorer.trending_score(&post);
                (score >= config.trending_threshold).then_some(Candidate {
                    post,
                    score,
                    reason: FeedReason::Trending,
                })
            })
            .collect();

        sort_candidates(&mut candidates);
        candidates.truncate(ctx.limit);
        Ok(candidates)
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;
    use crate::models::Visibility;
    use crate::upstream::memory::InMemoryPostStore;
    use chrono::{Duration, Utc};
    use std::collections::HashSet;
    use std::sync::Arc;
    use uuid::Uuid;

    #[tokio::test]
    async fn test_threshold_and_window() {
        let store = Arc::new(InMemoryPostStore::new());
        let now = Utc::now();

        // 8 + 2·1 + 0 + 0.1·20 = 12
        let mut hot = post(Uuid::new_v4(), Visibility::Public, now - Duration::hours(2));
        hot.likes_count = 8;
        hot.comments_count = 1;
        hot.views_count = 20;

        // 9.9 stays below the threshold
        let mut lukewarm = post(Uuid::new_v4(), Visibility::Public, now - Duration::hours(2));
        lukewarm.likes_count = 9;
        lukewarm.views_count = 9;

        let mut yesterday = post(Uuid::new_v4(), Visibility::Public, now - Duration::hours(25));
        yesterday.likes_count = 500;

        let mut private = post(Uuid::new_v4(), Visibility::Friends, now - Duration::hours(1));
        private.likes_count = 500;

        for p in [&hot, &lukewarm, &yesterday, &private] {
            store.insert(p.clone());
        }

        let generator = TrendingGenerator::new(source(store), scorer());
        let following = HashSet::new();
        let tags = HashSet::new();
        let ctx = GenerationContext {
            user_id: Uuid::new_v4(),
            following: &following,
            interest_tags: &tags,
            now,
            limit: 10,
        };

        let items = generator.generate(&ctx).await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].post.id, hot.id);
        assert!((items[0].score - 12.0).abs() < 1e-9);
        assert_eq!(items[0].reason, FeedReason::Trending);
    }
}
