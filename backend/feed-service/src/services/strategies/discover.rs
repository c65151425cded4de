use super::{sort_candidates, Candidate, CandidateSource, GenerationContext};
use crate::error::Result;
use crate::models::FeedReason;
use crate::services::scoring::Scorer;
use crate::upstream::{Audience, PostFilter, PostQuery, PostSort, TagFilter};

/// Public posts from authors the viewer does not follow. With an interest
/// profile, candidates must match a tag or already be reasonably popular.
pub struct DiscoverGenerator {
    source: CandidateSource,
    scorer: Scorer,
}

impl DiscoverGenerator {
    pub fn new(source: CandidateSource, scorer: Scorer) -> Self {
        Self { source, scorer }
    }

    pub async fn generate(&self, ctx: &GenerationContext<'_>) -> Result<Vec<Candidate>> {
        let config = self.scorer.config();

        let mut excluded = ctx.following.clone();
        excluded.insert(ctx.user_id);

        let mut filter = PostFilter::new(
            Audience::Public,
            ctx.since_hours(config.discover_window_hours),
        )
        .excluding(excluded);
        if !ctx.interest_tags.is_empty() {
            filter = filter.tags(TagFilter {
                tags: ctx.interest_tags.clone(),
                or_min_likes: Some(config.discover_min_likes),
            });
        }

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
            .map(|post| Candidate {
                score: self
                    .scorer
                    .discovery_score(&post, ctx.interest_tags, ctx.now),
                post,
                reason: FeedReason::Discover,
            })
            .collect();

        sort_candidates(&mut candidates);
        candidates.truncate(ctx.limit);
        Ok(candidates)
    }
}
