use super::{sort_candidates, Candidate, CandidateSource, GenerationContext};
use crate::error::Result;
use crate::models::FeedReason;
use crate::services::scoring::Scorer;
use crate::upstream::{Audience, PostFilter, PostQuery, PostSort};

/// Posts authored by followees or the viewer within the following window.
pub struct FollowingGenerator {
    source: CandidateSource,
    scorer: Scorer,
}

impl FollowingGenerator {
    pub fn new(source: CandidateSource, scorer: Scorer) -> Self {
        Self { source, scorer }
    }

    pub async fn generate(&self, ctx: &GenerationContext<'_>) -> Result<Vec<Candidate>> {
        let config = self.scorer.config();

        let mut authors = ctx.following.clone();
        authors.insert(ctx.user_id);

        let filter = PostFilter::new(
            Audience::Viewer {
                viewer_id: ctx.user_id,
                following: ctx.following.clone(),
            },
            ctx.since_hours(config.following_window_hours),
        )
        .authors(authors);

        let posts = self
            .source
            .fetch(PostQuery {
                filter,
                sort: PostSort::NewestFirst,
                limit: config.candidate_pool_size.max(ctx.limit),
            })
            .await?;

        let scoring = ctx.scoring();
        let mut candidates: Vec<Candidate> = posts
            .into_iter()
            .map(|post| Candidate {
                score: self.scorer.final_score(&post, &scoring),
                post,
                reason: FeedReason::Following,
            })
            .collect();

        // ties fall back to creation time
        sort_candidates(&mut candidates);
        candidates.truncate(ctx.limit);
        Ok(candidates)
    }
}
