use super::{sort_candidates, Candidate, CandidateSource, GenerationContext};
use crate::error::Result;
use crate::models::{FeedReason, Post};
use crate::services::scoring::Scorer;
use crate::upstream::{Audience, PostFilter, PostQuery, PostSort};

/// Public posts, friends-only posts from followees and the viewer's own posts
/// from the personalized window, ranked by the full scoring function.
pub struct PersonalizedGenerator {
    source: CandidateSource,
    scorer: Scorer,
}

impl PersonalizedGenerator {
    pub fn new(source: CandidateSource, scorer: Scorer) -> Self {
        Self { source, scorer }
    }

    pub async fn generate(&self, ctx: &GenerationContext<'_>) -> Result<Vec<Candidate>> {
        let config = self.scorer.config();
        let filter = PostFilter::new(
            Audience::Viewer {
                viewer_id: ctx.user_id,
                following: ctx.following.clone(),
            },
            ctx.since_hours(config.personalized_window_hours),
        );
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
            .map(|post| {
                let score = self.scorer.final_score(&post, &scoring);
                let reason = reason_for(&post, ctx);
                Candidate {
                    post,
                    score,
                    reason,
                }
            })
            .collect();

        sort_candidates(&mut candidates);
        candidates.truncate(ctx.limit);
        Ok(candidates)
    }
}

fn reason_for(post: &Post, ctx: &GenerationContext<'_>) -> FeedReason {
    if post.author_id == ctx.user_id {
        FeedReason::YourPost
    } else if ctx.following.contains(&post.author_id) {
        FeedReason::Following
    } else {
        FeedReason::Suggested
    }
}
