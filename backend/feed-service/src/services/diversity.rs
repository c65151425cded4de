use std::collections::HashMap;
use uuid::Uuid;

use super::strategies::{sort_candidates, Candidate};
use crate::models::{AuthorSummary, FeedItem};
use crate::utils::time_ago;
use chrono::{DateTime, Utc};

/// Final ranking pass: sort by score and cap each author's share of the feed.
#[derive(Debug, Clone, Copy)]
pub struct DiversityRanker {
    max_per_author: usize,
}

impl DiversityRanker {
    pub fn new(max_per_author: usize) -> Self {
        Self { max_per_author }
    }

    /// Greedy walk over the sorted list, admitting an item only while its
    /// author is under the cap. Output stays in non-increasing score order.
    pub fn rank(&self, mut candidates: Vec<Candidate>) -> Vec<Candidate> {
        sort_candidates(&mut candidates);

        let mut per_author: HashMap<Uuid, usize> = HashMap::new();
        candidates
            .into_iter()
            .filter(|candidate| {
                let count = per_author.entry(candidate.post.author_id).or_insert(0);
                if *count < self.max_per_author {
                    *count += 1;
                    true
                } else {
                    false
                }
            })
            .collect()
    }
}

/// Attach display metadata to ranked candidates.
pub fn assemble(
    ranked: Vec<Candidate>,
    now: DateTime<Utc>,
    authors: &HashMap<Uuid, AuthorSummary>,
) -> Vec<FeedItem> {
    ranked
        .into_iter()
        .map(|candidate| FeedItem {
            time_ago: time_ago(candidate.post.created_at, now),
            is_promoted: candidate.post.is_promoted,
            author: authors.get(&candidate.post.author_id).cloned(),
            score: candidate.score,
            reason: candidate.reason,
            post: candidate.post,
        })
        .collect()
}
