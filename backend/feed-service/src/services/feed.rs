//! Feed engine: the public operations of the service.
//!
//! Read path for `get_feed`:
//! 1. Serve a page from a live cache entry unless a refresh is forced
//! 2. Otherwise fetch the following set (bounded, propagates failures)
//! 3. Derive interest tags (degrades to empty)
//! 4. Generate candidates for the feed type and apply the diversity cap
//! 5. Enrich authors best-effort, attach labels, cache in the background

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::diversity::{assemble, DiversityRanker};
use super::interactions::{InteractionRecorder, NewInteraction};
use super::interest::InterestProfileBuilder;
use super::scoring::Scorer;
use super::strategies::{Candidate, CandidateSource, GenerationContext, Generators};
use crate::cache::{CacheLookup, CacheStore, FeedCache};
use crate::clock::Clock;
use crate::config::{RankingConfig, UpstreamConfig};
use crate::error::{AppError, Result};
use crate::metrics;
use crate::models::{
    page_of, AuthorSummary, FeedItem, FeedType, InteractionSource, InteractionType,
    UserInteraction,
};
use crate::tasks::{FeedTask, TaskDeadlines, TaskDispatcher, TaskFailure};
use crate::upstream::{with_deadline, IdentityProvider, InteractionStore, PostStore, SocialGraph};

/// External collaborators the engine reads from and writes to.
#[derive(Clone)]
pub struct Collaborators {
    pub graph: Arc<dyn SocialGraph>,
    pub posts: Arc<dyn PostStore>,
    pub identity: Arc<dyn IdentityProvider>,
    pub interactions: Arc<dyn InteractionStore>,
    pub cache: Arc<dyn CacheStore>,
    pub clock: Arc<dyn Clock>,
}

/// One page of a ranked feed.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedPage {
    pub items: Vec<FeedItem>,
    pub has_more: bool,
    /// False when the page was sliced from a live cache entry.
    pub regenerated: bool,
}

pub struct FeedEngine {
    graph: Arc<dyn SocialGraph>,
    identity: Arc<dyn IdentityProvider>,
    clock: Arc<dyn Clock>,
    generators: Generators,
    ranker: DiversityRanker,
    interests: InterestProfileBuilder,
    recorder: InteractionRecorder,
    cache: FeedCache,
    dispatcher: TaskDispatcher,
    config: Arc<RankingConfig>,
    upstream: UpstreamConfig,
}

impl FeedEngine {
    /// Wire the engine and start its background task worker. Must be called
    /// from within a tokio runtime.
    pub fn new(deps: Collaborators, ranking: RankingConfig, upstream: UpstreamConfig) -> Self {
        let config = Arc::new(ranking);
        let scorer = Scorer::new(config.clone());
        let cache = FeedCache::new(deps.cache, deps.clock.clone(), config.cache_ttl());
        let dispatcher = TaskDispatcher::spawn(
            cache.clone(),
            TaskDeadlines {
                store: upstream.cache_write_timeout(),
                invalidate: upstream.cache_invalidate_timeout(),
            },
        );

        let source = CandidateSource::new(deps.posts.clone(), upstream.posts_timeout());
        let interests = InterestProfileBuilder::new(
            deps.interactions.clone(),
            deps.posts,
            deps.clock.clone(),
            &config,
            upstream.interactions_timeout(),
            upstream.posts_timeout(),
        );
        let recorder = InteractionRecorder::new(
            deps.interactions,
            dispatcher.clone(),
            deps.clock.clone(),
            upstream.interactions_timeout(),
        );

        Self {
            graph: deps.graph,
            identity: deps.identity,
            clock: deps.clock,
            generators: Generators::new(source, scorer),
            ranker: DiversityRanker::new(config.diversity_cap),
            interests,
            recorder,
            cache,
            dispatcher,
            config,
            upstream,
        }
    }

    pub fn cache(&self) -> &FeedCache {
        &self.cache
    }

    pub fn ranking_config(&self) -> &RankingConfig {
        &self.config
    }

    /// Failures of background cache writes and invalidations.
    pub fn subscribe_task_failures(&self) -> tokio::sync::broadcast::Receiver<TaskFailure> {
        self.dispatcher.subscribe()
    }

    /// Wait for queued background work to finish.
    pub async fn flush(&self) {
        self.dispatcher.flush().await
    }

    pub async fn get_feed(
        &self,
        user_id: Uuid,
        feed_type: FeedType,
        limit: i64,
        offset: i64,
        force_refresh: bool,
    ) -> Result<FeedPage> {
        let (limit, offset) = validate_window(user_id, limit, offset)?;

        if !force_refresh {
            if let Some(page) = self.cached_page(user_id, feed_type, limit, offset).await {
                return Ok(page);
            }
        }

        let started = Instant::now();
        let items = self.generate(user_id, feed_type, limit, offset).await?;
        metrics::observe_generation(feed_type.as_str(), started.elapsed());

        let entry = self
            .cache
            .entry(user_id, feed_type, items, self.clock.now());
        let page = FeedPage {
            items: entry.page(offset, limit),
            has_more: offset.saturating_add(limit) < entry.items.len(),
            regenerated: true,
        };

        info!(
            user_id = %user_id,
            feed_type = %feed_type,
            ranked = entry.items.len(),
            returned = page.items.len(),
            force_refresh,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Generated feed"
        );
        self.dispatcher.dispatch(FeedTask::StoreFeed(entry));

        Ok(page)
    }

    pub async fn record_interaction(
        &self,
        user_id: Uuid,
        content_id: Uuid,
        interaction_type: InteractionType,
        source: InteractionSource,
        time_spent_seconds: u64,
    ) -> Result<UserInteraction> {
        self.recorder
            .record(NewInteraction {
                user_id,
                content_id,
                interaction_type,
                source,
                time_spent_seconds,
            })
            .await
    }

    /// Drop the cached entry for one feed type. Cache errors are logged only.
    pub async fn refresh_feed(&self, user_id: Uuid, feed_type: FeedType) {
        match self.cache.refresh(user_id, feed_type).await {
            Ok(()) => info!(user_id = %user_id, feed_type = %feed_type, "Feed refresh requested"),
            Err(e) => warn!(
                user_id = %user_id,
                feed_type = %feed_type,
                error = %e,
                "Failed to drop cached feed on refresh"
            ),
        }
    }

    /// Drop every cached feed for a user. Returns the number of entries removed.
    pub async fn invalidate_feed(&self, user_id: Uuid) -> usize {
        match self.cache.invalidate(user_id).await {
            Ok(removed) => {
                info!(user_id = %user_id, removed, "Feed caches invalidated");
                removed
            }
            Err(e) => {
                warn!(user_id = %user_id, error = %e, "Failed to invalidate feed caches");
                0
            }
        }
    }

    /// A page from a live entry, or `None` when the feed must be regenerated.
    async fn cached_page(
        &self,
        user_id: Uuid,
        feed_type: FeedType,
        limit: usize,
        offset: usize,
    ) -> Option<FeedPage> {
        let label = feed_type.as_str();
        match self.cache.lookup(user_id, feed_type).await {
            Ok(CacheLookup::Hit(feed)) => {
                if offset > 0 && offset >= feed.items.len() {
                    metrics::record_cache_lookup(label, "short");
                    debug!(
                        user_id = %user_id,
                        feed_type = %feed_type,
                        offset,
                        cached = feed.items.len(),
                        "Cached feed shorter than offset, regenerating"
                    );
                    return None;
                }
                metrics::record_cache_lookup(label, "hit");
                Some(FeedPage {
                    items: page_of(&feed.items, offset, limit),
                    has_more: offset.saturating_add(limit) < feed.items.len(),
                    regenerated: false,
                })
            }
            Ok(CacheLookup::Expired) => {
                metrics::record_cache_lookup(label, "expired");
                None
            }
            Ok(CacheLookup::Miss) => {
                metrics::record_cache_lookup(label, "miss");
                None
            }
            Err(e) => {
                metrics::record_cache_lookup(label, "error");
                warn!(
                    user_id = %user_id,
                    feed_type = %feed_type,
                    error = %e,
                    "Feed cache read failed, regenerating"
                );
                None
            }
        }
    }

    async fn generate(
        &self,
        user_id: Uuid,
        feed_type: FeedType,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<FeedItem>> {
        let following = with_deadline(
            "get_following",
            self.upstream.graph_timeout(),
            self.graph.get_following(user_id),
        )
        .await?;
        let interest_tags = self.interests.interest_tags(user_id).await;

        let window = self.window_for(feed_type, limit, offset);
        let now = self.clock.now();
        let ctx = GenerationContext {
            user_id,
            following: &following,
            interest_tags: &interest_tags,
            now,
            limit: self.config.candidate_pool_size.max(window),
        };

        let candidates = self.generators.generate(feed_type, &ctx).await?;
        let mut ranked = self.ranker.rank(candidates);
        ranked.truncate(window);

        let authors = self.author_summaries(&ranked).await;
        Ok(assemble(ranked, now, &authors))
    }

    /// Items kept per cached feed: an oversampled first page, widened to
    /// cover deep pagination.
    fn window_for(&self, feed_type: FeedType, limit: usize, offset: usize) -> usize {
        let oversample = match feed_type {
            FeedType::Home => self.config.home_oversample,
            FeedType::Following | FeedType::Trending | FeedType::Discover => {
                self.config.default_oversample
            }
        };
        limit
            .saturating_mul(oversample)
            .max(offset.saturating_add(limit))
    }

    async fn author_summaries(&self, ranked: &[Candidate]) -> HashMap<Uuid, AuthorSummary> {
        if ranked.is_empty() {
            return HashMap::new();
        }
        let ids: Vec<Uuid> = ranked
            .iter()
            .map(|c| c.post.author_id)
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();

        match with_deadline(
            "get_author_summaries",
            self.upstream.identity_timeout(),
            self.identity.get_author_summaries(ids),
        )
        .await
        {
            Ok(authors) => authors,
            Err(e) => {
                warn!(error = %e, "Author enrichment unavailable, serving items without authors");
                metrics::record_degradation("author_enrichment");
                HashMap::new()
            }
        }
    }
}

fn validate_window(user_id: Uuid, limit: i64, offset: i64) -> Result<(usize, usize)> {
    if user_id.is_nil() {
        return Err(AppError::Validation("user_id must be set".to_string()));
    }
    if limit <= 0 {
        return Err(AppError::Validation(format!(
            "limit must be positive, got {}",
            limit
        )));
    }
    if offset < 0 {
        return Err(AppError::Validation(format!(
            "offset must not be negative, got {}",
            offset
        )));
    }
    Ok((limit as usize, offset as usize))
}
