//! Integration Tests: Feed Engine
//!
//! Drives the public `FeedEngine` against in-memory collaborators and a
//! manually advanced clock.
//!
//! Coverage:
//! - Cache idempotence, TTL expiry and interaction-driven invalidation
//! - Interest boost after recording an interaction
//! - Empty social graph boundary
//! - Trending threshold and per-author diversity cap
//! - Relative time labels on returned items

use chrono::{Duration, Utc};
use std::sync::Arc;
use uuid::Uuid;

use feed_service::cache::{CacheLookup, MemoryCacheStore};
use feed_service::models::{FeedReason, InteractionSource, InteractionType, Post, Visibility};
use feed_service::upstream::memory::{
    InMemoryIdentityProvider, InMemoryInteractionStore, InMemoryPostStore, InMemorySocialGraph,
};
use feed_service::{
    Clock, Collaborators, FeedEngine, FeedType, ManualClock, RankingConfig, UpstreamConfig,
};

struct Harness {
    engine: FeedEngine,
    graph: Arc<InMemorySocialGraph>,
    posts: Arc<InMemoryPostStore>,
    interactions: Arc<InMemoryInteractionStore>,
    clock: ManualClock,
}

impl Harness {
    fn new() -> Self {
        Self::with_ranking(RankingConfig::default())
    }

    fn with_ranking(ranking: RankingConfig) -> Self {
        let graph = Arc::new(InMemorySocialGraph::new());
        let posts = Arc::new(InMemoryPostStore::new());
        let interactions = Arc::new(InMemoryInteractionStore::new());
        let clock = ManualClock::new(Utc::now());

        let engine = FeedEngine::new(
            Collaborators {
                graph: graph.clone(),
                posts: posts.clone(),
                identity: Arc::new(InMemoryIdentityProvider::new()),
                interactions: interactions.clone(),
                cache: Arc::new(MemoryCacheStore::new()),
                clock: Arc::new(clock.clone()),
            },
            ranking,
            UpstreamConfig::default(),
        );

        Self {
            engine,
            graph,
            posts,
            interactions,
            clock,
        }
    }

    fn post(&self, author: Uuid, age: Duration) -> Post {
        Post {
            id: Uuid::new_v4(),
            author_id: author,
            visibility: Visibility::Public,
            created_at: self.clock.now() - age,
            likes_count: 0,
            comments_count: 0,
            shares_count: 0,
            views_count: 0,
            hashtags: vec![],
            is_promoted: false,
        }
    }

    fn insert(&self, post: Post) -> Post {
        self.posts.insert(post.clone());
        post
    }
}

#[tokio::test]
async fn test_repeated_reads_within_ttl_are_identical() {
    let h = Harness::new();
    let user = Uuid::new_v4();
    for i in 0..8 {
        let mut post = h.post(Uuid::new_v4(), Duration::hours(i + 1));
        post.likes_count = (i as u64) * 3;
        h.insert(post);
    }

    let first = h
        .engine
        .get_feed(user, FeedType::Home, 5, 0, false)
        .await
        .unwrap();
    h.engine.flush().await;

    // a new post must not leak into the cached ranking
    h.insert(h.post(Uuid::new_v4(), Duration::minutes(1)));
    h.clock.advance(Duration::minutes(30));

    let second = h
        .engine
        .get_feed(user, FeedType::Home, 5, 0, false)
        .await
        .unwrap();

    assert!(!second.regenerated);
    assert_eq!(first.items, second.items);
}

#[tokio::test]
async fn test_cached_entry_expires_one_hour_after_generation() {
    let h = Harness::new();
    let user = Uuid::new_v4();
    for i in 0..4 {
        let mut post = h.post(Uuid::new_v4(), Duration::hours(i + 1));
        post.likes_count = 10 - i as u64;
        h.insert(post);
    }

    h.engine
        .get_feed(user, FeedType::Home, 10, 0, false)
        .await
        .unwrap();
    h.engine.flush().await;

    match h.engine.cache().lookup(user, FeedType::Home).await.unwrap() {
        CacheLookup::Hit(feed) => {
            assert_eq!(feed.expires_at - feed.generated_at, Duration::hours(1));
            assert!(feed.items.windows(2).all(|w| w[0].score >= w[1].score));
        }
        other => panic!("expected cache hit, got {:?}", other),
    }

    h.clock.advance(Duration::minutes(61));
    let page = h
        .engine
        .get_feed(user, FeedType::Home, 10, 0, false)
        .await
        .unwrap();
    assert!(page.regenerated);
}

#[tokio::test]
async fn test_interaction_invalidates_every_cached_feed() {
    let h = Harness::new();
    let user = Uuid::new_v4();
    let post = h.insert(h.post(Uuid::new_v4(), Duration::hours(1)));

    for feed_type in FeedType::ALL {
        h.engine
            .get_feed(user, feed_type, 10, 0, false)
            .await
            .unwrap();
    }
    h.engine.flush().await;

    h.clock.advance(Duration::seconds(1));
    h.engine
        .record_interaction(
            user,
            post.id,
            InteractionType::Like,
            InteractionSource::Feed,
            0,
        )
        .await
        .unwrap();
    h.engine.flush().await;

    assert_eq!(h.interactions.count_for(user), 1);
    for feed_type in FeedType::ALL {
        assert_eq!(
            h.engine.cache().lookup(user, feed_type).await.unwrap(),
            CacheLookup::Miss
        );
    }

    h.clock.advance(Duration::seconds(1));
    let page = h
        .engine
        .get_feed(user, FeedType::Home, 10, 0, false)
        .await
        .unwrap();
    assert!(page.regenerated);
}

#[tokio::test]
async fn test_recorded_interaction_boosts_matching_tags() {
    let h = Harness::new();
    let user = Uuid::new_v4();

    let mut liked = h.post(Uuid::new_v4(), Duration::hours(5));
    liked.hashtags = vec!["rust".into()];
    let liked = h.insert(liked);

    let mut tagged = h.post(Uuid::new_v4(), Duration::hours(2));
    tagged.hashtags = vec!["rust".into()];
    let tagged = h.insert(tagged);
    let mut plain = h.post(Uuid::new_v4(), Duration::hours(2));
    plain.created_at = tagged.created_at;
    let plain = h.insert(plain);

    let score_of = |items: &[feed_service::FeedItem], id: Uuid| {
        items
            .iter()
            .find(|item| item.post.id == id)
            .map(|item| item.score)
            .unwrap()
    };

    let before = h
        .engine
        .get_feed(user, FeedType::Home, 10, 0, true)
        .await
        .unwrap();
    assert_eq!(
        score_of(&before.items, tagged.id),
        score_of(&before.items, plain.id)
    );

    h.engine
        .record_interaction(
            user,
            liked.id,
            InteractionType::Like,
            InteractionSource::Feed,
            30,
        )
        .await
        .unwrap();

    let after = h
        .engine
        .get_feed(user, FeedType::Home, 10, 0, true)
        .await
        .unwrap();
    let boosted = score_of(&after.items, tagged.id);
    let baseline = score_of(&after.items, plain.id);
    assert!((boosted - baseline * 1.2).abs() < 1e-9);
    assert_eq!(after.items[0].post.id, tagged.id);
}

#[tokio::test]
async fn test_user_without_graph_or_history_gets_public_feeds() {
    let h = Harness::new();
    let user = Uuid::new_v4();
    let stranger = Uuid::new_v4();

    let mut public = h.post(stranger, Duration::hours(1));
    public.likes_count = 20;
    let public = h.insert(public);

    let mut friends_only = h.post(stranger, Duration::hours(1));
    friends_only.visibility = Visibility::Friends;
    friends_only.likes_count = 50;
    h.insert(friends_only);

    let following = h
        .engine
        .get_feed(user, FeedType::Following, 10, 0, false)
        .await
        .unwrap();
    assert!(following.items.is_empty());

    for feed_type in [FeedType::Discover, FeedType::Trending] {
        let page = h
            .engine
            .get_feed(user, feed_type, 10, 0, false)
            .await
            .unwrap();
        let ids: Vec<Uuid> = page.items.iter().map(|i| i.post.id).collect();
        assert_eq!(ids, vec![public.id], "{} feed", feed_type);
    }
}

#[tokio::test]
async fn test_following_feed_shows_followees_and_own_posts() {
    let h = Harness::new();
    let user = Uuid::new_v4();
    let friend = Uuid::new_v4();
    h.graph.follow(user, friend);

    let mut friend_post = h.post(friend, Duration::hours(3));
    friend_post.visibility = Visibility::Friends;
    let friend_post = h.insert(friend_post);
    let own = h.insert(h.post(user, Duration::hours(1)));
    h.insert(h.post(Uuid::new_v4(), Duration::hours(1)));
    // outside the three day window
    h.insert(h.post(friend, Duration::days(4)));

    let page = h
        .engine
        .get_feed(user, FeedType::Following, 10, 0, false)
        .await
        .unwrap();
    let mut ids: Vec<Uuid> = page.items.iter().map(|i| i.post.id).collect();
    ids.sort();
    let mut expected = vec![friend_post.id, own.id];
    expected.sort();
    assert_eq!(ids, expected);
    assert!(page.items.iter().all(|i| i.reason == FeedReason::Following));
}

#[tokio::test]
async fn test_trending_threshold() {
    let h = Harness::new();
    let user = Uuid::new_v4();

    let mut hot = h.post(Uuid::new_v4(), Duration::hours(2));
    hot.likes_count = 8;
    hot.comments_count = 1;
    hot.views_count = 20;
    let hot = h.insert(hot);

    let mut lukewarm = h.post(Uuid::new_v4(), Duration::hours(2));
    lukewarm.likes_count = 5;
    lukewarm.views_count = 10;
    h.insert(lukewarm);

    let page = h
        .engine
        .get_feed(user, FeedType::Trending, 10, 0, false)
        .await
        .unwrap();
    assert_eq!(page.items.len(), 1);
    assert_eq!(page.items[0].post.id, hot.id);
    assert_eq!(page.items[0].score, 12.0);
    assert_eq!(page.items[0].reason, FeedReason::Trending);
}

#[tokio::test]
async fn test_single_author_capped_at_three_items() {
    let h = Harness::new();
    let user = Uuid::new_v4();
    let prolific = Uuid::new_v4();

    for i in 0..5 {
        let mut post = h.post(prolific, Duration::hours(1));
        post.likes_count = 100 - i;
        h.insert(post);
    }
    let mut others = Vec::new();
    for i in 0..4 {
        let mut post = h.post(Uuid::new_v4(), Duration::hours(1));
        post.likes_count = 10 - i;
        others.push(h.insert(post));
    }

    let page = h
        .engine
        .get_feed(user, FeedType::Discover, 20, 0, false)
        .await
        .unwrap();

    let from_prolific = page
        .items
        .iter()
        .filter(|i| i.post.author_id == prolific)
        .count();
    assert_eq!(from_prolific, 3);
    assert_eq!(page.items.len(), 7);
    assert_eq!(page.items[3].post.id, others[0].id);
}

#[tokio::test]
async fn test_items_carry_relative_time_labels() {
    let h = Harness::new();
    let user = Uuid::new_v4();
    let fresh = h.insert(h.post(Uuid::new_v4(), Duration::seconds(90)));
    let older = h.insert(h.post(Uuid::new_v4(), Duration::hours(50)));

    let page = h
        .engine
        .get_feed(user, FeedType::Home, 10, 0, false)
        .await
        .unwrap();
    let label = |id: Uuid| {
        page.items
            .iter()
            .find(|i| i.post.id == id)
            .map(|i| i.time_ago.clone())
            .unwrap()
    };
    assert_eq!(label(fresh.id), "1m");
    assert_eq!(label(older.id), "2d");
}

#[tokio::test]
async fn test_refresh_regenerates_single_feed_type() {
    let h = Harness::new();
    let user = Uuid::new_v4();
    h.insert(h.post(Uuid::new_v4(), Duration::hours(1)));

    for feed_type in [FeedType::Home, FeedType::Discover] {
        h.engine
            .get_feed(user, feed_type, 10, 0, false)
            .await
            .unwrap();
    }
    h.engine.flush().await;

    h.engine.refresh_feed(user, FeedType::Home).await;

    assert_eq!(
        h.engine.cache().lookup(user, FeedType::Home).await.unwrap(),
        CacheLookup::Miss
    );
    assert!(matches!(
        h.engine
            .cache()
            .lookup(user, FeedType::Discover)
            .await
            .unwrap(),
        CacheLookup::Hit(_)
    ));
    assert_eq!(h.engine.invalidate_feed(user).await, 1);
}

#[tokio::test]
async fn test_deep_page_beyond_candidate_pool() {
    let h = Harness::with_ranking(RankingConfig {
        candidate_pool_size: 10,
        ..RankingConfig::default()
    });
    for i in 0..40 {
        let mut post = h.post(Uuid::new_v4(), Duration::minutes(10 + i));
        post.likes_count = 20;
        h.insert(post);
    }

    let user = Uuid::new_v4();
    for feed_type in [FeedType::Home, FeedType::Trending, FeedType::Discover] {
        let page = h
            .engine
            .get_feed(user, feed_type, 5, 20, true)
            .await
            .unwrap();
        assert_eq!(page.items.len(), 5, "{}", feed_type);
        assert!(page.regenerated);
    }
}
