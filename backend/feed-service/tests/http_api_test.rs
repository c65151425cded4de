//! Integration Tests: HTTP surface
//!
//! Exercises `/api/v1/feed` routes through `handlers::configure` with
//! in-memory collaborators.

use actix_web::http::StatusCode;
use actix_web::{test, web, App};
use chrono::Utc;
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

use feed_service::cache::MemoryCacheStore;
use feed_service::handlers::{self, FeedHandlerState, FeedResponse, USER_ID_HEADER};
use feed_service::models::{Post, Visibility};
use feed_service::upstream::memory::{
    InMemoryIdentityProvider, InMemoryInteractionStore, InMemoryPostStore, InMemorySocialGraph,
};
use feed_service::{
    Collaborators, FeedEngine, FeedType, RankingConfig, SystemClock, UpstreamConfig,
};

fn state_with(posts: Arc<InMemoryPostStore>) -> web::Data<FeedHandlerState> {
    let engine = FeedEngine::new(
        Collaborators {
            graph: Arc::new(InMemorySocialGraph::new()),
            posts,
            identity: Arc::new(InMemoryIdentityProvider::new()),
            interactions: Arc::new(InMemoryInteractionStore::new()),
            cache: Arc::new(MemoryCacheStore::new()),
            clock: Arc::new(SystemClock),
        },
        RankingConfig::default(),
        UpstreamConfig::default(),
    );
    web::Data::new(FeedHandlerState {
        engine: Arc::new(engine),
    })
}

fn trending_post() -> Post {
    Post {
        id: Uuid::new_v4(),
        author_id: Uuid::new_v4(),
        visibility: Visibility::Public,
        created_at: Utc::now() - chrono::Duration::hours(2),
        likes_count: 8,
        comments_count: 1,
        shares_count: 0,
        views_count: 20,
        hashtags: vec!["launch".into()],
        is_promoted: true,
    }
}

#[actix_web::test]
async fn test_get_feed_returns_ranked_page() {
    let posts = Arc::new(InMemoryPostStore::new());
    let post = trending_post();
    posts.insert(post.clone());

    let app = test::init_service(
        App::new()
            .app_data(state_with(posts))
            .configure(handlers::configure),
    )
    .await;

    let req = test::TestRequest::get()
        .uri("/api/v1/feed?type=trending&limit=5")
        .insert_header((USER_ID_HEADER, Uuid::new_v4().to_string()))
        .to_request();
    let body: FeedResponse = test::call_and_read_body_json(&app, req).await;

    assert_eq!(body.feed_type, FeedType::Trending);
    assert_eq!(body.limit, 5);
    assert_eq!(body.offset, 0);
    assert!(body.refreshed);
    assert!(!body.has_more);
    assert_eq!(body.items.len(), 1);
    assert_eq!(body.items[0].post.id, post.id);
    assert!(body.items[0].is_promoted);
    assert_eq!(body.items[0].time_ago, "2h");
}

#[actix_web::test]
async fn test_shorthand_route_and_personal_alias() {
    let app = test::init_service(
        App::new()
            .app_data(state_with(Arc::new(InMemoryPostStore::new())))
            .configure(handlers::configure),
    )
    .await;
    let user = Uuid::new_v4().to_string();

    let req = test::TestRequest::get()
        .uri("/api/v1/feed/discover")
        .insert_header((USER_ID_HEADER, user.clone()))
        .to_request();
    let body: FeedResponse = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body.feed_type, FeedType::Discover);
    assert_eq!(body.limit, 20);

    let req = test::TestRequest::get()
        .uri("/api/v1/feed?type=personal&limit=500")
        .insert_header((USER_ID_HEADER, user))
        .to_request();
    let body: FeedResponse = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body.feed_type, FeedType::Home);
    assert_eq!(body.limit, 100);
}

#[actix_web::test]
async fn test_invalid_requests_are_rejected() {
    let app = test::init_service(
        App::new()
            .app_data(state_with(Arc::new(InMemoryPostStore::new())))
            .configure(handlers::configure),
    )
    .await;
    let user = Uuid::new_v4().to_string();

    let missing_header = test::TestRequest::get().uri("/api/v1/feed").to_request();
    let resp = test::call_service(&app, missing_header).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    for uri in [
        "/api/v1/feed?type=popular",
        "/api/v1/feed?limit=0",
        "/api/v1/feed?limit=-3",
        "/api/v1/feed?offset=-1",
        "/api/v1/feed/everything",
    ] {
        let req = test::TestRequest::get()
            .uri(uri)
            .insert_header((USER_ID_HEADER, user.clone()))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "{}", uri);
    }

    let req = test::TestRequest::post()
        .uri("/api/v1/feed/interactions")
        .insert_header((USER_ID_HEADER, user.clone()))
        .set_json(json!({
            "post_id": Uuid::new_v4(),
            "interaction_type": "bookmark",
            "source": "feed",
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let req = test::TestRequest::post()
        .uri("/api/v1/feed/interactions")
        .insert_header((USER_ID_HEADER, user))
        .set_json(json!({
            "post_id": Uuid::new_v4(),
            "interaction_type": "view",
            "time_spent": -10,
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn test_interaction_refresh_and_admin_invalidation() {
    let posts = Arc::new(InMemoryPostStore::new());
    let post = trending_post();
    posts.insert(post.clone());
    let state = state_with(posts);

    let app = test::init_service(
        App::new()
            .app_data(state.clone())
            .configure(handlers::configure),
    )
    .await;
    let user = Uuid::new_v4();

    let req = test::TestRequest::get()
        .uri("/api/v1/feed?type=trending")
        .insert_header((USER_ID_HEADER, user.to_string()))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    state.engine.flush().await;

    let req = test::TestRequest::post()
        .uri("/api/v1/feed/interactions")
        .insert_header((USER_ID_HEADER, user.to_string()))
        .set_json(json!({
            "post_id": post.id,
            "interaction_type": "like",
            "source": "trending",
            "time_spent": 30,
        }))
        .to_request();
    let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["status"], "recorded");
    assert_eq!(body["interaction_score"], 10.0);
    state.engine.flush().await;

    let req = test::TestRequest::post()
        .uri("/api/v1/feed/refresh?type=trending")
        .insert_header((USER_ID_HEADER, user.to_string()))
        .to_request();
    let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["status"], "refreshed");
    assert_eq!(body["feed_type"], "trending");

    // repopulate, then drop it through the admin route
    let req = test::TestRequest::get()
        .uri("/api/v1/feed?type=trending")
        .insert_header((USER_ID_HEADER, user.to_string()))
        .to_request();
    test::call_service(&app, req).await;
    state.engine.flush().await;

    let req = test::TestRequest::delete()
        .uri(&format!("/api/v1/admin/feed/{}", user))
        .to_request();
    let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["removed"], 1);

    let req = test::TestRequest::delete()
        .uri("/api/v1/admin/feed/not-a-uuid")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}
