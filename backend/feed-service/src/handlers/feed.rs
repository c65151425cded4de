use actix_web::{get, post, web, HttpResponse};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{CallerId, FeedHandlerState, DEFAULT_LIMIT, MAX_LIMIT};
use crate::error::Result;
use crate::models::{FeedItem, FeedType};

#[derive(Debug, Deserialize)]
pub struct FeedQueryParams {
    #[serde(rename = "type")]
    pub feed_type: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    #[serde(default)]
    pub refresh: bool,
}

impl FeedQueryParams {
    fn feed_type(&self) -> Result<FeedType> {
        match self.feed_type.as_deref() {
            None | Some("") => Ok(FeedType::Home),
            Some(raw) => raw.parse(),
        }
    }

    /// Oversized limits are clamped; non-positive ones are rejected by the engine.
    fn limit(&self) -> i64 {
        self.limit.unwrap_or(DEFAULT_LIMIT).min(MAX_LIMIT)
    }

    fn offset(&self) -> i64 {
        self.offset.unwrap_or(0)
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FeedResponse {
    pub items: Vec<FeedItem>,
    pub feed_type: FeedType,
    pub refreshed: bool,
    pub limit: i64,
    pub offset: i64,
    pub has_more: bool,
}

async fn respond(
    state: &FeedHandlerState,
    caller: CallerId,
    feed_type: FeedType,
    query: &FeedQueryParams,
) -> Result<HttpResponse> {
    let (limit, offset) = (query.limit(), query.offset());
    debug!(
        user_id = %caller.0,
        feed_type = %feed_type,
        limit,
        offset,
        refresh = query.refresh,
        "Getting feed"
    );

    let page = state
        .engine
        .get_feed(caller.0, feed_type, limit, offset, query.refresh)
        .await?;

    Ok(HttpResponse::Ok().json(FeedResponse {
        items: page.items,
        feed_type,
        refreshed: page.regenerated,
        limit,
        offset,
        has_more: page.has_more,
    }))
}

/// `GET /api/v1/feed?type=&limit=&offset=&refresh=`
#[get("")]
pub async fn get_feed(
    caller: CallerId,
    query: web::Query<FeedQueryParams>,
    state: web::Data<FeedHandlerState>,
) -> Result<HttpResponse> {
    let feed_type = query.feed_type()?;
    respond(&state, caller, feed_type, &query).await
}

/// `GET /api/v1/feed/{type}` shorthand for the non-home modes.
#[get("/{feed_type}")]
pub async fn get_feed_by_type(
    caller: CallerId,
    path: web::Path<String>,
    query: web::Query<FeedQueryParams>,
    state: web::Data<FeedHandlerState>,
) -> Result<HttpResponse> {
    let feed_type: FeedType = path.into_inner().parse()?;
    respond(&state, caller, feed_type, &query).await
}

#[derive(Debug, Serialize)]
struct RefreshResponse {
    status: &'static str,
    feed_type: FeedType,
}

/// `POST /api/v1/feed/refresh?type=`
#[post("/refresh")]
pub async fn refresh_feed(
    caller: CallerId,
    query: web::Query<FeedQueryParams>,
    state: web::Data<FeedHandlerState>,
) -> Result<HttpResponse> {
    let feed_type = query.feed_type()?;
    state.engine.refresh_feed(caller.0, feed_type).await;

    Ok(HttpResponse::Ok().json(RefreshResponse {
        status: "refreshed",
        feed_type,
    }))
}
