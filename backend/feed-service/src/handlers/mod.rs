use actix_web::{web, FromRequest, HttpRequest};
use futures::future::{ready, Ready};
use std::sync::Arc;
use uuid::Uuid;

use crate::error::AppError;
use crate::services::FeedEngine;

pub mod admin;
pub mod feed;
pub mod interactions;

pub use admin::invalidate_user_feeds;
pub use feed::{get_feed, get_feed_by_type, refresh_feed, FeedQueryParams, FeedResponse};
pub use interactions::{record_interaction, InteractionRequest};

/// Header carrying the authenticated caller, set by the gateway.
pub const USER_ID_HEADER: &str = "X-User-Id";

pub const DEFAULT_LIMIT: i64 = 20;
pub const MAX_LIMIT: i64 = 100;

pub struct FeedHandlerState {
    pub engine: Arc<FeedEngine>,
}

/// Caller identity taken from [`USER_ID_HEADER`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallerId(pub Uuid);

impl FromRequest for CallerId {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut actix_web::dev::Payload) -> Self::Future {
        ready(parse_caller(req))
    }
}

fn parse_caller(req: &HttpRequest) -> Result<CallerId, AppError> {
    let raw = req
        .headers()
        .get(USER_ID_HEADER)
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| AppError::Validation(format!("Missing {} header", USER_ID_HEADER)))?;

    Uuid::parse_str(raw.trim())
        .map(CallerId)
        .map_err(|_| AppError::Validation(format!("Invalid {} header", USER_ID_HEADER)))
}

/// Mount every feed route. Shared by `main` and the HTTP tests.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1/feed")
            .service(get_feed)
            .service(record_interaction)
            .service(refresh_feed)
            .service(get_feed_by_type),
    )
    .service(web::scope("/api/v1/admin").service(invalidate_user_feeds));
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test::TestRequest;

    #[test]
    fn test_caller_from_header() {
        let user = Uuid::new_v4();
        let req = TestRequest::default()
            .insert_header((USER_ID_HEADER, user.to_string()))
            .to_http_request();
        assert_eq!(parse_caller(&req).unwrap(), CallerId(user));
    }

    #[test]
    fn test_missing_or_malformed_caller_is_rejected() {
        let req = TestRequest::default().to_http_request();
        assert!(matches!(parse_caller(&req), Err(AppError::Validation(_))));

        let req = TestRequest::default()
            .insert_header((USER_ID_HEADER, "not-a-uuid"))
            .to_http_request();
        assert!(matches!(parse_caller(&req), Err(AppError::Validation(_))));
    }
}
