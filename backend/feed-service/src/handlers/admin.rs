use actix_web::{delete, web, HttpResponse};
use serde::Serialize;
use uuid::Uuid;

use super::FeedHandlerState;
use crate::error::{AppError, Result};

#[derive(Debug, Serialize)]
struct InvalidationResponse {
    user_id: Uuid,
    removed: usize,
}

/// `DELETE /api/v1/admin/feed/{user_id}` drops every cached feed of a user.
#[delete("/feed/{user_id}")]
pub async fn invalidate_user_feeds(
    path: web::Path<String>,
    state: web::Data<FeedHandlerState>,
) -> Result<HttpResponse> {
    let user_id = Uuid::parse_str(&path)
        .map_err(|_| AppError::Validation(format!("Invalid user id '{}'", path)))?;

    let removed = state.engine.invalidate_feed(user_id).await;
    Ok(HttpResponse::Ok().json(InvalidationResponse { user_id, removed }))
}
