use actix_web::{post, web, HttpResponse};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{CallerId, FeedHandlerState};
use crate::error::{AppError, Result};
use crate::models::{InteractionSource, InteractionType};

#[derive(Debug, Deserialize, Serialize)]
pub struct InteractionRequest {
    pub post_id: Uuid,
    pub interaction_type: String,
    pub source: Option<String>,
    /// Seconds spent on the post.
    #[serde(default)]
    pub time_spent: i64,
}

impl InteractionRequest {
    fn validate(&self) -> Result<(InteractionType, InteractionSource, u64)> {
        let interaction_type = InteractionType::from(self.interaction_type.clone());
        if !interaction_type.is_known() {
            return Err(AppError::Validation(format!(
                "Invalid interaction_type '{}'. Must be one of: view, like, comment, share, save, hide, report",
                self.interaction_type
            )));
        }

        let source = match self.source.as_deref() {
            None | Some("") => InteractionSource::Feed,
            Some(raw) => raw.parse()?,
        };

        if self.time_spent < 0 {
            return Err(AppError::Validation(
                "time_spent must not be negative".to_string(),
            ));
        }

        Ok((interaction_type, source, self.time_spent as u64))
    }
}

#[derive(Debug, Serialize)]
struct InteractionRecorded {
    id: Uuid,
    interaction_score: f64,
    status: &'static str,
}

/// `POST /api/v1/feed/interactions`
#[post("/interactions")]
pub async fn record_interaction(
    caller: CallerId,
    body: web::Json<InteractionRequest>,
    state: web::Data<FeedHandlerState>,
) -> Result<HttpResponse> {
    let (interaction_type, source, time_spent) = body.validate()?;

    let recorded = state
        .engine
        .record_interaction(caller.0, body.post_id, interaction_type, source, time_spent)
        .await?;

    Ok(HttpResponse::Created().json(InteractionRecorded {
        id: recorded.id,
        interaction_score: recorded.interaction_score,
        status: "recorded",
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(kind: &str, source: Option<&str>, time_spent: i64) -> InteractionRequest {
        InteractionRequest {
            post_id: Uuid::new_v4(),
            interaction_type: kind.to_string(),
            source: source.map(str::to_string),
            time_spent,
        }
    }

    #[test]
    fn test_accepts_known_types_and_defaults_source() {
        let (kind, source, secs) = request("hide", None, 12).validate().unwrap();
        assert_eq!(kind, InteractionType::Hide);
        assert_eq!(source, InteractionSource::Feed);
        assert_eq!(secs, 12);
    }

    #[test]
    fn test_rejects_bad_input() {
        assert!(matches!(
            request("bookmark", None, 0).validate(),
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            request("like", Some("email"), 0).validate(),
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            request("like", Some("search"), -1).validate(),
            Err(AppError::Validation(_))
        ));
    }
}
