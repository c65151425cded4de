use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use uuid::Uuid;

use crate::clock::Clock;
use crate::error::{AppError, Result};
use crate::metrics;
use crate::models::{InteractionSource, InteractionType, UserInteraction};
use crate::tasks::{FeedTask, TaskDispatcher};
use crate::upstream::{with_deadline, InteractionStore};

/// Dwell time that earns one extra multiple of the base score.
const DWELL_UNIT_SECS: f64 = 30.0;
const MAX_DWELL_BONUS: f64 = 2.0;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewInteraction {
    pub user_id: Uuid,
    pub content_id: Uuid,
    pub interaction_type: InteractionType,
    pub source: InteractionSource,
    pub time_spent_seconds: u64,
}

/// `base · (1 + min(time_spent / 30, 2))`
pub fn interaction_score(interaction_type: &InteractionType, time_spent_seconds: u64) -> f64 {
    let bonus = (time_spent_seconds as f64 / DWELL_UNIT_SECS).min(MAX_DWELL_BONUS);
    interaction_type.base_score() * (1.0 + bonus)
}

/// Persists engagement and schedules invalidation of the user's feeds.
#[derive(Clone)]
pub struct InteractionRecorder {
    store: Arc<dyn InteractionStore>,
    dispatcher: TaskDispatcher,
    clock: Arc<dyn Clock>,
    deadline: Duration,
}

impl InteractionRecorder {
    pub fn new(
        store: Arc<dyn InteractionStore>,
        dispatcher: TaskDispatcher,
        clock: Arc<dyn Clock>,
        deadline: Duration,
    ) -> Self {
        Self {
            store,
            dispatcher,
            clock,
            deadline,
        }
    }

    pub async fn record(&self, input: NewInteraction) -> Result<UserInteraction> {
        if input.user_id.is_nil() || input.content_id.is_nil() {
            return Err(AppError::Validation(
                "user_id and content_id must be set".to_string(),
            ));
        }

        let interaction = UserInteraction {
            id: Uuid::new_v4(),
            user_id: input.user_id,
            content_id: input.content_id,
            interaction_score: interaction_score(
                &input.interaction_type,
                input.time_spent_seconds,
            ),
            interaction_type: input.interaction_type,
            time_spent_seconds: input.time_spent_seconds,
            source: input.source,
            created_at: self.clock.now(),
        };

        with_deadline(
            "append_interaction",
            self.deadline,
            self.store.append(interaction.clone()),
        )
        .await?;

        metrics::record_interaction(interaction.interaction_type.as_str());
        info!(
            user_id = %interaction.user_id,
            content_id = %interaction.content_id,
            interaction_type = %interaction.interaction_type,
            source = interaction.source.as_str(),
            score = interaction.interaction_score,
            "Recorded interaction"
        );

        self.dispatcher
            .dispatch(FeedTask::InvalidateUser(interaction.user_id));
        Ok(interaction)
    }
}
