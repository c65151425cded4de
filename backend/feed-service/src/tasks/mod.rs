//! Detached side effects of feed requests.
//!
//! Cache writes and invalidations are queued here instead of being awaited by
//! the request. A single worker drains the queue in submission order, so a
//! write and a later invalidation for the same user apply in that order.
//! Tasks run under their own deadlines and survive the caller going away.
//!
//! Failures never reach the caller; they are logged, counted and published
//! on a broadcast channel for whoever subscribes.

use std::fmt;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, oneshot};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::cache::FeedCache;
use crate::metrics;
use crate::models::CachedFeed;
use crate::upstream::with_deadline;

const FAILURE_CHANNEL_CAPACITY: usize = 64;

#[derive(Debug, Clone)]
pub enum FeedTask {
    StoreFeed(CachedFeed),
    InvalidateUser(Uuid),
}

impl FeedTask {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::StoreFeed(_) => "store_feed",
            Self::InvalidateUser(_) => "invalidate_user",
        }
    }

    pub fn user_id(&self) -> Uuid {
        match self {
            Self::StoreFeed(feed) => feed.user_id,
            Self::InvalidateUser(user_id) => *user_id,
        }
    }
}

/// A background task that did not complete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskFailure {
    pub kind: &'static str,
    pub user_id: Uuid,
    pub error: String,
}

impl fmt::Display for TaskFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} for user {} failed: {}", self.kind, self.user_id, self.error)
    }
}

enum Envelope {
    Task(FeedTask),
    Barrier(oneshot::Sender<()>),
}

#[derive(Debug, Clone, Copy)]
pub struct TaskDeadlines {
    pub store: Duration,
    pub invalidate: Duration,
}

#[derive(Clone)]
pub struct TaskDispatcher {
    sender: mpsc::UnboundedSender<Envelope>,
    failures: broadcast::Sender<TaskFailure>,
}

impl TaskDispatcher {
    /// Start the worker on the current tokio runtime.
    pub fn spawn(cache: FeedCache, deadlines: TaskDeadlines) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        let (failures, _) = broadcast::channel(FAILURE_CHANNEL_CAPACITY);

        tokio::spawn(run_worker(receiver, cache, deadlines, failures.clone()));
        info!(
            store_deadline_ms = deadlines.store.as_millis() as u64,
            invalidate_deadline_ms = deadlines.invalidate.as_millis() as u64,
            "Feed task dispatcher started"
        );

        Self { sender, failures }
    }

    /// Queue a task. Never fails the caller.
    pub fn dispatch(&self, task: FeedTask) {
        let kind = task.kind();
        let user_id = task.user_id();
        if self.sender.send(Envelope::Task(task)).is_err() {
            warn!(kind, user_id = %user_id, "Task worker is gone, dropping task");
            metrics::record_background_task(kind, "dropped");
        }
    }

    /// Receive failures of tasks that finish after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<TaskFailure> {
        self.failures.subscribe()
    }

    /// Wait until every task queued before this call has run.
    pub async fn flush(&self) {
        let (done, wait) = oneshot::channel();
        if self.sender.send(Envelope::Barrier(done)).is_err() {
            return;
        }
        let _ = wait.await;
    }
}

async fn run_worker(
    mut receiver: mpsc::UnboundedReceiver<Envelope>,
    cache: FeedCache,
    deadlines: TaskDeadlines,
    failures: broadcast::Sender<TaskFailure>,
) {
    while let Some(envelope) = receiver.recv().await {
        match envelope {
            Envelope::Barrier(done) => {
                let _ = done.send(());
            }
            Envelope::Task(task) => execute(&cache, deadlines, task, &failures).await,
        }
    }
    info!("Feed task dispatcher stopped");
}

async fn execute(
    cache: &FeedCache,
    deadlines: TaskDeadlines,
    task: FeedTask,
    failures: &broadcast::Sender<TaskFailure>,
) {
    let kind = task.kind();
    let user_id = task.user_id();

    let outcome = match task {
        FeedTask::StoreFeed(feed) => {
            with_deadline("cache_write", deadlines.store, cache.store(feed)).await
        }
        FeedTask::InvalidateUser(user_id) => {
            with_deadline("cache_invalidate", deadlines.invalidate, cache.invalidate(user_id))
                .await
                .map(|removed| debug!(user_id = %user_id, removed, "Invalidation task finished"))
        }
    };

    match outcome {
        Ok(()) => metrics::record_background_task(kind, "success"),
        Err(e) => {
            warn!(kind, user_id = %user_id, error = %e, "Background feed task failed");
            metrics::record_background_task(kind, "error");
            // no subscribers is fine
            let _ = failures.send(TaskFailure {
                kind,
                user_id,
                error: e.to_string(),
            });
        }
    }
}
