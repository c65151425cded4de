//! Expired feed cache sweeper
//!
//! Reads already skip expired entries; this job reclaims their memory.
//! Redis expires keys natively, so there every cycle reports zero.

use crate::cache::FeedCache;
use crate::metrics;
use std::time::{Duration, Instant};
use tokio::time::sleep;

pub async fn start_cache_sweeper(cache: FeedCache, interval: Duration) {
    tracing::info!(
        "Starting feed cache sweeper (interval={}s, ttl={}s)",
        interval.as_secs(),
        cache.ttl().num_seconds()
    );

    loop {
        sleep(interval).await;
        run_sweep_cycle(&cache).await;
    }
}

/// One sweep pass. Returns the number of entries removed.
pub async fn run_sweep_cycle(cache: &FeedCache) -> usize {
    let cycle_start = Instant::now();

    match cache.sweep_expired().await {
        Ok(removed) => {
            metrics::record_cache_sweep("success");
            tracing::debug!(
                removed,
                duration_ms = cycle_start.elapsed().as_millis() as u64,
                "Feed cache sweep completed"
            );
            removed
        }
        Err(e) => {
            metrics::record_cache_sweep("error");
            tracing::error!(
                error = %e,
                duration_ms = cycle_start.elapsed().as_millis() as u64,
                "Feed cache sweep failed"
            );
            0
        }
    }
}
