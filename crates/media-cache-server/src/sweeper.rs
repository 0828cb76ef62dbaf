//! Periodic expiry sweep

use media_cache::MediaCache;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::debug;

/// Sweep expired entries every `every`, starting one period from now
pub fn spawn_sweeper(cache: Arc<MediaCache>, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately; startup already swept
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let removed = cache.sweep_expired().await;
            debug!(removed, "Periodic sweep finished");
        }
    })
}
