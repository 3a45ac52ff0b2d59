use std::sync::Arc;

use tracing::info;

use crate::pool::NotificationPool;

/// Background task that periodically sweeps the pool.
///
/// First sweep after a fixed 1 s startup delay, then one sweep every half
/// debounce interval: that bounds worst-case notification latency to roughly
/// 1.5x the configured interval while every entry still gets at least one
/// full round to accumulate further edits.
pub async fn run_sweeper(pool: Arc<NotificationPool>) {
    let period = pool.config().sweep_period();
    info!(period_ms = period.as_millis() as u64, "notification sweeper started");

    tokio::time::sleep(pool.config().initial_delay()).await;
    let mut interval = tokio::time::interval(period);
    loop {
        interval.tick().await;
        pool.sweep().await;
    }
}

/// Spawn [`run_sweeper`] on the current runtime. Abort the handle to stop
/// sweeping; pending entries are simply never flushed after that.
pub fn spawn_sweeper(pool: Arc<NotificationPool>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(run_sweeper(pool))
}
