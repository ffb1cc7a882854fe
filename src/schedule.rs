//! # Schedule Trigger
//!
//! A triggerable edge that fires a callback on a fixed interval, e.g. to
//! reconcile a phase with its upstream source every few minutes. A failing
//! callback is logged and the schedule keeps running; only cancellation
//! stops it.

use async_trait::async_trait;
use futures::future::BoxFuture;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::core::{Edge, TriggerableEdge};
use crate::error::GluResult;

/// Shortest interval a schedule will tick at
pub const MIN_INTERVAL: Duration = Duration::from_millis(1);

type ScheduleFn = Arc<dyn Fn() -> BoxFuture<'static, anyhow::Result<()>> + Send + Sync>;

pub struct ScheduleTrigger {
    from: String,
    to: String,
    interval: Duration,
    callback: ScheduleFn,
    runs: AtomicU64,
}

impl ScheduleTrigger {
    /// Fire `callback` every `interval` for the edge `from -> to`.
    ///
    /// The first run happens one interval after the trigger starts.
    /// Intervals shorter than [`MIN_INTERVAL`] are raised to it.
    pub fn new<F, Fut>(
        from: impl Into<String>,
        to: impl Into<String>,
        interval: Duration,
        callback: F,
    ) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        Self {
            from: from.into(),
            to: to.into(),
            interval: interval.max(MIN_INTERVAL),
            callback: Arc::new(move || Box::pin(callback())),
            runs: AtomicU64::new(0),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Number of callback invocations that completed, successfully or not
    pub fn runs(&self) -> u64 {
        self.runs.load(Ordering::Relaxed)
    }
}

impl std::fmt::Debug for ScheduleTrigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScheduleTrigger")
            .field("from", &self.from)
            .field("to", &self.to)
            .field("interval", &self.interval)
            .finish_non_exhaustive()
    }
}

impl Edge for ScheduleTrigger {
    fn kind(&self) -> &str {
        "schedule"
    }

    fn from(&self) -> &str {
        &self.from
    }

    fn to(&self) -> &str {
        &self.to
    }
}

#[async_trait]
impl TriggerableEdge for ScheduleTrigger {
    async fn run_triggers(&self, shutdown: CancellationToken) -> GluResult<()> {
        info!(
            from = %self.from,
            to = %self.to,
            interval_ms = self.interval.as_millis() as u64,
            "Starting schedule"
        );

        let mut ticker = interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        // The first tick completes immediately.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => {}
            }

            match shutdown.run_until_cancelled((self.callback)()).await {
                None => break,
                Some(Ok(())) => {
                    debug!(from = %self.from, to = %self.to, "Scheduled run completed");
                }
                Some(Err(e)) => {
                    error!(from = %self.from, to = %self.to, error = %e, "Scheduled run failed");
                }
            }
            self.runs.fetch_add(1, Ordering::Relaxed);
        }

        debug!(from = %self.from, to = %self.to, runs = self.runs(), "Schedule stopped");
        Ok(())
    }
}
