use std::sync::Arc;
use std::time::Duration;

use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::pipeline::Pipeline;

const MIN_PERIOD: Duration = Duration::from_secs(1);

/// Drives `Pipeline::run_cycle` on a fixed period after an initial delay.
pub struct Scheduler {
    pipeline: Arc<Pipeline>,
    period: Duration,
    initial_delay: Duration,
}

impl Scheduler {
    /// `period` is clamped to at least one second; a zero period is never valid.
    pub fn new(pipeline: Arc<Pipeline>, period: Duration, initial_delay: Duration) -> Self {
        Self {
            pipeline,
            period: period.max(MIN_PERIOD),
            initial_delay,
        }
    }

    /// Run until `shutdown` is cancelled. Returns the number of completed cycles.
    ///
    /// A cycle in progress finishes its current subscription before returning.
    pub async fn run(&self, shutdown: CancellationToken) -> usize {
        info!(
            period_secs = self.period.as_secs(),
            initial_delay_secs = self.initial_delay.as_secs(),
            "Scheduler started"
        );

        let mut ticker = time::interval_at(Instant::now() + self.initial_delay, self.period);
        // A slow cycle pushes the next one back instead of firing a burst.
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut cycles = 0;
        loop {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => {}
            }
            self.pipeline.run_cycle(&shutdown).await;
            cycles += 1;
        }

        info!(cycles, "Scheduler stopped");
        cycles
    }
}
