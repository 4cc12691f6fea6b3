use std::future::Future;
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::warn;

/// Paces a loop so consecutive iterations start `period` apart
///
/// An iteration that runs longer than `period` is followed immediately by
/// the next one. There is no catch-up for lost time and no backoff.
#[derive(Debug)]
pub struct Interval {
    period: Duration,
    /// When the current iteration started
    anchor: Instant,
}

impl Interval {
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            anchor: Instant::now(),
        }
    }

    /// Start of the most recent iteration
    pub fn anchor(&self) -> Instant {
        self.anchor
    }

    /// Run one iteration, then sleep for whatever is left of the period
    ///
    /// The anchor is taken when `pace` starts and reset once the sleep (if
    /// any) is over.
    pub async fn pace<F: Future>(&mut self, tick: F) -> F::Output {
        self.anchor = Instant::now();
        let output = tick.await;

        let elapsed = self.anchor.elapsed();
        match self.period.checked_sub(elapsed) {
            Some(remaining) if !remaining.is_zero() => sleep(remaining).await,
            _ => warn!(
                "Tick took {:?}, longer than the {:?} interval; starting the next one now",
                elapsed, self.period
            ),
        }

        self.anchor = Instant::now();
        output
    }
}
