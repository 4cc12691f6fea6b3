// Daemon module - The monitoring loop

pub mod interval;

pub use interval::Interval;

use crate::config::WardenConfig;
use crate::error::Result;
use crate::guard::{Checker, Guard, LimitAction};
use crate::metrics::{MetricsReporter, MetricsSink};
use crate::process::{ProcessMonitor, ProcessSnapshot, ProgramUsage, RestartController, Supervisor};
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Watchdog that checks every supervised process once per interval
///
/// Everything runs on the calling task, one collaborator call at a time.
pub struct Daemon<S, C, K> {
    supervisor: S,
    monitor: ProcessMonitor,
    guard: Guard<C>,
    reporter: MetricsReporter<K>,
    restarter: RestartController,
    period: Duration,
}

impl<S, C, K> Daemon<S, C, K>
where
    S: Supervisor,
    C: Checker,
    K: MetricsSink,
{
    /// Create a daemon, resolving all configured limits up front
    ///
    /// # Returns
    /// * `Ok(Daemon)` - Ready to run
    /// * `Err(WardenError::ConfigError)` - A limit did not resolve to a positive value
    pub fn new(config: &WardenConfig, supervisor: S, checker: C, sink: Option<K>) -> Result<Self> {
        let guard = Guard::new(checker, &config.programs, &config.default_limit)?;

        info!(
            "Monitoring {} program(s) with explicit limits, default limit {} bytes",
            guard.programs().len(),
            guard.programs().default_limit()
        );

        Ok(Self {
            supervisor,
            monitor: ProcessMonitor::new(),
            guard,
            reporter: MetricsReporter::new(sink),
            restarter: RestartController::new(),
            period: config.interval,
        })
    }

    /// Run ticks forever, one per interval
    ///
    /// Only returns when a tick fails in a way that cannot be recovered,
    /// such as losing the supervisor.
    pub async fn run(mut self) -> Result<()> {
        info!("Checking processes every {:?}", self.period);

        let mut interval = Interval::new(self.period);
        loop {
            if let Err(e) = interval.pace(self.tick()).await {
                error!("Monitoring stopped: {}", e);
                return Err(e);
            }
        }
    }

    /// Check every running process once
    pub async fn tick(&mut self) -> Result<()> {
        let snapshots = self.monitor.list(&mut self.supervisor).await?;
        debug!("Checking {} process(es)", snapshots.len());

        for snapshot in &snapshots {
            self.evaluate(snapshot).await?;
        }

        Ok(())
    }

    /// Check one process: report its usage and restart it if over its limit
    pub async fn evaluate(&mut self, snapshot: &ProcessSnapshot) -> Result<()> {
        let Some(assessment) = self.guard.assess(snapshot)? else {
            return Ok(());
        };

        self.reporter.emit(&assessment.event).await;

        match assessment.action {
            Some(LimitAction::Restart) => {
                if let Err(e) = self
                    .restarter
                    .restart(&mut self.supervisor, &snapshot.name)
                    .await
                {
                    error!("Failed to restart program:{}: {}", snapshot.name, e);
                }
            }
            Some(LimitAction::Log) => {
                warn!("{}", assessment.event.description);
            }
            None => {}
        }

        Ok(())
    }

    /// Measure every running process once without reporting or restarting
    pub async fn stats(&mut self) -> Result<Vec<ProgramUsage>> {
        let snapshots = self.monitor.list(&mut self.supervisor).await?;

        let mut usage = Vec::with_capacity(snapshots.len());
        for snapshot in &snapshots {
            if let Some(measured) = self.guard.measure(snapshot)? {
                usage.push(measured);
            }
        }

        Ok(usage)
    }

    pub fn supervisor(&self) -> &S {
        &self.supervisor
    }

    pub fn reporter(&self) -> &MetricsReporter<K> {
        &self.reporter
    }

    pub fn restarter(&self) -> &RestartController {
        &self.restarter
    }

    pub fn guard(&self) -> &Guard<C> {
        &self.guard
    }
}
