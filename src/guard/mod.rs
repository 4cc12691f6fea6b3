// Guard module - Per-process limit decisions

mod checker;

pub use checker::{Checker, LimitAction, MemoryChecker};

use crate::error::Result;
use crate::metrics::{EventState, UsageEvent};
use crate::process::{MonitoredPrograms, ProcessSnapshot, ProgramUsage};
use tracing::{debug, trace};

/// Outcome of checking one process
#[derive(Debug, Clone, PartialEq)]
pub struct Assessment {
    pub usage: ProgramUsage,
    pub event: UsageEvent,
    /// Set only when the measured value is strictly above the limit
    pub action: Option<LimitAction>,
}

/// Decides, per process, whether it is within its limit
///
/// The limits table is resolved once in [`Guard::new`] and read-only from
/// then on.
pub struct Guard<C> {
    checker: C,
    programs: MonitoredPrograms,
}

/// Guard over resident memory
pub type MemoryGuard<P> = Guard<MemoryChecker<P>>;

impl<C: Checker> Guard<C> {
    /// Build a guard, resolving every program limit and the default limit
    ///
    /// # Returns
    /// * `Ok(Guard)` - All limits resolved to positive values
    /// * `Err(WardenError::ConfigError)` - A limit failed to resolve
    pub fn new<'a, I>(checker: C, programs: I, default_spec: &str) -> Result<Self>
    where
        I: IntoIterator<Item = (&'a String, &'a String)>,
    {
        let programs = MonitoredPrograms::build(programs, default_spec, |spec| {
            checker.resolve(spec)
        })?;

        Ok(Self { checker, programs })
    }

    /// Effective limit for a program
    pub fn limit(&self, name: &str) -> u64 {
        self.programs.limit(name)
    }

    pub fn programs(&self) -> &MonitoredPrograms {
        &self.programs
    }

    pub fn checker(&self) -> &C {
        &self.checker
    }

    /// Measure a process against its limit
    ///
    /// # Returns
    /// * `Ok(Some(usage))` - Measured
    /// * `Ok(None)` - Nothing to measure: idle slot or the process vanished
    /// * `Err(WardenError)` - Measurement failed for any other reason
    pub fn measure(&mut self, snapshot: &ProcessSnapshot) -> Result<Option<ProgramUsage>> {
        if !snapshot.is_running() {
            return Ok(None);
        }

        let limit = self.limit(&snapshot.name);
        let value = match self.checker.measure(snapshot.pid) {
            Ok(value) => value,
            Err(e) if e.is_process_gone() => {
                debug!("{} exited before it could be measured", snapshot);
                return Ok(None);
            }
            Err(e) => return Err(e),
        };

        Ok(Some(ProgramUsage::new(&snapshot.name, snapshot.pid, value, limit)))
    }

    /// Measure a process and build its usage event and limit decision
    ///
    /// A value equal to the limit reports `critical` without asking for any
    /// action; only a value strictly above the limit does.
    pub fn assess(&mut self, snapshot: &ProcessSnapshot) -> Result<Option<Assessment>> {
        let Some(usage) = self.measure(snapshot)? else {
            return Ok(None);
        };

        let state = if usage.is_critical() {
            EventState::Critical
        } else {
            EventState::Ok
        };

        let event = UsageEvent::new(
            format!("process:{}:limits:{}", usage.name, self.checker.resource()),
            state,
            usage.percent,
            format!(
                "{} is using {}b of {}b {} ({:.2}%)",
                usage.name,
                usage.value,
                usage.limit,
                self.checker.label(),
                usage.percent
            ),
        );

        let action = usage
            .exceeds_limit()
            .then(|| self.checker.on_exceed(&usage.name));

        trace!("{} assessed as {} ({:?})", snapshot, state, action);

        Ok(Some(Assessment {
            usage,
            event,
            action,
        }))
    }
}
