use crate::error::Result;
use crate::process::{LimitResolver, MemoryProbe};

/// What to do with a program that went over its limit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimitAction {
    /// Only report the usage
    Log,
    /// Stop and start the program through the supervisor
    Restart,
}

/// One kind of resource a program can be limited on
pub trait Checker {
    /// Short resource tag used in event service names, e.g. `mem`
    fn resource(&self) -> &'static str;

    /// Human label for the measured quantity, e.g. `RSS`
    fn label(&self) -> &'static str;

    /// Resolve a limit specification into an absolute threshold
    fn resolve(&self, spec: &str) -> Result<u64>;

    /// Measure the current value for `pid`
    fn measure(&mut self, pid: u32) -> Result<u64>;

    /// Action to take when program `name` exceeds its limit
    fn on_exceed(&self, name: &str) -> LimitAction;
}

/// Resident memory checker
pub struct MemoryChecker<P> {
    resolver: LimitResolver,
    probe: P,
}

impl<P: MemoryProbe> MemoryChecker<P> {
    pub fn new(resolver: LimitResolver, probe: P) -> Self {
        Self { resolver, probe }
    }

    pub fn probe(&self) -> &P {
        &self.probe
    }
}

impl<P: MemoryProbe> Checker for MemoryChecker<P> {
    fn resource(&self) -> &'static str {
        "mem"
    }

    fn label(&self) -> &'static str {
        "RSS"
    }

    fn resolve(&self, spec: &str) -> Result<u64> {
        self.resolver.resolve(spec)
    }

    fn measure(&mut self, pid: u32) -> Result<u64> {
        self.probe.resident_set_size(pid)
    }

    fn on_exceed(&self, _name: &str) -> LimitAction {
        LimitAction::Restart
    }
}
