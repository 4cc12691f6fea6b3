// Types shared between the supervisor client and the monitoring core

use std::fmt;

/// One supervised program slot as reported by the supervisor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessSnapshot {
    /// OS process id, 0 when the slot has no running process
    pub pid: u32,
    /// Program name as known to the supervisor
    pub name: String,
    /// Supervisor state name (RUNNING, STOPPED, ...)
    pub state: String,
}

impl ProcessSnapshot {
    pub fn new(pid: u32, name: impl Into<String>) -> Self {
        Self {
            pid,
            name: name.into(),
            state: String::new(),
        }
    }

    /// A slot with pid 0 has nothing to measure
    pub fn is_running(&self) -> bool {
        self.pid != 0
    }
}

impl fmt::Display for ProcessSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "program:{} (pid {})", self.name, self.pid)
    }
}

/// Raw usage measurement for one process against its limit
#[derive(Debug, Clone, PartialEq)]
pub struct ProgramUsage {
    pub name: String,
    pub pid: u32,
    /// Measured value (bytes for memory)
    pub value: u64,
    /// Resolved limit in the same unit as `value`
    pub limit: u64,
    /// `value / limit * 100`
    pub percent: f64,
}

impl ProgramUsage {
    pub fn new(name: impl Into<String>, pid: u32, value: u64, limit: u64) -> Self {
        Self {
            name: name.into(),
            pid,
            value,
            limit,
            percent: percentage(value, limit),
        }
    }

    /// Usage at or above 100% is critical
    pub fn is_critical(&self) -> bool {
        self.percent >= 100.0
    }

    /// Strictly over the limit, compared in raw units
    pub fn exceeds_limit(&self) -> bool {
        self.value > self.limit
    }
}

fn percentage(value: u64, limit: u64) -> f64 {
    value as f64 / limit as f64 * 100.0
}
