use crate::error::{WardenError, Result};
use crate::process::{ProcessSnapshot, Supervisor};
use sysinfo::{Pid, ProcessRefreshKind, ProcessesToUpdate, System};
use tracing::{debug, trace};

/// Source of resident set size measurements
pub trait MemoryProbe {
    /// Resident set size of `pid` in bytes
    ///
    /// # Returns
    /// * `Ok(bytes)` - Current RSS
    /// * `Err(WardenError::ProcessNotFound)` - The process no longer exists
    fn resident_set_size(&mut self, pid: u32) -> Result<u64>;
}

/// Memory probe backed by sysinfo
pub struct SysinfoProbe {
    system: System,
}

impl SysinfoProbe {
    pub fn new() -> Self {
        Self {
            system: System::new(),
        }
    }
}

impl Default for SysinfoProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryProbe for SysinfoProbe {
    fn resident_set_size(&mut self, pid: u32) -> Result<u64> {
        let sys_pid = Pid::from_u32(pid);

        // Refresh only this process, and only its memory
        self.system.refresh_processes_specifics(
            ProcessesToUpdate::Some(&[sys_pid]),
            true,
            ProcessRefreshKind::new().with_memory(),
        );

        self.system
            .process(sys_pid)
            .map(|process| process.memory())
            .ok_or(WardenError::ProcessNotFound(pid))
    }
}

/// Fetches the roster of supervised processes once per tick
#[derive(Debug, Default)]
pub struct ProcessMonitor {
    /// Number of live processes seen in the previous roster
    last_live: Option<usize>,
}

impl ProcessMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    /// List the processes worth checking
    ///
    /// Program slots without a running process (pid 0) are dropped here so
    /// nothing downstream ever measures, reports, or restarts them.
    pub async fn list<S: Supervisor>(&mut self, supervisor: &mut S) -> Result<Vec<ProcessSnapshot>> {
        let roster = supervisor.list_processes().await?;
        let total = roster.len();

        let live: Vec<ProcessSnapshot> = roster
            .into_iter()
            .filter(|snapshot| {
                if !snapshot.is_running() {
                    trace!("Skipping program:{} with no running process", snapshot.name);
                }
                snapshot.is_running()
            })
            .collect();

        if self.last_live != Some(live.len()) {
            debug!(
                "Supervisor reports {} program(s), {} running",
                total,
                live.len()
            );
            self.last_live = Some(live.len());
        }

        Ok(live)
    }
}
