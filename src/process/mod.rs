// Process module - Supervisor roster, measurement, limits and restarts

pub mod limits;
pub mod monitor;
pub mod restart;
pub mod supervisor;
mod types;

pub use limits::{LimitResolver, MonitoredPrograms};
pub use monitor::{MemoryProbe, ProcessMonitor, SysinfoProbe};
pub use restart::RestartController;
pub use supervisor::{Supervisor, SupervisorCtl};
pub use types::{ProcessSnapshot, ProgramUsage};
