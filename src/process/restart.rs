use crate::error::Result;
use crate::process::Supervisor;
use std::collections::HashMap;
use tracing::{info, warn};

/// Restarts over-budget programs through the supervisor
///
/// Every call issues a stop followed by a start and waits for both. There is
/// no queue, retry, or cool-down: a program still over its limit on the next
/// tick is restarted again.
#[derive(Debug, Default)]
pub struct RestartController {
    /// Restarts issued per program since start-up
    restarts: HashMap<String, usize>,
}

impl RestartController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stop then start `name`
    ///
    /// A failed stop is logged and the start is still attempted, so a
    /// program that was already down comes back up.
    ///
    /// # Returns
    /// * `Ok(())` - Both calls succeeded
    /// * `Err(WardenError)` - The first failure
    pub async fn restart<S: Supervisor>(&mut self, supervisor: &mut S, name: &str) -> Result<()> {
        let count = self.restarts.entry(name.to_string()).or_insert(0);
        *count += 1;
        warn!("Restarting program:{} (restart #{})", name, count);

        let stopped = supervisor.stop_process(name).await;
        if let Err(e) = &stopped {
            warn!("Failed to stop program:{}: {}", name, e);
        }

        supervisor.start_process(name).await?;
        stopped?;

        info!("Restarted program:{}", name);
        Ok(())
    }

    /// Number of restarts issued for `name`
    pub fn restart_count(&self, name: &str) -> usize {
        self.restarts.get(name).copied().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::WardenError;
    use crate::process::ProcessSnapshot;

    #[derive(Default)]
    struct ScriptedSupervisor {
        calls: Vec<String>,
        fail_stop: bool,
        fail_start: bool,
    }

    impl Supervisor for ScriptedSupervisor {
        async fn list_processes(&mut self) -> Result<Vec<ProcessSnapshot>> {
            Ok(Vec::new())
        }

        async fn stop_process(&mut self, name: &str) -> Result<()> {
            self.calls.push(format!("stop:{}", name));
            if self.fail_stop {
                return Err(WardenError::SupervisorError("NOT_RUNNING".to_string()));
            }
            Ok(())
        }

        async fn start_process(&mut self, name: &str) -> Result<()> {
            self.calls.push(format!("start:{}", name));
            if self.fail_start {
                return Err(WardenError::SupervisorError("SPAWN_ERROR".to_string()));
            }
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_restart_stops_then_starts() {
        let mut supervisor = ScriptedSupervisor::default();
        let mut controller = RestartController::new();

        controller.restart(&mut supervisor, "leaky").await.unwrap();

        assert_eq!(supervisor.calls, vec!["stop:leaky", "start:leaky"]);
        assert_eq!(controller.restart_count("leaky"), 1);
    }

    #[tokio::test]
    async fn test_repeated_restarts_have_no_cooldown() {
        let mut supervisor = ScriptedSupervisor::default();
        let mut controller = RestartController::new();

        controller.restart(&mut supervisor, "leaky").await.unwrap();
        controller.restart(&mut supervisor, "leaky").await.unwrap();

        assert_eq!(supervisor.calls.len(), 4);
        assert_eq!(controller.restart_count("leaky"), 2);
        assert_eq!(controller.restart_count("other"), 0);
    }

    #[tokio::test]
    async fn test_failed_stop_still_starts() {
        let mut supervisor = ScriptedSupervisor {
            fail_stop: true,
            ..Default::default()
        };
        let mut controller = RestartController::new();

        let result = controller.restart(&mut supervisor, "leaky").await;

        assert!(matches!(result, Err(WardenError::SupervisorError(_))));
        assert_eq!(supervisor.calls, vec!["stop:leaky", "start:leaky"]);
    }

    #[tokio::test]
    async fn test_failed_start_is_returned() {
        let mut supervisor = ScriptedSupervisor {
            fail_start: true,
            ..Default::default()
        };
        let mut controller = RestartController::new();

        let result = controller.restart(&mut supervisor, "leaky").await;
        match result {
            Err(WardenError::SupervisorError(msg)) => assert_eq!(msg, "SPAWN_ERROR"),
            other => panic!("Expected SupervisorError, got: {:?}", other),
        }
    }
}
