use crate::error::{WardenError, Result};
use crate::process::ProcessSnapshot;
use std::process::Output;
use std::time::Duration;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::debug;

/// Exit status `supervisorctl status` uses when some programs are not running
const STATUS_SOME_NOT_RUNNING: i32 = 3;

/// Client for the process supervisor that owns the monitored programs
#[allow(async_fn_in_trait)]
pub trait Supervisor {
    /// Fetch every program slot the supervisor knows about
    async fn list_processes(&mut self) -> Result<Vec<ProcessSnapshot>>;

    /// Stop a program by name
    async fn stop_process(&mut self, name: &str) -> Result<()>;

    /// Start a program by name
    async fn start_process(&mut self, name: &str) -> Result<()>;
}

/// Supervisor client driving supervisord through `supervisorctl`
#[derive(Debug, Clone)]
pub struct SupervisorCtl {
    program: String,
    server_url: Option<String>,
    timeout: Duration,
}

impl SupervisorCtl {
    /// Create a client that runs `supervisorctl` from `PATH`
    pub fn new(server_url: Option<String>, timeout: Duration) -> Self {
        Self::with_program("supervisorctl", server_url, timeout)
    }

    /// Create a client that runs a specific `supervisorctl` executable
    pub fn with_program(
        program: impl Into<String>,
        server_url: Option<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            program: program.into(),
            server_url,
            timeout,
        }
    }

    /// Run one `supervisorctl` action and return its output
    async fn run(&self, args: &[&str]) -> Result<Output> {
        let mut command = Command::new(&self.program);
        if let Some(url) = &self.server_url {
            command.arg("-s").arg(url);
        }
        command.args(args).kill_on_drop(true);

        debug!("Running {} {}", self.program, args.join(" "));

        match timeout(self.timeout, command.output()).await {
            Ok(Ok(output)) => Ok(output),
            Ok(Err(e)) => Err(WardenError::SupervisorError(format!(
                "Failed to run {}: {}",
                self.program, e
            ))),
            Err(_) => Err(WardenError::TimeoutError(format!(
                "{} {} did not finish within {:?}",
                self.program,
                args.join(" "),
                self.timeout
            ))),
        }
    }

    /// Run a stop/start style action that must exit successfully
    async fn control(&self, action: &str, name: &str) -> Result<()> {
        let output = self.run(&[action, name]).await?;
        let stdout = String::from_utf8_lossy(&output.stdout);

        // supervisorctl before 4.x exits 0 even when the action failed
        if !output.status.success() || stdout.contains("ERROR") {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(WardenError::SupervisorError(format!(
                "{} {} failed: {}",
                action,
                name,
                format!("{} {}", stdout.trim(), stderr.trim()).trim()
            )));
        }

        Ok(())
    }
}

impl Supervisor for SupervisorCtl {
    async fn list_processes(&mut self) -> Result<Vec<ProcessSnapshot>> {
        let output = self.run(&["status"]).await?;

        match output.status.code() {
            Some(0) | Some(STATUS_SOME_NOT_RUNNING) => {}
            _ => {
                return Err(WardenError::SupervisorError(format!(
                    "status failed: {}",
                    String::from_utf8_lossy(&output.stderr).trim()
                )))
            }
        }

        parse_status(&String::from_utf8_lossy(&output.stdout))
    }

    async fn stop_process(&mut self, name: &str) -> Result<()> {
        self.control("stop", name).await
    }

    async fn start_process(&mut self, name: &str) -> Result<()> {
        self.control("start", name).await
    }
}

/// Parse `supervisorctl status` output
///
/// Lines look like `web RUNNING pid 1234, uptime 0:01:02` or
/// `worker STOPPED Not started`. Programs without a pid get pid 0.
pub fn parse_status(output: &str) -> Result<Vec<ProcessSnapshot>> {
    let mut snapshots = Vec::new();

    for line in output.lines() {
        let mut fields = line.split_whitespace();
        let (Some(name), Some(state)) = (fields.next(), fields.next()) else {
            continue;
        };

        if !state.chars().all(|c| c.is_ascii_uppercase()) {
            return Err(WardenError::SupervisorError(format!(
                "Unexpected status line: {}",
                line.trim()
            )));
        }

        let rest: Vec<&str> = fields.collect();
        let pid = rest
            .windows(2)
            .find(|pair| pair[0] == "pid")
            .map(|pair| {
                pair[1].trim_end_matches(',').parse::<u32>().map_err(|e| {
                    WardenError::SupervisorError(format!(
                        "Invalid pid in status line '{}': {}",
                        line.trim(),
                        e
                    ))
                })
            })
            .transpose()?
            .unwrap_or(0);

        snapshots.push(ProcessSnapshot {
            pid,
            name: name.to_string(),
            state: state.to_string(),
        });
    }

    Ok(snapshots)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_status_running_and_stopped() {
        let output = "\
web                              RUNNING   pid 1234, uptime 0:01:02
worker                           STOPPED   Not started
";
        let snapshots = parse_status(output).unwrap();
        assert_eq!(snapshots.len(), 2);
        assert_eq!(snapshots[0].name, "web");
        assert_eq!(snapshots[0].pid, 1234);
        assert_eq!(snapshots[0].state, "RUNNING");
        assert_eq!(snapshots[1].name, "worker");
        assert_eq!(snapshots[1].pid, 0);
        assert_eq!(snapshots[1].state, "STOPPED");
    }

    #[test]
    fn test_parse_status_grouped_program() {
        let output = "queue:queue_00   RUNNING   pid 77, uptime 1 day, 2:03:04\n";
        let snapshots = parse_status(output).unwrap();
        assert_eq!(snapshots[0].name, "queue:queue_00");
        assert_eq!(snapshots[0].pid, 77);
    }

    #[test]
    fn test_parse_status_skips_blank_lines() {
        let snapshots = parse_status("\n\n").unwrap();
        assert!(snapshots.is_empty());
    }

    #[test]
    fn test_parse_status_rejects_garbage() {
        let result = parse_status("unix:///var/run/supervisor.sock no such file\n");
        assert!(matches!(result, Err(WardenError::SupervisorError(_))));
    }

    #[tokio::test]
    async fn test_missing_supervisorctl_is_supervisor_error() {
        let mut ctl = SupervisorCtl::with_program(
            "/nonexistent/supervisorctl",
            None,
            Duration::from_secs(1),
        );
        let result = ctl.list_processes().await;
        assert!(matches!(result, Err(WardenError::SupervisorError(_))));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_control_reports_failure_exit() {
        let mut ctl = SupervisorCtl::with_program("false", None, Duration::from_secs(5));
        let result = ctl.stop_process("web").await;
        assert!(matches!(result, Err(WardenError::SupervisorError(_))));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_control_succeeds_on_clean_exit() {
        let mut ctl = SupervisorCtl::with_program("true", None, Duration::from_secs(5));
        assert!(ctl.start_process("web").await.is_ok());
    }
}
