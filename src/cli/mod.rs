// CLI module - Command-line entry point for the watchdog

pub mod output;

use crate::config::WardenConfig;
use crate::daemon::Daemon;
use crate::error::{WardenError, Result};
use crate::guard::MemoryChecker;
use crate::metrics::TcpSink;
use crate::process::{LimitResolver, SupervisorCtl, SysinfoProbe};
use clap::Parser;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// rsswarden - restarts supervisord programs that outgrow their memory limit
#[derive(Debug, Parser)]
#[command(name = "rsswarden")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Configuration file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Metrics sink host, overrides the configuration file
    #[arg(long)]
    host: Option<String>,

    /// Metrics sink port, overrides the configuration file
    #[arg(long)]
    port: Option<u16>,

    /// Log level or tracing filter directive
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Print current memory usage of every program once and exit
    #[arg(long)]
    stats: bool,
}

impl Cli {
    /// Run the CLI application
    pub async fn run() -> Result<()> {
        let cli = Cli::parse();
        cli.execute().await
    }

    /// Execute the parsed command line
    async fn execute(&self) -> Result<()> {
        init_logging(&self.log_level)?;

        let config = self.load_config()?;
        let supervisor = SupervisorCtl::new(config.supervisor_url.clone(), config.timeout);
        let checker = MemoryChecker::new(LimitResolver::new(), SysinfoProbe::new());

        if self.stats {
            let mut daemon = Daemon::<_, _, TcpSink>::new(&config, supervisor, checker, None)?;
            let usage = daemon.stats().await?;
            output::print_usage_table(&usage);
            return Ok(());
        }

        let sink = match &config.sink {
            Some(sink) => Some(TcpSink::connect(&sink.host, sink.port, config.timeout).await?),
            None => {
                info!("No metrics sink configured, usage is only logged");
                None
            }
        };

        info!("Watching supervisord programs for memory overuse");
        Daemon::new(&config, supervisor, checker, sink)?.run().await
    }

    /// Load the configuration file, if any, and apply command-line overrides
    fn load_config(&self) -> Result<WardenConfig> {
        let config = match &self.config {
            Some(path) => WardenConfig::from_file(path)?,
            None => WardenConfig::default(),
        };

        Ok(config.with_sink_override(self.host.clone(), self.port))
    }
}

/// Install the global tracing subscriber, logging to stderr
fn init_logging(level: &str) -> Result<()> {
    let filter = EnvFilter::try_new(level).map_err(|e| {
        WardenError::ConfigError(format!("Invalid log level '{}': {}", level, e))
    })?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| WardenError::ConfigError(format!("Failed to initialise logging: {}", e)))
}
