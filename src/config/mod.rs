// Config module - Loads the immutable watchdog configuration

pub mod include;

use crate::error::{WardenError, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;
use toml::{Table, Value};
use tracing::{debug, warn};

/// Section holding the daemon's own settings
pub const MAIN_SECTION: &str = "rsswarden";

/// Section listing additional files to merge
pub const INCLUDE_SECTION: &str = "include";

/// Prefix of per-program sections, e.g. `["program:web"]`
pub const PROGRAM_PREFIX: &str = "program:";

/// Where usage events are sent
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SinkConfig {
    pub host: String,
    pub port: u16,
}

/// Fully resolved watchdog configuration
///
/// Produced once at start-up and never modified while the daemon runs.
#[derive(Debug, Clone, PartialEq)]
pub struct WardenConfig {
    /// Metrics sink, `None` to only log events
    pub sink: Option<SinkConfig>,
    /// Transport timeout for supervisor commands and sink writes
    pub timeout: Duration,
    /// Target spacing between the starts of consecutive ticks
    pub interval: Duration,
    /// Limit for programs without their own `memory` setting
    pub default_limit: String,
    /// supervisord server URL, `None` for supervisorctl's own default
    pub supervisor_url: Option<String>,
    /// Program name to memory limit specification
    pub programs: BTreeMap<String, String>,
}

/// Raw `[rsswarden]` section
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct MainSection {
    #[serde(default)]
    host: Option<String>,
    #[serde(default = "default_port")]
    port: u16,
    #[serde(default = "default_timeout")]
    timeout: f64,
    #[serde(default = "default_interval")]
    interval: f64,
    #[serde(default = "default_limit")]
    default_limit: String,
    #[serde(default)]
    supervisor_url: Option<String>,
}

/// Raw `["program:<name>"]` section
#[derive(Debug, Deserialize)]
struct ProgramSection {
    #[serde(default)]
    memory: Option<LimitSpec>,
}

/// A limit written either as text (`"100mb"`) or as a byte count (`1000`)
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum LimitSpec {
    Text(String),
    Bytes(i64),
}

impl LimitSpec {
    fn into_spec(self) -> String {
        match self {
            LimitSpec::Text(text) => text,
            LimitSpec::Bytes(bytes) => bytes.to_string(),
        }
    }
}

// Default value functions for serde
fn default_port() -> u16 {
    5555
}

fn default_timeout() -> f64 {
    5.0
}

fn default_interval() -> f64 {
    5.0
}

fn default_limit() -> String {
    "80%".to_string()
}

impl Default for WardenConfig {
    fn default() -> Self {
        Self {
            sink: None,
            timeout: Duration::from_secs_f64(default_timeout()),
            interval: Duration::from_secs_f64(default_interval()),
            default_limit: default_limit(),
            supervisor_url: None,
            programs: BTreeMap::new(),
        }
    }
}

impl WardenConfig {
    /// Load a configuration file and every file its `[include]` section names
    ///
    /// Include patterns are resolved relative to the directory of `path`.
    /// Files are merged in the order they are matched; a key set by a later
    /// file replaces the same key from an earlier one, and included files
    /// replace keys from the primary file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let mut table = read_table(path)?;

        if let Some(include) = table.remove(INCLUDE_SECTION) {
            let base_dir = match path.parent() {
                Some(dir) if !dir.as_os_str().is_empty() => dir,
                _ => Path::new("."),
            };

            for file in include_files(&include, base_dir)? {
                debug!("Including configuration from {}", file.display());
                let mut overlay = read_table(&file)?;
                if overlay.remove(INCLUDE_SECTION).is_some() {
                    warn!(
                        "Ignoring nested [{}] section in {}",
                        INCLUDE_SECTION,
                        file.display()
                    );
                }
                merge_tables(&mut table, overlay);
            }
        }

        Self::from_table(table)
    }

    /// Parse a configuration from TOML text, without include processing
    pub fn from_toml(contents: &str) -> Result<Self> {
        let table: Table = toml::from_str(contents)
            .map_err(|e| WardenError::InvalidConfig(format!("Failed to parse TOML: {}", e)))?;
        if table.contains_key(INCLUDE_SECTION) {
            return Err(WardenError::ConfigError(format!(
                "[{}] is only supported when loading from a file",
                INCLUDE_SECTION
            )));
        }
        Self::from_table(table)
    }

    /// Build the configuration from merged sections
    fn from_table(table: Table) -> Result<Self> {
        let mut main: Option<MainSection> = None;
        let mut programs = BTreeMap::new();

        for (section, value) in table {
            if section == MAIN_SECTION {
                main = Some(value.try_into().map_err(|e| {
                    WardenError::InvalidConfig(format!("[{}]: {}", MAIN_SECTION, e))
                })?);
            } else if let Some(name) = section.strip_prefix(PROGRAM_PREFIX) {
                if name.is_empty() {
                    return Err(WardenError::MissingConfigField(format!(
                        "program name in [{}]",
                        section
                    )));
                }

                let program: ProgramSection = value.try_into().map_err(|e| {
                    WardenError::InvalidConfig(format!("[{}]: {}", section, e))
                })?;

                match program.memory {
                    Some(spec) => {
                        programs.insert(name.to_string(), spec.into_spec());
                    }
                    None => debug!("[{}] has no memory limit, using the default", section),
                }
            } else {
                warn!("Ignoring unknown configuration section [{}]", section);
            }
        }

        let main = match main {
            Some(main) => main,
            None => Value::Table(Table::new()).try_into().map_err(|e| {
                WardenError::InvalidConfig(format!("[{}]: {}", MAIN_SECTION, e))
            })?,
        };

        let config = Self {
            sink: main.host.map(|host| SinkConfig {
                host,
                port: main.port,
            }),
            timeout: seconds("timeout", main.timeout)?,
            interval: seconds("interval", main.interval)?,
            default_limit: main.default_limit,
            supervisor_url: main.supervisor_url,
            programs,
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if let Some(sink) = &self.sink {
            if sink.host.trim().is_empty() {
                return Err(WardenError::ConfigValidationError(
                    "host must not be empty".to_string(),
                ));
            }
        }

        if self.default_limit.trim().is_empty() {
            return Err(WardenError::MissingConfigField("default_limit".to_string()));
        }

        Ok(())
    }

    /// Replace the sink host and/or port, as given on the command line
    ///
    /// A port without a host only applies when a host is already configured.
    pub fn with_sink_override(mut self, host: Option<String>, port: Option<u16>) -> Self {
        if let Some(host) = host {
            let port = port
                .or(self.sink.as_ref().map(|sink| sink.port))
                .unwrap_or_else(default_port);
            self.sink = Some(SinkConfig { host, port });
        } else if let (Some(port), Some(sink)) = (port, self.sink.as_mut()) {
            sink.port = port;
        }
        self
    }
}

/// Read and parse one TOML file into its sections
fn read_table(path: &Path) -> Result<Table> {
    let contents = std::fs::read_to_string(path).map_err(|e| {
        WardenError::ConfigError(format!(
            "Failed to read config file {}: {}",
            path.display(),
            e
        ))
    })?;

    toml::from_str(&contents).map_err(|e| {
        WardenError::InvalidConfig(format!("Failed to parse {}: {}", path.display(), e))
    })
}

/// Files named by an `[include]` section, in merge order
fn include_files(include: &Value, base_dir: &Path) -> Result<Vec<std::path::PathBuf>> {
    let files = include
        .get("files")
        .ok_or_else(|| WardenError::MissingConfigField(format!("{}.files", INCLUDE_SECTION)))?
        .as_str()
        .ok_or_else(|| {
            WardenError::InvalidConfig(format!(
                "{}.files must be a string of glob patterns",
                INCLUDE_SECTION
            ))
        })?;

    let mut matched = Vec::new();
    for pattern in files.split_whitespace() {
        let files = include::expand(base_dir, pattern)?;
        if files.is_empty() {
            warn!("Include pattern '{}' matched no files", pattern);
        }
        matched.extend(files);
    }

    Ok(matched)
}

/// Merge `overlay` into `base` key by key within each section
fn merge_tables(base: &mut Table, overlay: Table) {
    for (section, value) in overlay {
        match (base.get_mut(&section), value) {
            (Some(Value::Table(existing)), Value::Table(incoming)) => {
                for (key, value) in incoming {
                    existing.insert(key, value);
                }
            }
            (_, value) => {
                base.insert(section, value);
            }
        }
    }
}

fn seconds(field: &str, value: f64) -> Result<Duration> {
    if !value.is_finite() || value <= 0.0 {
        return Err(WardenError::ConfigValidationError(format!(
            "{} must be a positive number of seconds, got {}",
            field, value
        )));
    }
    Ok(Duration::from_secs_f64(value))
}
