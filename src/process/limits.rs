use crate::error::{WardenError, Result};
use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;
use sysinfo::{MemoryRefreshKind, RefreshKind, System};
use tracing::debug;

const KB: i128 = 1024;
const MB: i128 = KB * 1024;
const GB: i128 = MB * 1024;

static UNIT_SPEC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(\d+)(gb|mb|kb)$").expect("valid unit regex"));
static PERCENT_SPEC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+)%$").expect("valid percent regex"));

/// Turns limit specifications such as `"100mb"`, `"80%"` or `"4096"` into
/// absolute byte counts
#[derive(Debug, Clone, Copy)]
pub struct LimitResolver {
    /// Total physical memory in bytes, the base for percentage limits
    total_memory: u64,
}

impl LimitResolver {
    /// Create a resolver using the total memory of this machine
    pub fn new() -> Self {
        let system = System::new_with_specifics(
            RefreshKind::new().with_memory(MemoryRefreshKind::new().with_ram()),
        );
        Self::with_total_memory(system.total_memory())
    }

    /// Create a resolver against a fixed amount of total memory
    pub fn with_total_memory(total_memory: u64) -> Self {
        Self { total_memory }
    }

    pub fn total_memory(&self) -> u64 {
        self.total_memory
    }

    /// Resolve a limit specification into bytes
    ///
    /// Accepted forms, tried in order:
    /// * `<n>gb`, `<n>mb`, `<n>kb` (case-insensitive, powers of 1024)
    /// * `<n>%` of total memory, truncated to whole bytes
    /// * a plain integer byte count
    ///
    /// # Returns
    /// * `Ok(bytes)` - The limit, always greater than zero
    /// * `Err(WardenError::ConfigError)` - Unparseable or non-positive limit
    pub fn resolve(&self, spec: &str) -> Result<u64> {
        let spec = spec.trim();

        let bytes: i128 = if let Some(caps) = UNIT_SPEC.captures(spec) {
            let count = parse_digits(spec, &caps[1])?;
            let unit = match caps[2].to_ascii_lowercase().as_str() {
                "gb" => GB,
                "mb" => MB,
                _ => KB,
            };
            count.checked_mul(unit).ok_or_else(|| too_large(spec))?
        } else if let Some(caps) = PERCENT_SPEC.captures(spec) {
            let percent = parse_digits(spec, &caps[1])?;
            i128::from(self.total_memory)
                .checked_mul(percent)
                .ok_or_else(|| too_large(spec))?
                / 100
        } else {
            spec.parse::<i128>().map_err(|e| {
                WardenError::ConfigError(format!("Invalid memory limit '{}': {}", spec, e))
            })?
        };

        if bytes <= 0 {
            return Err(WardenError::ConfigError(format!(
                "Memory limit '{}' must be above zero",
                spec
            )));
        }

        let bytes = u64::try_from(bytes).map_err(|_| too_large(spec))?;
        debug!("Resolved limit '{}' to {} bytes", spec, bytes);
        Ok(bytes)
    }
}

impl Default for LimitResolver {
    fn default() -> Self {
        Self::new()
    }
}

fn too_large(spec: &str) -> WardenError {
    WardenError::ConfigError(format!("Memory limit '{}' is too large", spec))
}

fn parse_digits(spec: &str, digits: &str) -> Result<i128> {
    digits.parse::<i128>().map_err(|e| {
        WardenError::ConfigError(format!("Invalid memory limit '{}': {}", spec, e))
    })
}

/// Per-program limits plus the limit applied to every other program
///
/// Built once before monitoring starts and never modified afterwards.
#[derive(Debug, Clone)]
pub struct MonitoredPrograms {
    limits: HashMap<String, u64>,
    default_limit: u64,
}

impl MonitoredPrograms {
    /// Resolve every program spec and the default spec with `resolve`
    ///
    /// Fails on the first spec that does not resolve to a positive limit.
    pub fn build<'a, I, F>(programs: I, default_spec: &str, resolve: F) -> Result<Self>
    where
        I: IntoIterator<Item = (&'a String, &'a String)>,
        F: Fn(&str) -> Result<u64>,
    {
        let default_limit = resolve(default_spec).map_err(|e| {
            WardenError::ConfigError(format!("default_limit: {}", e))
        })?;

        let mut limits = HashMap::new();
        for (name, spec) in programs {
            let limit = resolve(spec)
                .map_err(|e| WardenError::ConfigError(format!("program:{}: {}", name, e)))?;
            limits.insert(name.clone(), limit);
        }

        Ok(Self {
            limits,
            default_limit,
        })
    }

    /// The limit for `name`, falling back to the default limit
    pub fn limit(&self, name: &str) -> u64 {
        self.limits.get(name).copied().unwrap_or(self.default_limit)
    }

    pub fn default_limit(&self) -> u64 {
        self.default_limit
    }

    pub fn len(&self) -> usize {
        self.limits.len()
    }

}
