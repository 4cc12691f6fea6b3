use serde::{Deserialize, Serialize};
use std::fmt;

/// Health state attached to a usage event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventState {
    Ok,
    Critical,
}

impl fmt::Display for EventState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventState::Ok => write!(f, "ok"),
            EventState::Critical => write!(f, "critical"),
        }
    }
}

/// A single usage report for one process, built per tick
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageEvent {
    pub service: String,
    pub state: EventState,
    /// Usage as a percentage of the limit
    pub metric: f64,
    pub description: String,
}

impl UsageEvent {
    pub fn new(
        service: impl Into<String>,
        state: EventState,
        metric: f64,
        description: impl Into<String>,
    ) -> Self {
        Self {
            service: service.into(),
            state,
            metric,
            description: description.into(),
        }
    }
}
