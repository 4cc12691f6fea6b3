use thiserror::Error;

/// Main error type for the rsswarden watchdog
#[derive(Debug, Error)]
pub enum WardenError {
    // Configuration errors
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Invalid configuration file: {0}")]
    InvalidConfig(String),

    #[error("Missing required configuration field: {0}")]
    MissingConfigField(String),

    #[error("Configuration validation failed: {0}")]
    ConfigValidationError(String),

    // Measurement errors
    #[error("Process not found: {0}")]
    ProcessNotFound(u32),

    // Collaborator errors
    #[error("Supervisor error: {0}")]
    SupervisorError(String),

    #[error("Metrics sink error: {0}")]
    SinkError(String),

    #[error("Timeout error: {0}")]
    TimeoutError(String),

    // IO errors (automatically converted from std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl WardenError {
    /// Whether this error means the measured process no longer exists
    pub fn is_process_gone(&self) -> bool {
        matches!(self, WardenError::ProcessNotFound(_))
    }

    /// Whether this error comes from loading or resolving configuration
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            WardenError::ConfigError(_)
                | WardenError::InvalidConfig(_)
                | WardenError::MissingConfigField(_)
                | WardenError::ConfigValidationError(_)
        )
    }
}

/// Result type alias for rsswarden operations
pub type Result<T> = std::result::Result<T, WardenError>;
