//! Error types for the scheduler and its pipeline

use thiserror::Error;

/// Result type alias using our SchedulerError
pub type Result<T> = std::result::Result<T, SchedulerError>;

/// Main error type for scheduler operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SchedulerError {
    /// Bars or tick could not be fetched, or history was too short
    #[error("Data unavailable: {0}")]
    DataUnavailable(String),

    /// A task or collaborator call ran past its deadline
    #[error("Timeout exceeded: {0}")]
    TimeoutExceeded(String),

    /// A TP/SL input could not be resolved into a valid price level
    #[error("Invalid risk parameter: {0}")]
    InvalidRiskParameter(String),

    /// The data/connection collaborator reported the link is down
    #[error("Connection lost: {0}")]
    ConnectionLost(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The order sink refused an intent
    #[error("Order rejected: {0}")]
    OrderRejected(String),

    /// Generic internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl SchedulerError {
    /// Whether this error should move the scheduler into `Paused`
    pub fn is_connection_lost(&self) -> bool {
        matches!(self, SchedulerError::ConnectionLost(_))
    }

    /// Shorthand used throughout the resolver
    pub fn invalid_risk(msg: impl Into<String>) -> Self {
        SchedulerError::InvalidRiskParameter(msg.into())
    }
}

impl From<config::ConfigError> for SchedulerError {
    fn from(err: config::ConfigError) -> Self {
        SchedulerError::Configuration(err.to_string())
    }
}

impl From<tokio::task::JoinError> for SchedulerError {
    fn from(err: tokio::task::JoinError) -> Self {
        SchedulerError::Internal(err.to_string())
    }
}
