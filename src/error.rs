//! Error types for the glu orchestration core.

use crate::config::ConfigurationError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GluError {
    #[error("pipeline {0:?}: not found")]
    NotFound(String),
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
    #[error("Telemetry error: {0}")]
    Telemetry(String),
    #[error("Server error: {0}")]
    Server(String),
    #[error("Trigger error on {edge} edge: {message}")]
    Trigger { edge: String, message: String },
    #[error("Command error: {0}")]
    Command(String),
    /// Returned by work that stopped because its cancellation token fired.
    /// Orchestration treats it as a clean exit rather than a failure.
    #[error("operation cancelled")]
    Cancelled,
    #[error("Task {0} panicked")]
    TaskPanicked(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl GluError {
    pub fn trigger(edge: impl Into<String>, message: impl std::fmt::Display) -> Self {
        GluError::Trigger {
            edge: edge.into(),
            message: message.to_string(),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, GluError::Cancelled)
    }
}

pub type GluResult<T> = std::result::Result<T, GluError>;
