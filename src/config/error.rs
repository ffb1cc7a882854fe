//! Configuration Error Types
//!
//! Startup-fatal errors raised while loading or validating the glu
//! configuration, or while interpreting the metrics exporter settings.

use thiserror::Error;

/// Configuration-related errors with detailed context
#[derive(Debug, Error)]
pub enum ConfigurationError {
    /// The configuration sources could not be read or deserialized
    #[error("Failed to load configuration: {0}")]
    Load(#[from] ::config::ConfigError),

    /// Log level is not one of trace, debug, info, warn, error
    #[error("Invalid log level '{0}'")]
    InvalidLogLevel(String),

    /// Missing required configuration field
    #[error("Missing required configuration field '{field}' in {context}")]
    MissingRequiredField { field: String, context: String },

    /// Invalid configuration value
    #[error("Invalid value '{value}' for field '{field}': {context}")]
    InvalidValue {
        field: String,
        value: String,
        context: String,
    },

    /// OTLP endpoint could not be parsed as a URL
    #[error("parsing otlp endpoint: {0}")]
    InvalidEndpoint(#[from] url::ParseError),

    /// OTLP endpoint uses a scheme other than http or https
    #[error("unsupported metrics exporter scheme: {0}")]
    UnsupportedScheme(String),
}

impl ConfigurationError {
    pub fn missing_required_field(field: impl Into<String>, context: impl Into<String>) -> Self {
        Self::MissingRequiredField {
            field: field.into(),
            context: context.into(),
        }
    }

    pub fn invalid_value(
        field: impl Into<String>,
        value: impl Into<String>,
        context: impl Into<String>,
    ) -> Self {
        Self::InvalidValue {
            field: field.into(),
            value: value.into(),
            context: context.into(),
        }
    }
}

pub type ConfigResult<T> = Result<T, ConfigurationError>;
