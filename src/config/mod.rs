//! # Glu Configuration
//!
//! Typed configuration consumed by the run controller: server address and
//! protocol, logging, and the metrics exporter block.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use glu::config::ConfigLoader;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ConfigLoader::load()?;
//! println!("serving on {}", config.server.address());
//! # Ok(())
//! # }
//! ```
//!
//! Every field has a default, so an empty (or missing) `glu.yaml` yields a
//! server on `0.0.0.0:8080` with prometheus metrics enabled.

pub mod error;
pub mod loader;

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::str::FromStr;

pub use error::{ConfigResult, ConfigurationError};
pub use loader::ConfigLoader;

/// Root configuration structure mirroring glu.yaml
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct GluConfig {
    pub server: ServerConfig,
    pub log: LogConfig,
    pub metrics: MetricsConfig,
}

impl GluConfig {
    /// Validate cross-field constraints that serde cannot express
    pub fn validate(&self) -> ConfigResult<()> {
        self.server.validate()?;
        self.log.validate()?;
        self.metrics.validate()?;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    #[default]
    Http,
    Https,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub protocol: Protocol,
    pub cert_file: Option<PathBuf>,
    pub key_file: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            protocol: Protocol::Http,
            cert_file: None,
            key_file: None,
        }
    }
}

impl ServerConfig {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    fn validate(&self) -> ConfigResult<()> {
        if self.host.trim().is_empty() {
            return Err(ConfigurationError::missing_required_field("host", "server"));
        }

        if self.protocol == Protocol::Https {
            if self.cert_file.is_none() {
                return Err(ConfigurationError::missing_required_field(
                    "cert_file",
                    "server (protocol https)",
                ));
            }
            if self.key_file.is_none() {
                return Err(ConfigurationError::missing_required_field(
                    "key_file",
                    "server (protocol https)",
                ));
            }
        }

        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct LogConfig {
    pub level: String,
    pub format: LogFormat,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Text,
        }
    }
}

impl LogConfig {
    /// Parsed log level
    pub fn level(&self) -> ConfigResult<tracing::Level> {
        tracing::Level::from_str(self.level.trim())
            .map_err(|_| ConfigurationError::InvalidLogLevel(self.level.clone()))
    }

    fn validate(&self) -> ConfigResult<()> {
        self.level().map(|_| ())
    }
}

/// Metrics exporter kind: pull-based prometheus scrape or push-based OTLP
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MetricsExporterKind {
    #[default]
    #[serde(alias = "local-pull")]
    Prometheus,
    #[serde(alias = "remote-push")]
    Otlp,
}

impl std::fmt::Display for MetricsExporterKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MetricsExporterKind::Prometheus => write!(f, "prometheus"),
            MetricsExporterKind::Otlp => write!(f, "otlp"),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct OtlpConfig {
    pub endpoint: String,
    pub headers: HashMap<String, String>,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct MetricsConfig {
    pub enabled: bool,
    pub exporter: MetricsExporterKind,
    pub otlp: OtlpConfig,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            exporter: MetricsExporterKind::Prometheus,
            otlp: OtlpConfig::default(),
        }
    }
}

impl MetricsConfig {
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    pub fn otlp(endpoint: impl Into<String>) -> Self {
        Self {
            enabled: true,
            exporter: MetricsExporterKind::Otlp,
            otlp: OtlpConfig {
                endpoint: endpoint.into(),
                headers: HashMap::new(),
            },
        }
    }

    fn validate(&self) -> ConfigResult<()> {
        if self.enabled
            && self.exporter == MetricsExporterKind::Otlp
            && self.otlp.endpoint.trim().is_empty()
        {
            return Err(ConfigurationError::missing_required_field(
                "endpoint",
                "metrics.otlp",
            ));
        }

        if let Some(name) = self.otlp.headers.keys().find(|name| name.trim().is_empty()) {
            return Err(ConfigurationError::invalid_value(
                "metrics.otlp.headers",
                name.clone(),
                "header names must not be empty",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = GluConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.server.address(), "0.0.0.0:8080");
        assert!(config.metrics.enabled);
        assert_eq!(config.metrics.exporter, MetricsExporterKind::Prometheus);
    }

    #[test]
    fn test_https_requires_certificate_and_key() {
        let mut config = GluConfig::default();
        config.server.protocol = Protocol::Https;
        config.server.cert_file = Some(PathBuf::from("cert.pem"));

        match config.validate() {
            Err(ConfigurationError::MissingRequiredField { field, .. }) => {
                assert_eq!(field, "key_file")
            }
            other => panic!("expected missing key_file, got {other:?}"),
        }
    }

    #[test]
    fn test_bad_log_level_is_rejected() {
        let mut config = GluConfig::default();
        config.log.level = "loud".to_string();
        assert!(matches!(
            config.validate(),
            Err(ConfigurationError::InvalidLogLevel(level)) if level == "loud"
        ));
    }

    #[test]
    fn test_log_level_parsing_is_case_insensitive() {
        let log = LogConfig {
            level: "DEBUG".to_string(),
            format: LogFormat::Text,
        };
        assert_eq!(log.level().unwrap(), tracing::Level::DEBUG);
    }

    #[test]
    fn test_otlp_requires_endpoint() {
        let mut config = GluConfig::default();
        config.metrics = MetricsConfig::otlp("");
        assert!(config.validate().is_err());

        config.metrics = MetricsConfig::otlp("https://collector.example.com/v1/metrics");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_otlp_header_names_must_not_be_empty() {
        let mut config = GluConfig::default();
        config.metrics = MetricsConfig::otlp("http://localhost:4318");
        config
            .metrics
            .otlp
            .headers
            .insert(" ".to_string(), "value".to_string());

        assert!(matches!(
            config.validate(),
            Err(ConfigurationError::InvalidValue { ref field, .. }) if field == "metrics.otlp.headers"
        ));
    }

    #[test]
    fn test_disabled_metrics_skip_endpoint_check() {
        let mut config = GluConfig::default();
        config.metrics = MetricsConfig::otlp("");
        config.metrics.enabled = false;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_exporter_aliases_deserialize() {
        let pull: MetricsExporterKind = serde_json::from_str("\"local-pull\"").unwrap();
        let push: MetricsExporterKind = serde_json::from_str("\"remote-push\"").unwrap();
        assert_eq!(pull, MetricsExporterKind::Prometheus);
        assert_eq!(push, MetricsExporterKind::Otlp);
    }
}
