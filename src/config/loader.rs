//! Configuration Loader
//!
//! Layers the glu configuration from a `glu.{yaml,yml,toml,json}` file and
//! `GLU__`-prefixed environment variables using the `config` crate, then
//! validates the result before handing it to the run controller.

use super::error::ConfigResult;
use super::GluConfig;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Base name of the configuration file, resolved against supported extensions
pub const CONFIG_FILE_STEM: &str = "glu";

/// Environment variable overriding the directory searched for the config file
pub const CONFIG_DIR_ENV: &str = "GLU_CONFIG_DIR";

/// Prefix for environment overrides, e.g. `GLU__SERVER__PORT=9000`
pub const ENV_PREFIX: &str = "GLU";

#[derive(Debug, Clone)]
pub struct ConfigLoader {
    directory: PathBuf,
    use_environment: bool,
}

impl ConfigLoader {
    /// Load configuration from the working directory (or `GLU_CONFIG_DIR`)
    pub fn load() -> ConfigResult<GluConfig> {
        let directory = std::env::var(CONFIG_DIR_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("."));
        Self::new(directory).build()
    }

    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
            use_environment: true,
        }
    }

    /// Skip environment overrides; useful for deterministic tests
    pub fn without_environment(mut self) -> Self {
        self.use_environment = false;
        self
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn build(&self) -> ConfigResult<GluConfig> {
        let file = self.directory.join(CONFIG_FILE_STEM);
        debug!(
            directory = %self.directory.display(),
            use_environment = self.use_environment,
            "Loading glu configuration"
        );

        let mut builder = ::config::Config::builder()
            .add_source(::config::File::with_name(&file.to_string_lossy()).required(false));

        if self.use_environment {
            builder = builder.add_source(
                ::config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            );
        }

        let config: GluConfig = builder.build()?.try_deserialize()?;
        config.validate()?;

        info!(
            address = %config.server.address(),
            protocol = ?config.server.protocol,
            metrics_enabled = config.metrics.enabled,
            metrics_exporter = %config.metrics.exporter,
            "Configuration loaded successfully"
        );

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ConfigurationError, MetricsExporterKind, Protocol};
    use std::fs;

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = ConfigLoader::new(dir.path())
            .without_environment()
            .build()
            .unwrap();
        assert_eq!(config, GluConfig::default());
    }

    #[test]
    fn test_yaml_file_is_read() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("glu.yaml"),
            r#"
server:
  host: 127.0.0.1
  port: 9443
  protocol: https
  cert_file: /etc/glu/tls.crt
  key_file: /etc/glu/tls.key
log:
  level: debug
metrics:
  exporter: otlp
  otlp:
    endpoint: https://collector.example.com/v1/metrics
    headers:
      x-api-key: secret
"#,
        )
        .unwrap();

        let config = ConfigLoader::new(dir.path())
            .without_environment()
            .build()
            .unwrap();

        assert_eq!(config.server.address(), "127.0.0.1:9443");
        assert_eq!(config.server.protocol, Protocol::Https);
        assert_eq!(config.log.level, "debug");
        assert_eq!(config.metrics.exporter, MetricsExporterKind::Otlp);
        assert_eq!(
            config.metrics.otlp.headers.get("x-api-key").map(String::as_str),
            Some("secret")
        );
    }

    #[test]
    fn test_invalid_file_fails_validation() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("glu.yaml"), "log:\n  level: chatty\n").unwrap();

        let result = ConfigLoader::new(dir.path()).without_environment().build();
        assert!(matches!(result, Err(ConfigurationError::InvalidLogLevel(_))));
    }

    #[test]
    fn test_malformed_file_is_a_load_error() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("glu.yaml"), "server: [unterminated\n").unwrap();

        let result = ConfigLoader::new(dir.path()).without_environment().build();
        assert!(matches!(result, Err(ConfigurationError::Load(_))));
    }
}
