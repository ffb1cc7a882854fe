//! # Metrics Exporter Selection
//!
//! Turns the `metrics` configuration block into a metric reader:
//!
//! - `prometheus` (alias `local-pull`) registers an OpenTelemetry reader into a
//!   crate-owned `prometheus::Registry` which the API server renders on
//!   `GET /metrics`.
//! - `otlp` (alias `remote-push`) builds an HTTP OTLP exporter that pushes to
//!   the configured endpoint with the configured static headers. The endpoint
//!   scheme picks the transport: `https` is secure, `http` is plaintext.
//!   [`Transport`] only records that choice for logging and callers; the HTTP
//!   client negotiates TLS from the scheme itself, so no separate client
//!   setting is applied.
//!
//! Any construction error is returned before the service starts its
//! concurrent tasks.

use opentelemetry_otlp::{WithExportConfig, WithHttpConfig};
use tracing::{debug, info};
use url::Url;

use crate::config::{ConfigResult, ConfigurationError, MetricsConfig, MetricsExporterKind};
use crate::error::{GluError, GluResult};

/// Transport security derived from the OTLP endpoint scheme
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transport {
    Secure,
    Insecure,
}

/// A parsed OTLP push target
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OtlpTarget {
    pub endpoint: Url,
    pub transport: Transport,
}

impl OtlpTarget {
    /// Parse an endpoint such as `https://collector:4318/v1/metrics`
    pub fn parse(endpoint: &str) -> ConfigResult<Self> {
        let endpoint = Url::parse(endpoint)?;
        let transport = match endpoint.scheme() {
            "https" => Transport::Secure,
            "http" => Transport::Insecure,
            other => return Err(ConfigurationError::UnsupportedScheme(other.to_string())),
        };

        Ok(Self {
            endpoint,
            transport,
        })
    }

    pub fn is_secure(&self) -> bool {
        self.transport == Transport::Secure
    }
}

/// The reader half of the metrics pipeline, ready to attach to a meter provider
pub enum MetricsReader {
    Prometheus {
        exporter: opentelemetry_prometheus::PrometheusExporter,
        registry: prometheus::Registry,
    },
    Otlp {
        exporter: opentelemetry_otlp::MetricExporter,
        target: OtlpTarget,
    },
}

impl MetricsReader {
    pub fn kind(&self) -> MetricsExporterKind {
        match self {
            MetricsReader::Prometheus { .. } => MetricsExporterKind::Prometheus,
            MetricsReader::Otlp { .. } => MetricsExporterKind::Otlp,
        }
    }

    /// Registry scraped by `GET /metrics`; only present for prometheus
    pub fn registry(&self) -> Option<&prometheus::Registry> {
        match self {
            MetricsReader::Prometheus { registry, .. } => Some(registry),
            MetricsReader::Otlp { .. } => None,
        }
    }
}

impl std::fmt::Debug for MetricsReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MetricsReader::Prometheus { .. } => f.write_str("MetricsReader::Prometheus"),
            MetricsReader::Otlp { target, .. } => f
                .debug_struct("MetricsReader::Otlp")
                .field("endpoint", &target.endpoint.as_str())
                .field("transport", &target.transport)
                .finish(),
        }
    }
}

/// Build the metric reader selected by `config.exporter`.
///
/// Callers only invoke this when metrics are enabled.
pub fn select_exporter(config: &MetricsConfig) -> GluResult<MetricsReader> {
    match config.exporter {
        MetricsExporterKind::Prometheus => {
            let registry = prometheus::Registry::new();
            let exporter = opentelemetry_prometheus::exporter()
                .with_registry(registry.clone())
                .build()
                .map_err(|e| GluError::Telemetry(format!("creating prometheus exporter: {e}")))?;

            info!(exporter = "prometheus", "Metrics exporter configured");
            Ok(MetricsReader::Prometheus { exporter, registry })
        }
        MetricsExporterKind::Otlp => {
            let target = OtlpTarget::parse(&config.otlp.endpoint)?;
            debug!(
                endpoint = %target.endpoint,
                secure = target.is_secure(),
                headers = config.otlp.headers.len(),
                "Building OTLP metrics exporter"
            );

            let exporter = opentelemetry_otlp::MetricExporter::builder()
                .with_http()
                .with_endpoint(target.endpoint.as_str())
                .with_headers(config.otlp.headers.clone())
                .build()
                .map_err(|e| GluError::Telemetry(format!("creating otlp metrics exporter: {e}")))?;

            info!(
                exporter = "otlp",
                endpoint = %target.endpoint,
                secure = target.is_secure(),
                "Metrics exporter configured"
            );
            Ok(MetricsReader::Otlp { exporter, target })
        }
    }
}
