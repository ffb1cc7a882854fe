//! # Telemetry
//!
//! Owns the OpenTelemetry meter provider for one service run. There is no
//! process-global provider: [`Telemetry::start`] builds the provider from the
//! reader chosen by [`exporter::select_exporter`], and the resulting handle is
//! passed explicitly to the API server and the runtime metrics.
//!
//! Teardown is expressed as two shutdown actions, mirroring how the pieces
//! were acquired: the exporter close and the provider shutdown. Both tolerate
//! a provider that has already been shut down.

pub mod exporter;
pub mod runtime;

use opentelemetry::metrics::{Meter, MeterProvider};
use opentelemetry::KeyValue;
use opentelemetry_sdk::error::OTelSdkError;
use opentelemetry_sdk::metrics::{PeriodicReader, SdkMeterProvider};
use opentelemetry_sdk::Resource;
use tokio::time::{timeout_at, Instant};
use tracing::{debug, info};

use crate::config::MetricsExporterKind;
use crate::error::{GluError, GluResult};
use crate::orchestration::ShutdownAction;

pub use exporter::{select_exporter, MetricsReader, OtlpTarget, Transport};
pub use runtime::RuntimeMetrics;

/// Value of the `service.name` resource attribute
pub const SERVICE_NAME: &str = "glu";

/// Instrumentation scope for meters created by this crate
const METER_NAME: &str = "glu";

#[derive(Debug)]
pub struct Telemetry {
    provider: SdkMeterProvider,
    kind: MetricsExporterKind,
    registry: Option<prometheus::Registry>,
    runtime: Option<RuntimeMetrics>,
}

impl Telemetry {
    /// Build the meter provider for `system_name` around `reader`
    pub fn start(system_name: &str, reader: MetricsReader) -> Self {
        let instance_id = uuid::Uuid::new_v4();
        let resource = Resource::builder()
            .with_service_name(SERVICE_NAME)
            .with_attributes([
                KeyValue::new("glu.system.name", system_name.to_string()),
                KeyValue::new("service.instance.id", instance_id.to_string()),
            ])
            .build();

        let kind = reader.kind();
        let builder = SdkMeterProvider::builder().with_resource(resource);
        let (provider, registry) = match reader {
            MetricsReader::Prometheus { exporter, registry } => {
                (builder.with_reader(exporter).build(), Some(registry))
            }
            MetricsReader::Otlp { exporter, .. } => {
                let reader = PeriodicReader::builder(exporter).build();
                (builder.with_reader(reader).build(), None)
            }
        };

        info!(
            system = %system_name,
            instance_id = %instance_id,
            exporter = %kind,
            "Meter provider started"
        );

        Self {
            provider,
            kind,
            registry,
            runtime: None,
        }
    }

    pub fn kind(&self) -> MetricsExporterKind {
        self.kind
    }

    pub fn meter(&self) -> Meter {
        self.provider.meter(METER_NAME)
    }

    pub fn registry(&self) -> Option<prometheus::Registry> {
        self.registry.clone()
    }

    /// Start runtime self-metrics on the current tokio runtime.
    ///
    /// Only the OTLP path reports them; calling this for prometheus is a no-op.
    pub fn start_runtime_metrics(&mut self) {
        if self.kind != MetricsExporterKind::Otlp || self.runtime.is_some() {
            return;
        }
        let meter = self.meter();
        self.runtime = Some(RuntimeMetrics::start(
            &meter,
            tokio::runtime::Handle::current(),
        ));
    }

    pub fn runtime_metrics_started(&self) -> bool {
        self.runtime.is_some()
    }

    /// Shutdown action closing the exporter.
    ///
    /// Prometheus has nothing to close. For OTLP the exporter is owned by the
    /// provider's periodic reader, so closing it means shutting the provider
    /// down; if that already happened the action succeeds.
    pub fn exporter_shutdown_action(&self) -> ShutdownAction {
        match self.kind {
            MetricsExporterKind::Prometheus => ShutdownAction::noop("metrics-exporter"),
            MetricsExporterKind::Otlp => {
                let provider = self.provider.clone();
                ShutdownAction::new("metrics-exporter", move |deadline| {
                    shutdown_provider(provider, deadline)
                })
            }
        }
    }

    /// Shutdown action flushing and stopping the meter provider
    pub fn shutdown_action(self) -> ShutdownAction {
        ShutdownAction::new("meter-provider", move |deadline| self.shutdown(deadline))
    }

    pub async fn shutdown(mut self, deadline: Instant) -> GluResult<()> {
        // Drop the gauges first so their callbacks are not invoked during the
        // final collection.
        self.runtime.take();
        shutdown_provider(self.provider, deadline).await
    }
}

/// Shut `provider` down on a blocking thread, bounded by `deadline`.
async fn shutdown_provider(provider: SdkMeterProvider, deadline: Instant) -> GluResult<()> {
    let task = tokio::task::spawn_blocking(move || provider.shutdown());

    match timeout_at(deadline, task).await {
        Ok(Ok(Ok(()))) => {
            debug!("Meter provider shut down");
            Ok(())
        }
        Ok(Ok(Err(OTelSdkError::AlreadyShutdown))) => {
            debug!("Meter provider already shut down");
            Ok(())
        }
        Ok(Ok(Err(e))) => Err(GluError::Telemetry(format!("shutting down meter provider: {e}"))),
        Ok(Err(join_error)) => Err(GluError::TaskPanicked(format!(
            "meter provider shutdown: {join_error}"
        ))),
        Err(_) => Err(GluError::Telemetry(
            "meter provider shutdown exceeded deadline".to_string(),
        )),
    }
}
