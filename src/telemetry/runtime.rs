//! Runtime self-metrics: tokio worker count, alive tasks and process uptime.
//!
//! Only started for the OTLP exporter. Observations are taken by the meter
//! provider's reader at collection time; the gauges stop reporting once the
//! [`RuntimeMetrics`] value is dropped.

use opentelemetry::metrics::{Meter, ObservableGauge};
use std::time::Instant;
use tokio::runtime::Handle;
use tracing::debug;

pub struct RuntimeMetrics {
    _workers: ObservableGauge<u64>,
    _alive_tasks: ObservableGauge<u64>,
    _uptime: ObservableGauge<f64>,
}

impl RuntimeMetrics {
    /// Register the runtime gauges against `meter`, observing the runtime
    /// behind `handle`
    pub fn start(meter: &Meter, handle: Handle) -> Self {
        let started_at = Instant::now();

        let workers_handle = handle.clone();
        let workers = meter
            .u64_observable_gauge("glu.runtime.workers")
            .with_description("Number of tokio worker threads")
            .with_callback(move |observer| {
                observer.observe(workers_handle.metrics().num_workers() as u64, &[]);
            })
            .build();

        let alive_tasks = meter
            .u64_observable_gauge("glu.runtime.alive_tasks")
            .with_description("Number of tasks currently alive on the runtime")
            .with_callback(move |observer| {
                observer.observe(handle.metrics().num_alive_tasks() as u64, &[]);
            })
            .build();

        let uptime = meter
            .f64_observable_gauge("glu.process.uptime")
            .with_description("Seconds since runtime metrics were started")
            .with_unit("s")
            .with_callback(move |observer| {
                observer.observe(started_at.elapsed().as_secs_f64(), &[]);
            })
            .build();

        debug!("Runtime metrics registered");

        Self {
            _workers: workers,
            _alive_tasks: alive_tasks,
            _uptime: uptime,
        }
    }
}

impl std::fmt::Debug for RuntimeMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuntimeMetrics").finish_non_exhaustive()
    }
}
