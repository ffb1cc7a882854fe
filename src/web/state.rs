//! # Web API Application State
//!
//! Read-only view of the system shared by every request handler. Pipelines
//! are snapshotted when the server is built; the registry is not consulted
//! again afterwards.

use chrono::{DateTime, Utc};
use opentelemetry::metrics::{Counter, Meter};
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::core::Pipeline;

#[derive(Clone)]
pub struct AppState {
    pub system_name: Arc<str>,
    pub pipelines: Arc<BTreeMap<String, Arc<Pipeline>>>,
    /// Present only when the prometheus exporter is selected
    pub registry: Option<prometheus::Registry>,
    pub request_counter: Option<Counter<u64>>,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    pub fn new<'a, I>(system_name: &str, pipelines: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a Arc<Pipeline>)>,
    {
        let pipelines = pipelines
            .into_iter()
            .map(|(name, pipeline)| (name.to_string(), pipeline.clone()))
            .collect();

        Self {
            system_name: Arc::from(system_name),
            pipelines: Arc::new(pipelines),
            registry: None,
            request_counter: None,
            started_at: Utc::now(),
        }
    }

    pub fn with_registry(mut self, registry: Option<prometheus::Registry>) -> Self {
        self.registry = registry;
        self
    }

    /// Count handled requests on `meter`
    pub fn with_meter(mut self, meter: &Meter) -> Self {
        self.request_counter = Some(
            meter
                .u64_counter("glu.http.server.requests")
                .with_description("HTTP requests handled by the API server")
                .build(),
        );
        self
    }

    pub fn uptime_seconds(&self) -> i64 {
        (Utc::now() - self.started_at).num_seconds()
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("system_name", &self.system_name)
            .field("pipelines", &self.pipelines.keys().collect::<Vec<_>>())
            .field("metrics", &self.registry.is_some())
            .field("started_at", &self.started_at)
            .finish()
    }
}
