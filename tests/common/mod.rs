//! Shared fixtures for integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use glu::config::{GluConfig, MetricsConfig, ServerConfig};
use glu::{CommandDispatcher, Edge, GluError, GluResult, System, TriggerableEdge};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Loopback server on an ephemeral port with metrics disabled
pub fn test_config() -> GluConfig {
    GluConfig {
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            ..ServerConfig::default()
        },
        metrics: MetricsConfig::disabled(),
        ..GluConfig::default()
    }
}

/// A non-triggerable edge
pub struct StaticEdge {
    pub kind: &'static str,
}

impl Edge for StaticEdge {
    fn kind(&self) -> &str {
        self.kind
    }
    fn from(&self) -> &str {
        "staging"
    }
    fn to(&self) -> &str {
        "production"
    }
}

/// Fails with a trigger error after `after`
pub struct FailingTrigger {
    pub after: Duration,
    pub message: &'static str,
}

impl Edge for FailingTrigger {
    fn kind(&self) -> &str {
        "failing"
    }
    fn from(&self) -> &str {
        "oci"
    }
    fn to(&self) -> &str {
        "staging"
    }
}

#[async_trait]
impl TriggerableEdge for FailingTrigger {
    async fn run_triggers(&self, _shutdown: CancellationToken) -> GluResult<()> {
        tokio::time::sleep(self.after).await;
        Err(GluError::trigger("failing", self.message))
    }
}

/// Blocks until cancelled and counts how many times it observed cancellation
#[derive(Default)]
pub struct WaitingTrigger {
    pub stopped: Arc<AtomicUsize>,
}

impl WaitingTrigger {
    pub fn stopped(&self) -> usize {
        self.stopped.load(Ordering::SeqCst)
    }
}

impl Edge for WaitingTrigger {
    fn kind(&self) -> &str {
        "waiting"
    }
    fn from(&self) -> &str {
        "oci"
    }
    fn to(&self) -> &str {
        "staging"
    }
}

#[async_trait]
impl TriggerableEdge for WaitingTrigger {
    async fn run_triggers(&self, shutdown: CancellationToken) -> GluResult<()> {
        shutdown.cancelled().await;
        self.stopped.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Records every invocation and returns a fixed outcome
#[derive(Clone, Default)]
pub struct RecordingDispatcher {
    pub calls: Arc<Mutex<Vec<Vec<String>>>>,
    pub fail_with: Option<&'static str>,
}

impl RecordingDispatcher {
    pub fn failing(message: &'static str) -> Self {
        Self {
            fail_with: Some(message),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<Vec<String>> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl CommandDispatcher for RecordingDispatcher {
    async fn dispatch(
        &self,
        _system: &System,
        args: &[String],
        _shutdown: CancellationToken,
    ) -> GluResult<()> {
        self.calls.lock().push(args.to_vec());
        match self.fail_with {
            Some(message) => Err(GluError::Command(message.to_string())),
            None => Ok(()),
        }
    }
}

pub fn args(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}
