//! # Orchestration
//!
//! Process lifecycle for a glu system: the run controller decides between a
//! one-shot command and a long-lived service, and in service mode drives the
//! API server, telemetry and pipeline triggers under one cancellation token.
//!
//! ## Components
//!
//! - [`controller`] - `System::run` and the run state machine
//! - [`shutdown`] - LIFO cleanup stack with a shared deadline
//! - [`triggers`] - fan-out of every triggerable pipeline edge
//! - [`signal`] - SIGINT/SIGTERM handling

pub mod controller;
pub mod shutdown;
pub mod signal;
pub mod triggers;

use parking_lot::Mutex;
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

pub use shutdown::{ShutdownAction, ShutdownStack, SHUTDOWN_TIMEOUT};
pub use signal::{shutdown_signal, signal_token};
pub use triggers::TriggerRunner;

/// Lifecycle position of a [`System`](crate::System).
///
/// `Idle -> Configuring -> OneShot` for commands, or
/// `Idle -> Configuring -> ServiceStarting -> ServiceRunning -> ShuttingDown -> Stopped`
/// for the service. Startup failures jump straight to `Stopped`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    Idle,
    Configuring,
    OneShot,
    ServiceStarting,
    ServiceRunning,
    ShuttingDown,
    Stopped,
}

impl RunState {
    pub fn is_terminal(self) -> bool {
        matches!(self, RunState::OneShot | RunState::Stopped)
    }
}

impl std::fmt::Display for RunState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            RunState::Idle => "idle",
            RunState::Configuring => "configuring",
            RunState::OneShot => "one_shot",
            RunState::ServiceStarting => "service_starting",
            RunState::ServiceRunning => "service_running",
            RunState::ShuttingDown => "shutting_down",
            RunState::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

/// Shared, observable run state of one system
#[derive(Debug, Clone)]
pub(crate) struct RunStateCell(Arc<Mutex<RunState>>);

impl RunStateCell {
    pub(crate) fn new(state: RunState) -> Self {
        Self(Arc::new(Mutex::new(state)))
    }

    pub(crate) fn get(&self) -> RunState {
        *self.0.lock()
    }

    pub(crate) fn set(&self, state: RunState) {
        let previous = std::mem::replace(&mut *self.0.lock(), state);
        if previous != state {
            debug!(from = %previous, to = %state, "Run state changed");
        }
    }
}
