//! # Shutdown Stack
//!
//! Cleanup actions are pushed in the order resources are acquired during
//! startup and released last-in-first-out when the service stops. All actions
//! share one deadline; each runs to completion (or to the deadline) before the
//! next begins. Failures are logged and never abort the remaining actions.

use futures::future::BoxFuture;
use std::future::Future;
use std::time::Duration;
use tokio::time::{timeout_at, Instant};
use tracing::{debug, error, info};

use crate::error::GluResult;

/// Deadline shared by every shutdown action
pub const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(15);

type ShutdownFn = Box<dyn FnOnce(Instant) -> BoxFuture<'static, GluResult<()>> + Send>;

/// A single named unit of cleanup work.
pub struct ShutdownAction {
    name: String,
    action: ShutdownFn,
}

impl ShutdownAction {
    /// Wrap a closure that receives the shared deadline and returns the
    /// cleanup future
    pub fn new<F, Fut>(name: impl Into<String>, action: F) -> Self
    where
        F: FnOnce(Instant) -> Fut + Send + 'static,
        Fut: Future<Output = GluResult<()>> + Send + 'static,
    {
        Self {
            name: name.into(),
            action: Box::new(move |deadline| Box::pin(action(deadline))),
        }
    }

    /// An action with nothing to release
    pub fn noop(name: impl Into<String>) -> Self {
        Self::new(name, |_| async { Ok(()) })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    async fn run(self, deadline: Instant) -> GluResult<()> {
        (self.action)(deadline).await
    }
}

impl std::fmt::Debug for ShutdownAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShutdownAction")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Default)]
pub struct ShutdownStack {
    actions: Vec<ShutdownAction>,
}

impl ShutdownStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, action: ShutdownAction) {
        debug!(action = action.name(), "Registered shutdown action");
        self.actions.push(action);
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Run every action in reverse push order within [`SHUTDOWN_TIMEOUT`].
    ///
    /// Returns the number of actions that failed or ran past the deadline.
    pub async fn run_all(self) -> usize {
        self.run_all_within(SHUTDOWN_TIMEOUT).await
    }

    pub async fn run_all_within(self, timeout: Duration) -> usize {
        let deadline = Instant::now() + timeout;
        let total = self.actions.len();
        let mut failures = 0;

        info!(actions = total, timeout_secs = timeout.as_secs_f64(), "Shutting down");

        for action in self.actions.into_iter().rev() {
            let name = action.name.clone();
            match timeout_at(deadline, action.run(deadline)).await {
                Ok(Ok(())) => debug!(action = %name, "Shutdown action completed"),
                Ok(Err(e)) => {
                    failures += 1;
                    error!(action = %name, error = %e, "shutting down");
                }
                Err(_) => {
                    failures += 1;
                    error!(action = %name, "shutting down: deadline exceeded");
                }
            }
        }

        info!(actions = total, failures, "Shutdown actions finished");
        failures
    }
}
