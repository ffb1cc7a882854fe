//! # Trigger Runner
//!
//! Fans out one task per triggerable edge across every registered pipeline.
//! The set of edges is captured when the runner is built; pipelines added to
//! the registry afterwards are not picked up.
//!
//! All trigger tasks share a child of the service cancellation token. The
//! first task to fail cancels that child so its siblings wind down, and its
//! error becomes the runner's result.

use std::sync::Arc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::core::{Pipeline, TriggerableEdge};
use crate::error::{GluError, GluResult};

struct TriggerTarget {
    pipeline: String,
    edge: Arc<dyn TriggerableEdge>,
}

pub struct TriggerRunner {
    targets: Vec<TriggerTarget>,
}

impl TriggerRunner {
    /// Snapshot the triggerable edges of the given pipelines
    pub fn from_pipelines<'a, I>(pipelines: I) -> Self
    where
        I: IntoIterator<Item = &'a Arc<Pipeline>>,
    {
        let mut targets = Vec::new();

        for pipeline in pipelines {
            for edge in pipeline.edges() {
                match edge.as_triggerable() {
                    Some(triggerable) => targets.push(TriggerTarget {
                        pipeline: pipeline.name().to_string(),
                        edge: triggerable.clone(),
                    }),
                    None => debug!(
                        pipeline = %pipeline.name(),
                        kind = %edge.kind(),
                        "skipping non-triggerable edge"
                    ),
                }
            }
        }

        Self { targets }
    }

    /// Number of trigger tasks [`run`](Self::run) will start
    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    /// Run every trigger until `shutdown` is cancelled or one of them fails.
    pub async fn run(self, shutdown: CancellationToken) -> GluResult<()> {
        let group_token = shutdown.child_token();
        let mut tasks: JoinSet<(String, GluResult<()>)> = JoinSet::new();

        for target in self.targets {
            let token = group_token.clone();
            let label = format!("{}/{}", target.pipeline, target.edge.kind());
            tasks.spawn(async move {
                debug!(
                    edge = %label,
                    from = %target.edge.from(),
                    to = %target.edge.to(),
                    "Starting triggers"
                );
                let result = target.edge.run_triggers(token).await;
                (label, result)
            });
        }

        info!(triggers = tasks.len(), "Trigger runner started");

        let mut first_error: Option<GluError> = None;

        while let Some(joined) = tasks.join_next().await {
            let failure = match joined {
                Ok((label, Ok(()))) => {
                    debug!(edge = %label, "Triggers stopped");
                    None
                }
                Ok((label, Err(e))) if e.is_cancelled() => {
                    debug!(edge = %label, "Triggers cancelled");
                    None
                }
                Ok((label, Err(e))) => {
                    error!(edge = %label, error = %e, "Trigger failed");
                    Some(e)
                }
                Err(join_error) => {
                    error!(error = %join_error, "Trigger task panicked");
                    Some(GluError::TaskPanicked(format!("trigger: {join_error}")))
                }
            };

            if let Some(e) = failure {
                if first_error.is_none() {
                    group_token.cancel();
                    first_error = Some(e);
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}
