//! Pipelines and the edges between their phases.
//!
//! Edges come in two shapes. Every edge is an [`Edge`]; an edge that can
//! promote on its own schedule is additionally a [`TriggerableEdge`]. The
//! distinction is carried by [`PipelineEdge`] so plain edges never have to
//! provide a trigger loop.

use async_trait::async_trait;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use super::metadata::Metadata;
use crate::error::GluResult;

/// A connection between two phases of a pipeline.
pub trait Edge: Send + Sync {
    /// Short identifier for the kind of edge (e.g. "promotion", "schedule")
    fn kind(&self) -> &str;

    /// Name of the phase this edge reads from
    fn from(&self) -> &str;

    /// Name of the phase this edge writes to
    fn to(&self) -> &str;
}

/// An edge that manages its own trigger schedule (polling, webhooks, timers).
#[async_trait]
pub trait TriggerableEdge: Edge {
    /// Run the edge's triggers until `shutdown` is cancelled.
    ///
    /// Implementations must return promptly once the token fires. Returning
    /// `Ok(())` or [`GluError::Cancelled`](crate::GluError::Cancelled) is a
    /// clean exit; any other error stops every sibling trigger.
    async fn run_triggers(&self, shutdown: CancellationToken) -> GluResult<()>;
}

#[derive(Clone)]
pub enum PipelineEdge {
    Static(Arc<dyn Edge>),
    Triggerable(Arc<dyn TriggerableEdge>),
}

impl PipelineEdge {
    pub fn kind(&self) -> &str {
        match self {
            PipelineEdge::Static(edge) => edge.kind(),
            PipelineEdge::Triggerable(edge) => edge.kind(),
        }
    }

    pub fn from(&self) -> &str {
        match self {
            PipelineEdge::Static(edge) => edge.from(),
            PipelineEdge::Triggerable(edge) => edge.from(),
        }
    }

    pub fn to(&self) -> &str {
        match self {
            PipelineEdge::Static(edge) => edge.to(),
            PipelineEdge::Triggerable(edge) => edge.to(),
        }
    }

    pub fn as_triggerable(&self) -> Option<&Arc<dyn TriggerableEdge>> {
        match self {
            PipelineEdge::Triggerable(edge) => Some(edge),
            PipelineEdge::Static(_) => None,
        }
    }

    pub fn is_triggerable(&self) -> bool {
        self.as_triggerable().is_some()
    }
}

impl std::fmt::Debug for PipelineEdge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineEdge")
            .field("kind", &self.kind())
            .field("from", &self.from())
            .field("to", &self.to())
            .field("triggerable", &self.is_triggerable())
            .finish()
    }
}

/// A named set of phases connected by edges.
#[derive(Debug, Clone)]
pub struct Pipeline {
    metadata: Metadata,
    edges: Vec<PipelineEdge>,
}

impl Pipeline {
    pub fn new(metadata: Metadata) -> Self {
        Self {
            metadata,
            edges: Vec::new(),
        }
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    pub fn name(&self) -> &str {
        &self.metadata.name
    }

    pub fn with_edge(mut self, edge: Arc<dyn Edge>) -> Self {
        self.edges.push(PipelineEdge::Static(edge));
        self
    }

    pub fn with_triggerable_edge(mut self, edge: Arc<dyn TriggerableEdge>) -> Self {
        self.edges.push(PipelineEdge::Triggerable(edge));
        self
    }

    pub fn edges(&self) -> impl Iterator<Item = &PipelineEdge> {
        self.edges.iter()
    }
}
