//! Core pipeline types consumed by the orchestrator.

pub mod metadata;
pub mod pipeline;

pub use metadata::Metadata;
pub use pipeline::{Edge, Pipeline, PipelineEdge, TriggerableEdge};
