//! # Pipeline Handlers
//!
//! Read-only views of the registered pipelines and their edges.

use axum::extract::{Path, State};
use axum::Json;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::debug;

use crate::core::{Pipeline, PipelineEdge};
use crate::error::GluError;
use crate::web::errors::ApiResult;
use crate::web::state::AppState;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct EdgeSummary {
    pub kind: String,
    pub from: String,
    pub to: String,
    pub triggerable: bool,
}

impl From<&PipelineEdge> for EdgeSummary {
    fn from(edge: &PipelineEdge) -> Self {
        Self {
            kind: edge.kind().to_string(),
            from: edge.from().to_string(),
            to: edge.to().to_string(),
            triggerable: edge.is_triggerable(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PipelineSummary {
    pub name: String,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,
    pub edges: Vec<EdgeSummary>,
}

impl From<&Pipeline> for PipelineSummary {
    fn from(pipeline: &Pipeline) -> Self {
        let metadata = pipeline.metadata();
        Self {
            name: metadata.name.clone(),
            labels: metadata.labels.clone(),
            annotations: metadata.annotations.clone(),
            edges: pipeline.edges().map(EdgeSummary::from).collect(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PipelineListResponse {
    pub system: String,
    pub pipelines: Vec<PipelineSummary>,
}

/// List pipelines: GET /api/v1/pipelines
pub async fn list_pipelines(State(state): State<AppState>) -> Json<PipelineListResponse> {
    let pipelines = state
        .pipelines
        .values()
        .map(|pipeline| PipelineSummary::from(pipeline.as_ref()))
        .collect();

    Json(PipelineListResponse {
        system: state.system_name.to_string(),
        pipelines,
    })
}

/// Get a single pipeline: GET /api/v1/pipelines/{name}
pub async fn get_pipeline(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> ApiResult<Json<PipelineSummary>> {
    debug!(pipeline = %name, "Looking up pipeline");

    let pipeline = state
        .pipelines
        .get(&name)
        .ok_or_else(|| GluError::NotFound(name.clone()))?;

    Ok(Json(PipelineSummary::from(pipeline.as_ref())))
}
