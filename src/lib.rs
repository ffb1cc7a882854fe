#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Glu Core
//!
//! Process lifecycle and concurrent-run orchestration for glu deployment
//! pipelines.
//!
//! ## Overview
//!
//! A [`System`] holds a registry of named [`Pipeline`]s. Running it either
//! executes a one-shot command (when the process has arguments) or starts a
//! long-lived service in which three subsystems share one cancellation
//! token:
//!
//! - the API server, exposing health, pipeline views and prometheus metrics
//! - the telemetry exporter, prometheus pull or OTLP push
//! - one trigger task per triggerable pipeline edge
//!
//! The first failure, SIGINT or SIGTERM cancels everything. Cleanup actions
//! then run last-in-first-out within a shared 15 second deadline.
//!
//! ## Module Organization
//!
//! - [`core`] - pipeline, edge and metadata types
//! - [`system`] - the pipeline registry
//! - [`orchestration`] - run controller, shutdown stack, trigger runner
//! - [`telemetry`] - metrics exporter selection and meter provider lifetime
//! - [`web`] - axum API server
//! - [`cli`] - one-shot command dispatch
//! - [`schedule`] - interval-driven trigger
//! - [`config`] - configuration loading and validation
//! - [`logging`] - tracing subscriber setup
//! - [`error`] - structured error handling
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use glu::schedule::ScheduleTrigger;
//! use glu::{Metadata, Pipeline, System};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! # async fn example() -> glu::GluResult<()> {
//! let mut system = System::new(Metadata::new("platform"));
//! system.add_pipeline(
//!     Pipeline::new(Metadata::new("checkout")).with_triggerable_edge(Arc::new(
//!         ScheduleTrigger::new("oci", "staging", Duration::from_secs(30), || async {
//!             Ok(())
//!         }),
//!     )),
//! );
//!
//! system.run().await
//! # }
//! ```

pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod logging;
pub mod orchestration;
pub mod schedule;
pub mod system;
pub mod telemetry;
pub mod web;

pub use crate::core::{Edge, Metadata, Pipeline, PipelineEdge, TriggerableEdge};
pub use cli::CommandDispatcher;
pub use error::{GluError, GluResult};
pub use orchestration::RunState;
pub use system::System;
