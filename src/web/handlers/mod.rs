//! # Web API Request Handlers

pub mod health;
pub mod metrics;
pub mod pipelines;
