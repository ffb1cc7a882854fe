//! # System
//!
//! The pipeline registry and the entry point of a glu process. A `System` is
//! populated with pipelines before [`System::run`] and is read-only while it
//! runs; the API server and trigger runner work from `Arc` snapshots.
//!
//! ```rust
//! use glu::{Metadata, Pipeline, System};
//!
//! let mut system = System::new(Metadata::new("platform"));
//! system.add_pipeline(Pipeline::new(Metadata::new("checkout")));
//!
//! assert!(system.get_pipeline("checkout").is_ok());
//! assert!(system.get_pipeline("billing").is_err());
//! ```

use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

use crate::cli::{ClapDispatcher, CommandDispatcher};
use crate::config::{ConfigLoader, GluConfig};
use crate::core::{Metadata, Pipeline};
use crate::error::{GluError, GluResult};
use crate::logging::init_tracing;
use crate::orchestration::{RunState, RunStateCell};

pub struct System {
    ctx: CancellationToken,
    meta: Metadata,
    config: Mutex<Option<Arc<GluConfig>>>,
    pipelines: HashMap<String, Arc<Pipeline>>,
    ui: Option<PathBuf>,
    pub(crate) dispatcher: Arc<dyn CommandDispatcher>,
    pub(crate) err: Option<GluError>,
    state: RunStateCell,
}

impl System {
    pub fn new(meta: Metadata) -> Self {
        Self::with_context(CancellationToken::new(), meta)
    }

    /// Build a system whose lifetime is bounded by `ctx`.
    ///
    /// Cancelling `ctx` stops a running service the same way a signal does.
    pub fn with_context(ctx: CancellationToken, meta: Metadata) -> Self {
        Self {
            ctx,
            meta,
            config: Mutex::new(None),
            pipelines: HashMap::new(),
            ui: None,
            dispatcher: Arc::new(ClapDispatcher),
            err: None,
            state: RunStateCell::new(RunState::Idle),
        }
    }

    /// Serve static UI files from `dir` for requests no API route matches
    pub fn with_ui(mut self, dir: impl Into<PathBuf>) -> Self {
        self.ui = Some(dir.into());
        self
    }

    /// Use `config` instead of loading configuration from disk
    pub fn with_config(self, config: GluConfig) -> Self {
        init_tracing(&config.log);
        *self.config.lock() = Some(Arc::new(config));
        self
    }

    pub fn with_dispatcher(mut self, dispatcher: impl CommandDispatcher + 'static) -> Self {
        self.dispatcher = Arc::new(dispatcher);
        self
    }

    /// Root cancellation token of this system
    pub fn context(&self) -> CancellationToken {
        self.ctx.clone()
    }

    pub fn metadata(&self) -> &Metadata {
        &self.meta
    }

    pub fn name(&self) -> &str {
        &self.meta.name
    }

    pub fn ui(&self) -> Option<&Path> {
        self.ui.as_deref()
    }

    /// Register `pipeline` under its name, replacing any previous pipeline
    /// with the same name
    pub fn add_pipeline(&mut self, pipeline: impl Into<Arc<Pipeline>>) -> &mut Self {
        let pipeline = pipeline.into();
        let name = pipeline.name().to_string();
        if self.pipelines.insert(name.clone(), pipeline).is_some() {
            debug!(pipeline = %name, "Replaced pipeline");
        } else {
            debug!(pipeline = %name, "Registered pipeline");
        }
        self
    }

    /// Build a pipeline from the system configuration and register it.
    ///
    /// Errors are not returned here: the first one is kept and returned by
    /// [`run`](Self::run) before anything else happens. Once an error has
    /// been recorded further builders are skipped.
    pub fn add_pipeline_with<F>(&mut self, build: F) -> &mut Self
    where
        F: FnOnce(&GluConfig) -> GluResult<Pipeline>,
    {
        if self.err.is_some() {
            return self;
        }

        match self.configuration().and_then(|config| build(&config)) {
            Ok(pipeline) => {
                self.add_pipeline(pipeline);
            }
            Err(e) => {
                error!(system = %self.meta.name, error = %e, "building pipeline");
                self.err = Some(e);
            }
        }
        self
    }

    pub fn get_pipeline(&self, name: &str) -> GluResult<Arc<Pipeline>> {
        self.pipelines
            .get(name)
            .cloned()
            .ok_or_else(|| GluError::NotFound(name.to_string()))
    }

    /// Every registered pipeline, in no particular order
    pub fn pipelines(&self) -> impl Iterator<Item = (&str, &Arc<Pipeline>)> {
        self.pipelines
            .iter()
            .map(|(name, pipeline)| (name.as_str(), pipeline))
    }

    pub fn len(&self) -> usize {
        self.pipelines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pipelines.is_empty()
    }

    /// Configuration for this system, loaded on first use and cached.
    ///
    /// Logging is initialized from the configuration the first time it is
    /// loaded.
    pub fn configuration(&self) -> GluResult<Arc<GluConfig>> {
        let mut cached = self.config.lock();
        if let Some(config) = cached.as_ref() {
            return Ok(config.clone());
        }

        let config = Arc::new(ConfigLoader::load()?);
        init_tracing(&config.log);
        *cached = Some(config.clone());
        Ok(config)
    }

    pub fn run_state(&self) -> RunState {
        self.state.get()
    }

    pub(crate) fn set_run_state(&self, state: RunState) {
        self.state.set(state);
    }

    pub(crate) fn run_state_cell(&self) -> RunStateCell {
        self.state.clone()
    }
}

impl std::fmt::Debug for System {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("System")
            .field("name", &self.meta.name)
            .field("pipelines", &self.pipelines.keys().collect::<Vec<_>>())
            .field("ui", &self.ui)
            .field("state", &self.run_state())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MetricsConfig;

    fn injected() -> GluConfig {
        GluConfig {
            metrics: MetricsConfig::disabled(),
            ..GluConfig::default()
        }
    }

    #[test]
    fn test_last_registration_wins() {
        let mut system = System::new(Metadata::new("sys"));
        system
            .add_pipeline(Pipeline::new(Metadata::new("p").with_label("rev", "1")))
            .add_pipeline(Pipeline::new(Metadata::new("p").with_label("rev", "2")));

        assert_eq!(system.len(), 1);
        let pipeline = system.get_pipeline("p").unwrap();
        assert_eq!(pipeline.metadata().labels["rev"], "2");
    }

    #[test]
    fn test_unknown_pipeline_is_not_found() {
        let system = System::new(Metadata::new("sys"));
        let err = system.get_pipeline("nope").unwrap_err();
        assert!(matches!(err, GluError::NotFound(ref name) if name == "nope"));
    }

    #[test]
    fn test_builder_receives_injected_configuration() {
        let mut system = System::new(Metadata::new("sys")).with_config(injected());
        system.add_pipeline_with(|config| {
            assert!(!config.metrics.enabled);
            Ok(Pipeline::new(Metadata::new("built")))
        });

        assert!(system.err.is_none());
        assert!(system.get_pipeline("built").is_ok());
    }

    #[test]
    fn test_first_builder_error_is_kept() {
        let mut system = System::new(Metadata::new("sys")).with_config(injected());
        system
            .add_pipeline_with(|_| Err(GluError::Command("first".to_string())))
            .add_pipeline_with(|_| Err(GluError::Command("second".to_string())))
            .add_pipeline_with(|_| Ok(Pipeline::new(Metadata::new("skipped"))));

        assert!(matches!(system.err, Some(GluError::Command(ref m)) if m == "first"));
        assert!(system.is_empty());
    }

    #[test]
    fn test_configuration_is_cached() {
        let system = System::new(Metadata::new("sys")).with_config(injected());
        let first = system.configuration().unwrap();
        let second = system.configuration().unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_new_system_is_idle() {
        let system = System::new(Metadata::new("sys"));
        assert_eq!(system.run_state(), RunState::Idle);
        assert!(!system.context().is_cancelled());
    }
}
