//! # Run Controller
//!
//! Implements [`System::run`]. With command-line arguments the process is a
//! one-shot command handed to the system's dispatcher. Without them it
//! becomes a service: configuration is loaded, telemetry and the API server
//! are set up, and three tasks run together until cancellation or the first
//! failure:
//!
//! 1. the shutdown watcher, which waits for cancellation and then drains the
//!    shutdown stack
//! 2. the API server
//! 3. the trigger runner
//!
//! Cancellation comes from SIGINT/SIGTERM, from the system's root token, or
//! from any of the three tasks failing.

use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use super::shutdown::ShutdownStack;
use super::signal::signal_token;
use super::triggers::TriggerRunner;
use super::RunState;
use crate::error::{GluError, GluResult};
use crate::system::System;
use crate::telemetry::{select_exporter, Telemetry};
use crate::web::state::AppState;
use crate::web::{create_app, ApiServer};

impl System {
    /// Run with the process arguments
    pub async fn run(&mut self) -> GluResult<()> {
        self.run_with_args(std::env::args().collect()).await
    }

    /// Run with explicit arguments; `args[0]` is the program name.
    pub async fn run_with_args(&mut self, args: Vec<String>) -> GluResult<()> {
        if let Some(e) = self.err.take() {
            self.set_run_state(RunState::Stopped);
            return Err(e);
        }

        let token = signal_token(&self.context());
        let _cancel_on_return = token.clone().drop_guard();

        self.set_run_state(RunState::Configuring);

        if args.len() > 1 {
            self.set_run_state(RunState::OneShot);
            info!(system = %self.name(), command = %args[1], "Running command");
            let dispatcher = self.dispatcher.clone();
            return dispatcher.dispatch(self, &args, token).await;
        }

        let result = self.run_service(token).await;
        self.set_run_state(RunState::Stopped);
        result
    }

    async fn run_service(&self, token: CancellationToken) -> GluResult<()> {
        self.set_run_state(RunState::ServiceStarting);

        let config = self.configuration()?;
        let mut shutdown = ShutdownStack::new();

        let telemetry = if config.metrics.enabled {
            let reader = select_exporter(&config.metrics)?;
            let mut telemetry = Telemetry::start(self.name(), reader);
            telemetry.start_runtime_metrics();
            Some(telemetry)
        } else {
            info!("Metrics disabled");
            None
        };

        let mut state = AppState::new(self.name(), self.pipelines());
        if let Some(telemetry) = &telemetry {
            state = state
                .with_registry(telemetry.registry())
                .with_meter(&telemetry.meter());
        }

        let server = ApiServer::new(config.server.clone(), create_app(state, self.ui()));
        shutdown.push(server.stop_action());

        if let Some(telemetry) = telemetry {
            shutdown.push(telemetry.exporter_shutdown_action());
            shutdown.push(telemetry.shutdown_action());
        }

        let triggers =
            TriggerRunner::from_pipelines(self.pipelines().map(|(_, pipeline)| pipeline));

        self.set_run_state(RunState::ServiceRunning);
        info!(
            system = %self.name(),
            pipelines = self.len(),
            triggers = triggers.len(),
            "Service running"
        );

        let mut tasks: JoinSet<(&'static str, GluResult<()>)> = JoinSet::new();

        let watcher_token = token.clone();
        let run_state = self.run_state_cell();
        tasks.spawn(async move {
            watcher_token.cancelled().await;
            run_state.set(RunState::ShuttingDown);
            let failures = shutdown.run_all().await;
            if failures > 0 {
                error!(failures, "Shutdown finished with failures");
            }
            ("shutdown", Ok(()))
        });

        tasks.spawn(async move { ("api-server", server.serve().await) });

        let trigger_token = token.clone();
        tasks.spawn(async move { ("triggers", triggers.run(trigger_token).await) });

        let mut first_error: Option<GluError> = None;

        while let Some(joined) = tasks.join_next().await {
            let failure = match joined {
                Ok((task, Ok(()))) => {
                    info!(task, "Task finished");
                    None
                }
                Ok((task, Err(e))) => {
                    error!(task, error = %e, "Task failed");
                    Some(e)
                }
                Err(join_error) => {
                    error!(error = %join_error, "Task panicked");
                    Some(GluError::TaskPanicked(join_error.to_string()))
                }
            };

            if let Some(e) = failure {
                if first_error.is_none() {
                    token.cancel();
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
