//! # One-Shot Commands
//!
//! When the process is started with arguments the run controller hands them
//! to a [`CommandDispatcher`] instead of starting the service. The default
//! [`ClapDispatcher`] offers:
//!
//! - `inspect [PIPELINE]` - list registered pipelines and their edges
//! - `config` - print the effective configuration

use async_trait::async_trait;
use clap::error::ErrorKind;
use clap::{Parser, Subcommand, ValueEnum};
use std::fmt::Write as _;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::{GluError, GluResult};
use crate::system::System;
use crate::web::handlers::pipelines::PipelineSummary;

/// Handles one-shot invocations. `args` includes the program name.
#[async_trait]
pub trait CommandDispatcher: Send + Sync {
    async fn dispatch(
        &self,
        system: &System,
        args: &[String],
        shutdown: CancellationToken,
    ) -> GluResult<()>;
}

#[derive(Parser, Debug)]
#[command(name = "glu")]
#[command(about = "Inspect and operate glu deployment pipelines")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Show registered pipelines and their edges
    Inspect {
        /// Pipeline to show; all pipelines when omitted
        pipeline: Option<String>,

        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },

    /// Print the effective configuration as JSON
    Config,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Table,
    Json,
}

/// Default dispatcher backed by [`Cli`]
#[derive(Debug, Default, Clone, Copy)]
pub struct ClapDispatcher;

impl ClapDispatcher {
    /// Execute `cli` against `system` and return what would be printed
    pub fn render(&self, system: &System, cli: &Cli) -> GluResult<String> {
        match &cli.command {
            Commands::Inspect { pipeline, format } => {
                let mut summaries: Vec<PipelineSummary> = match pipeline {
                    Some(name) => vec![PipelineSummary::from(system.get_pipeline(name)?.as_ref())],
                    None => system
                        .pipelines()
                        .map(|(_, pipeline)| PipelineSummary::from(pipeline.as_ref()))
                        .collect(),
                };
                summaries.sort_by(|a, b| a.name.cmp(&b.name));

                match format {
                    OutputFormat::Json => to_json(&summaries),
                    OutputFormat::Table => Ok(render_table(&summaries)),
                }
            }
            Commands::Config => {
                let config = system.configuration()?;
                to_json(config.as_ref())
            }
        }
    }
}

#[async_trait]
impl CommandDispatcher for ClapDispatcher {
    async fn dispatch(
        &self,
        system: &System,
        args: &[String],
        _shutdown: CancellationToken,
    ) -> GluResult<()> {
        let cli = match Cli::try_parse_from(args) {
            Ok(cli) => cli,
            Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
                print!("{e}");
                return Ok(());
            }
            Err(e) => return Err(GluError::Command(e.to_string())),
        };

        debug!(command = ?cli.command, "Dispatching command");
        let output = self.render(system, &cli)?;
        println!("{output}");
        Ok(())
    }
}

fn to_json<T: serde::Serialize + ?Sized>(value: &T) -> GluResult<String> {
    serde_json::to_string_pretty(value)
        .map_err(|e| GluError::Command(format!("encoding output: {e}")))
}

fn render_table(pipelines: &[PipelineSummary]) -> String {
    let mut out = String::new();
    for pipeline in pipelines {
        let _ = writeln!(out, "pipeline {}", pipeline.name);
        for (key, value) in &pipeline.labels {
            let _ = writeln!(out, "  label {key}={value}");
        }
        for edge in &pipeline.edges {
            let trigger = if edge.triggerable { " (triggerable)" } else { "" };
            let _ = writeln!(out, "  {:<12} {} -> {}{trigger}", edge.kind, edge.from, edge.to);
        }
    }
    out.trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{GluConfig, MetricsConfig};
    use crate::core::{Edge, Metadata, Pipeline};
    use std::sync::Arc;

    struct Promotion;

    impl Edge for Promotion {
        fn kind(&self) -> &str {
            "promotion"
        }
        fn from(&self) -> &str {
            "staging"
        }
        fn to(&self) -> &str {
            "production"
        }
    }

    fn system() -> System {
        let mut system = System::new(Metadata::new("cli-test")).with_config(GluConfig {
            metrics: MetricsConfig::disabled(),
            ..GluConfig::default()
        });
        system.add_pipeline(
            Pipeline::new(Metadata::new("checkout").with_label("team", "payments"))
                .with_edge(Arc::new(Promotion)),
        );
        system
    }

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).unwrap()
    }

    #[test]
    fn test_inspect_table_lists_edges() {
        let output = ClapDispatcher
            .render(&system(), &parse(&["glu", "inspect"]))
            .unwrap();
        assert!(output.starts_with("pipeline checkout"));
        assert!(output.contains("label team=payments"));
        assert!(output.contains("staging -> production"));
    }

    #[test]
    fn test_inspect_unknown_pipeline_is_not_found() {
        let err = ClapDispatcher
            .render(&system(), &parse(&["glu", "inspect", "missing"]))
            .unwrap_err();
        assert!(matches!(err, GluError::NotFound(ref name) if name == "missing"));
    }

    #[test]
    fn test_inspect_json_is_parseable() {
        let output = ClapDispatcher
            .render(
                &system(),
                &parse(&["glu", "inspect", "checkout", "--format", "json"]),
            )
            .unwrap();
        let value: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(value[0]["name"], "checkout");
        assert_eq!(value[0]["edges"][0]["triggerable"], false);
    }

    #[test]
    fn test_config_prints_injected_configuration() {
        let output = ClapDispatcher
            .render(&system(), &parse(&["glu", "config"]))
            .unwrap();
        let value: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(value["metrics"]["enabled"], false);
    }

    #[tokio::test]
    async fn test_unknown_subcommand_is_a_command_error() {
        let args = vec!["glu".to_string(), "promote".to_string()];
        let err = ClapDispatcher
            .dispatch(&system(), &args, CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, GluError::Command(_)));
    }
}
