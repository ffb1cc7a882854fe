//! # Glu Demo
//!
//! A small glu system with two pipelines. Run without arguments to start the
//! service (API on the configured address, metrics per `glu.yaml`), or pass a
//! command such as `glu-demo inspect` for a one-shot run.

use glu::schedule::ScheduleTrigger;
use glu::{Edge, Metadata, Pipeline, System};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Manual promotion between two phases; never triggers on its own
struct Promotion {
    from: &'static str,
    to: &'static str,
}

impl Edge for Promotion {
    fn kind(&self) -> &str {
        "promotion"
    }

    fn from(&self) -> &str {
        self.from
    }

    fn to(&self) -> &str {
        self.to
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let mut system = System::new(Metadata::new("demo").with_label("env", "local"));

    system.add_pipeline_with(|config| {
        let interval = if config.metrics.enabled {
            Duration::from_secs(30)
        } else {
            Duration::from_secs(60)
        };

        Ok(Pipeline::new(Metadata::new("checkout").with_label("team", "payments"))
            .with_triggerable_edge(Arc::new(ScheduleTrigger::new(
                "oci",
                "staging",
                interval,
                || async {
                    info!(pipeline = "checkout", "Reconciling staging with oci");
                    Ok(())
                },
            )))
            .with_edge(Arc::new(Promotion {
                from: "staging",
                to: "production",
            })))
    });

    system.add_pipeline(
        Pipeline::new(Metadata::new("billing").with_annotation("owner", "finance"))
            .with_edge(Arc::new(Promotion {
                from: "staging",
                to: "production",
            })),
    );

    match system.run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("glu-demo: {e}");
            ExitCode::FAILURE
        }
    }
}
