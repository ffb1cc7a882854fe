//! # Logging
//!
//! Console logging through the tracing ecosystem, written for containers where
//! logs go to stdout. The subscriber is installed once per process; later calls
//! are no-ops, and an already-installed global subscriber (for example one set
//! up by an embedding application or a test harness) is left in place.
//!
//! `RUST_LOG` takes precedence over the configured level so individual targets
//! can be tuned without editing `glu.yaml`.

use std::io::IsTerminal;
use std::sync::OnceLock;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::config::{LogConfig, LogFormat};

static TRACING_INITIALIZED: OnceLock<()> = OnceLock::new();

/// Initialize tracing with the configured level and output format
pub fn init_tracing(config: &LogConfig) {
    TRACING_INITIALIZED.get_or_init(|| {
        let filter = env_filter(&config.level);
        let use_ansi = IsTerminal::is_terminal(&std::io::stdout());

        let console_layer = match config.format {
            LogFormat::Text => fmt::layer()
                .with_target(true)
                .with_level(true)
                .with_ansi(use_ansi)
                .with_filter(filter)
                .boxed(),
            LogFormat::Json => fmt::layer()
                .json()
                .with_target(true)
                .with_level(true)
                .with_filter(filter)
                .boxed(),
        };

        if tracing_subscriber::registry()
            .with(console_layer)
            .try_init()
            .is_err()
        {
            tracing::debug!(
                "Global tracing subscriber already initialized - continuing with existing subscriber"
            );
        } else {
            tracing::debug!(
                level = %config.level,
                format = ?config.format,
                ansi_colors = use_ansi,
                "Logging initialized"
            );
        }
    });
}

fn env_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.to_lowercase()))
}
