//! Signal handling for graceful shutdown.

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Wait for SIGINT or SIGTERM (ctrl-c on non-unix platforms).
///
/// If a handler cannot be installed the corresponding branch never fires
/// rather than shutting the service down immediately.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!(signal = "SIGINT", "Signal received"),
            Err(e) => {
                warn!(error = %e, "Failed to install SIGINT handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
                info!(signal = "SIGTERM", "Signal received");
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

/// Derive a token from `parent` that is also cancelled by OS signals.
///
/// The returned token is the single cancellation source for a service run.
/// The signal listener exits once the token is cancelled for any reason.
pub fn signal_token(parent: &CancellationToken) -> CancellationToken {
    let token = parent.child_token();
    let listener = token.clone();

    tokio::spawn(async move {
        tokio::select! {
            _ = shutdown_signal() => listener.cancel(),
            _ = listener.cancelled() => {},
        }
    });

    token
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_parent_cancellation_reaches_signal_token() {
        let root = CancellationToken::new();
        let token = signal_token(&root);

        root.cancel();

        tokio::time::timeout(Duration::from_millis(100), token.cancelled())
            .await
            .expect("child token should observe parent cancellation");
    }

    #[tokio::test]
    async fn test_signal_token_does_not_cancel_parent() {
        let root = CancellationToken::new();
        let token = signal_token(&root);

        token.cancel();

        assert!(token.is_cancelled());
        assert!(!root.is_cancelled());
    }
}
