//! Startup helpers for the `DietDraft` server.

use std::process::ExitCode;

use crate::coach::core::config::CoachConfig;
use crate::server::{self, AppState};

/// Environment variable overriding the listening port.
pub const PORT_ENV: &str = "DIETDRAFT_PORT";

/// Run the server (used by the `dietdraft-server` binary).
///
/// # Returns
/// `ExitCode::SUCCESS` on graceful shutdown, `1` on failure.
#[must_use]
pub fn run() -> ExitCode {
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    tracing::info!("Starting DietDraft v{}", env!("CARGO_PKG_VERSION"));

    let config = match CoachConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Failed to load configuration: {e}");
            return ExitCode::from(1);
        }
    };
    if config.llm.api_key.is_none() {
        tracing::warn!("No server-side API key configured; requests must supply api_key");
    }
    tracing::info!(
        model = %config.llm.model,
        base_url = %config.llm.base_url,
        storage = ?config.storage.backend,
        "Coach configuration loaded"
    );

    let port = get_port();

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            tracing::error!("Failed to create runtime: {e}");
            return ExitCode::from(1);
        }
    };

    let result: Result<(), Box<dyn std::error::Error + Send + Sync>> = rt.block_on(async move {
        let state = AppState::from_config(config)
            .await
            .map_err(|e| format!("Failed to create state: {e}"))?;
        server::run_server_with_shutdown(state, port, shutdown_signal()).await
    });

    if let Err(e) = result {
        tracing::error!("Server error: {e}");
        return ExitCode::from(1);
    }

    ExitCode::SUCCESS
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

/// Get configured server port.
#[must_use]
pub fn get_port() -> u16 {
    port_from(std::env::var(PORT_ENV).ok().as_deref())
}

fn port_from(value: Option<&str>) -> u16 {
    value
        .and_then(|p| p.trim().parse().ok())
        .unwrap_or(server::DEFAULT_PORT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_port_from() {
        assert_eq!(port_from(None), 8000);
        assert_eq!(port_from(Some(" 9090 ")), 9090);
        assert_eq!(port_from(Some("http")), 8000);
    }
}
