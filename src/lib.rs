//! policyguard -- model security showcase backend for a tax-policy
//! prediction demo.
//!
//! This crate holds the reactive store that feeds the security dashboard
//! charts, the scripted simulation driver behind the "live security testing"
//! panel, and the HTTP API the dashboard talks to.

pub mod api;
pub mod config;
pub mod simulate;
pub mod store;

use anyhow::{Context, Result};

use crate::api::state::AppState;
use crate::config::AppConfig;

/// Start the policyguard API server.
pub async fn serve(config: AppConfig) -> Result<()> {
    let state = AppState::new(config.simulation.clone());

    let addr: std::net::SocketAddr = config
        .server
        .bind
        .parse()
        .with_context(|| format!("invalid bind address: {}", config.server.bind))?;
    let app = api::router(state);

    tracing::info!(%addr, "policyguard listening");
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    axum::serve(listener, app).await?;

    Ok(())
}
