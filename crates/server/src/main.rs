use anyhow::Context;
use deployment::Deployment;
use server::{DeploymentImpl, build_router};
use tokio::net::TcpListener;
use tracing::info;
use utils::env::{env_non_empty, env_u16};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    utils::logging::init_tracing("info,server=debug,services=debug");
    let _sentry = utils::sentry::init_once("server");

    let deployment = DeploymentImpl::new()
        .await
        .context("failed to initialise storage backend")?;
    let backend = deployment.backend_name();
    let app = build_router(deployment);

    let host = env_non_empty("HOST").unwrap_or_else(|| "127.0.0.1".to_string());
    let port = env_u16("PORT", 3001);
    let listener = TcpListener::bind((host.as_str(), port))
        .await
        .with_context(|| format!("failed to bind {host}:{port}"))?;
    info!(address = %listener.local_addr()?, backend, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {e}");
    }
    info!("Shutdown signal received");
}
