mod cli;

use anyhow::{Context, Result};
use axum_server::tls_rustls::RustlsConfig;
use clap::Parser;
use redeem_core::cache::ScrolloCache;
use redeem_core::executor::ProcessRunner;
use redeem_core::lighting::{LifxLights, discover};
use redeem_core::router::RewardRouter;
use redeem_core::webhook::EventSubVerifier;
use redeem_server::state::secrets_from_env;
use redeem_server::{AppState, ServerConfig, app_router};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (doesn't override existing env vars)
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "redeem_server=debug,redeem_core=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    match cli.command.unwrap_or_default() {
        Commands::Run => run_server().await,
        Commands::Discover { timeout } => list_bulbs(Duration::from_secs(timeout)).await,
    }
}

async fn list_bulbs(timeout: Duration) -> Result<()> {
    let bulbs = discover(timeout).await?;
    if bulbs.is_empty() {
        println!("No bulbs found");
        return Ok(());
    }
    for bulb in bulbs {
        println!("{}  {}", bulb.mac_address(), bulb.addr);
    }
    Ok(())
}

async fn run_server() -> Result<()> {
    let config = ServerConfig::from_env().map_err(anyhow::Error::msg)?;

    tokio::fs::create_dir_all(&config.cache_dir)
        .await
        .with_context(|| format!("Failed to create cache directory {}", config.cache_dir.display()))?;

    tracing::info!("Finding bulbs");
    let found = discover(config.discovery_timeout).await?;
    let lights = LifxLights::resolve(&found, &config.bulbs)
        .await
        .context("Missing bulb(s)")?;
    tracing::info!(
        "Found bed bulb {} and ceiling bulb {}",
        config.bulbs.bed,
        config.bulbs.ceiling
    );

    let verifier = EventSubVerifier::new(secrets_from_env());
    let router = RewardRouter::new(
        Arc::new(lights),
        Arc::new(ProcessRunner::new(config.action_timeout)),
        ScrolloCache::new(&config.cache_dir, &config.scrollo_link),
        config.actions.clone(),
    );

    let app = app_router(AppState::new(verifier, router));
    let addr = config.bind_addr;

    if config.dev_mode {
        tracing::warn!("Dev mode enabled");
    }

    match config.tls {
        Some(tls) => {
            let rustls = RustlsConfig::from_pem_file(&tls.cert, &tls.key)
                .await
                .with_context(|| format!("Failed to load TLS material from {}", tls.cert.display()))?;
            tracing::info!("Redeem server listening on https://{}", addr);
            axum_server::bind_rustls(addr, rustls)
                .serve(app.into_make_service())
                .await
                .context("Server error")?;
        }
        None => {
            let listener = tokio::net::TcpListener::bind(addr)
                .await
                .with_context(|| format!("Failed to bind {}", addr))?;
            tracing::warn!("No TLS material configured, serving plain HTTP");
            tracing::info!("Redeem server listening on http://{}", addr);
            axum::serve(listener, app).await.context("Server error")?;
        }
    }

    Ok(())
}
