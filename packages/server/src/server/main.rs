use anyhow::Result;
use tracing_subscriber::EnvFilter;

use server_core::domains::eol::daily;
use server_core::server::app::{build_deps, build_router, AppState};
use server_core::Config;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = Config::from_env()?;
    let deps = build_deps(&config).await?;

    // Keep the scheduler handle alive for the lifetime of the server.
    let _scheduler = daily::start_scheduler(deps.clone(), config.self_base_url.clone()).await?;

    let state = AppState {
        deps,
        api_token: config.api_token.clone(),
    };
    let app = build_router(state, &config.allowed_origins);

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", config.port)).await?;
    tracing::info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}
