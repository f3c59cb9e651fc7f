use anyhow::Context;
use materials_admin::{ApplicationBuilder, Dispatcher, EnvironmentConfig};
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // RUST_LOG may come from .env, and config parsing logs through tracing.
    let _ = dotenvy::dotenv();
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let env = EnvironmentConfig::from_env();

    let bind_addr = env.bind_addr;
    let dispatcher = Dispatcher::new(ApplicationBuilder::postgres(), env);

    let listener = TcpListener::bind(bind_addr)
        .await
        .with_context(|| format!("failed to bind {bind_addr}"))?;
    info!("materials-admin listening on {}", bind_addr);
    info!(
        mode = ?dispatcher.env().mode,
        docs = %materials_admin::documentation::DOCS_PATH,
        admin = %materials_admin::admin::DEFAULT_ROOT_PATH,
        "Routes mounted"
    );

    dispatcher.warm_up();

    axum::serve(listener, dispatcher.router())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "Failed to listen for shutdown signal");
    }
    info!("Shutdown signal received");
}
