use barista_drinks::{app, Config, DrinkStore};
use clap::Parser;
use color_eyre::eyre::WrapErr;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::parse();
    let authority = config
        .authority()
        .wrap_err("unable to build the JWKS client")?;

    if let Some(interval) = config.refresh_interval() {
        authority.key_provider().spawn_refresh(interval);
    }

    let listener = TcpListener::bind(config.listen)
        .await
        .wrap_err_with(|| format!("unable to listen on {}", config.listen))?;

    tracing::info!(
        listen = %config.listen,
        issuer = %config.issuer(),
        jwks.url = %config.jwks_url(),
        "serving drinks"
    );

    axum::serve(listener, app(authority, DrinkStore::new(), config.cors()))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        let error: &(dyn std::error::Error + Send + Sync) = &error;
        tracing::warn!(error, "unable to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}
