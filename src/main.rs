use std::sync::Arc;

use axum::Server;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use mods_vault::config::{Config, LogFormat};
use mods_vault::http::{router, AppState};
use mods_vault::mods::remote_repo::GithubContentsRepo;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;
    init_tracing(config.log_format);

    let repo = GithubContentsRepo::new(
        &config.github_api_base,
        &config.repository,
        config.user_agent.clone(),
        config.github_token.clone(),
    )?;
    if config.github_token.is_none() {
        info!("no GITHUB_TOKEN configured, using unauthenticated upstream access");
    }

    let app = router(AppState {
        repo: Arc::new(repo),
        mods: Arc::new(config.mods.clone()),
        site: Arc::new(config.site.clone()),
    });

    info!("serving {} from {}/{}", config.bind_addr, config.repository, config.mods.root_path);
    Server::bind(&config.bind_addr)
        .serve(app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

fn init_tracing(log_format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match log_format {
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init(),
        LogFormat::Text => tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init(),
    }
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        // without a signal handler, run until killed
        std::future::pending::<()>().await;
    }
    info!("shutting down");
}
