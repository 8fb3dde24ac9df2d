mod config;
mod error;
mod routes;

use config::ApiConfig;
use mnoc_core::db::LibSqlJobQueue;
use routes::{app_router, AppState};
use tracing_subscriber::filter::Directive;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Only load .env in development; production uses platform-native env injection.
    #[cfg(debug_assertions)]
    dotenvy::dotenv().ok();

    let directive = "mnoc_api=info"
        .parse()
        .unwrap_or_else(|_| Directive::from(tracing::Level::INFO));
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(directive))
        .init();

    let config = ApiConfig::from_env()?;
    tracing::info!("Starting mnoc-api with config: {:?}", config);

    let queue = LibSqlJobQueue::open(&config.queue.path)
        .await?
        .with_poll_interval(config.queue.poll_interval);
    let router = app_router(AppState::new(queue));

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("mnoc-api listening on {}", config.bind_addr);
    axum::serve(listener, router).await?;
    Ok(())
}
