use std::error::Error;

use dotenvy::dotenv;
use tracing::{info, warn};

use movie_reporter::{
    api::{ApiState, router},
    config::{AppConfig, StoreBackend},
    logging::init_tracing,
    services::{DocumentStore, InMemoryStore, surreal::SurrealStore},
    surreal::connect,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    dotenv().ok();
    init_tracing();

    let config = AppConfig::from_env();
    if config.jwt_secret.is_none() {
        warn!("JWT_SECRET is not set; every admin request will be rejected");
    }

    match config.backend {
        StoreBackend::Memory => {
            info!("using in-memory store with sample content");
            serve(InMemoryStore::new_with_sample(), &config).await
        }
        StoreBackend::Surreal => {
            let client = connect(&config.surreal).await?;
            serve(SurrealStore::new(client), &config).await
        }
    }
}

async fn serve<S: DocumentStore>(store: S, config: &AppConfig) -> Result<(), Box<dyn Error>> {
    let app = router(ApiState::new(store, config));
    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    info!("API listening on http://{}", config.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut terminate) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {},
                    _ = terminate.recv() => {},
                }
            }
            Err(err) => {
                warn!(error = %err, "failed to install SIGTERM handler");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!(error = %err, "failed to install Ctrl+C handler");
        }
    }
    info!("shutting down");
}
