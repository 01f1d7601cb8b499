use std::sync::Arc;

pub mod attempts;
pub mod cards;
pub mod config;
pub mod server;

use attempts::AttemptStorage;
use cards::{CardCache, SheetSource};
use config::Config;

/// Shared state handed to every request handler.
pub struct AppState {
    pub cards: CardCache,
    pub attempts: Arc<AttemptStorage>,
}

impl AppState {
    /// Open the attempt database and wire the spreadsheet-backed card cache.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let source = SheetSource::from_config(config)?;

        let attempts = AttemptStorage::open(&config.database_path)?;
        log::info!("Attempt log at {}", attempts.db_path().display());

        Ok(Self {
            cards: CardCache::new(Arc::new(source)),
            attempts: Arc::new(attempts),
        })
    }
}

/// Run the card service until Ctrl+C or SIGTERM.
pub async fn run(config: Config) -> anyhow::Result<()> {
    let state = Arc::new(AppState::from_config(&config)?);

    let mut server = server::start_server(&config, state)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to start server on {}: {}", config.bind_address(), e))?;

    shutdown_signal().await;
    server.stop();
    server.wait().await;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            log::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
        log::info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
                log::info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                log::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
