use crate::catalog::SampleCatalog;
use crate::classifier::HttpClassifier;
use crate::config::Config;
use crate::controller::SelectionController;
use crate::history::MoleHistory;
use crate::server::HttpServer;
use crate::telemetry::Metrics;

use std::{error::Error, sync::Arc};
use tokio::{signal, sync::broadcast};

pub async fn start_app(config: Config) -> Result<(), Box<dyn Error>> {
    let catalog: Arc<SampleCatalog> = match SampleCatalog::load(&config.catalog) {
        Ok(catalog) => Arc::new(catalog),
        Err(e) => {
            tracing::error!("Failed to load sample catalog: {:?}", e);
            return Err(Box::new(e));
        }
    };

    let history: Arc<MoleHistory> = match MoleHistory::open(&config.history.file) {
        Ok(history) => Arc::new(history),
        Err(e) => {
            tracing::error!("Failed to open mole history: {:?}", e);
            return Err(Box::new(e));
        }
    };

    let metrics = Arc::new(Metrics::new());
    let classifier = HttpClassifier::new(&config.classifier);
    let controller =
        SelectionController::new(classifier, config.normalizer.options(), metrics.clone());

    let server = HttpServer::new(controller, catalog, history, metrics, &config).await?;

    let (shutdown_tx, _) = broadcast::channel(1);
    let server_shutdown_rx = shutdown_tx.subscribe();

    let server_handle = server.run(server_shutdown_rx).await?;

    shutdown_signal().await;
    tracing::info!("Shutdown signal received, starting graceful shutdown.");

    let _ = shutdown_tx.send(());
    let _ = server_handle.await;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
