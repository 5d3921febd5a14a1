use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::signal::ctrl_c;
#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

use crate::config::AppConfig;
use crate::engine::{Engine, EngineOptions};
use crate::errors::DbError;
use crate::http;
use crate::service::RestaurantService;

/// Opens the store, binds the listener and serves until Ctrl+C or SIGTERM.
/// The WAL is flushed on the way out.
///
/// # Errors
/// Returns an error if the store cannot be opened, the address cannot be
/// bound, or the server fails.
pub async fn serve(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let engine = open_store(&config)?;
    let service = RestaurantService::new(engine.clone(), config.query);
    let app = http::router(service);

    log::info!("Binding to {}", config.listen);
    let listener = TcpListener::bind(config.listen).await?;
    log::info!("Server running on {}", listener.local_addr()?);

    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;

    engine.flush()?;
    log::info!("Server shut down");
    Ok(())
}

/// Opens the store and compacts its WAL so replay time tracks the live data
/// rather than the write history.
///
/// # Errors
/// Returns an error if the store cannot be opened. A failed compaction is
/// logged and the store is served from the uncompacted log.
pub fn open_store(config: &AppConfig) -> Result<Arc<Engine>, DbError> {
    log::info!("Initializing store...");
    let engine = Engine::open(EngineOptions { data_dir: config.data_dir.clone() })?;
    if config.data_dir.is_some() {
        match engine.compact() {
            Ok(records) => log::info!("Startup compaction kept {records} records"),
            Err(e) => log::error!("Startup compaction failed: {e}"),
        }
    }
    Ok(Arc::new(engine))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match ctrl_c().await {
            Ok(()) => log::info!("Received Ctrl+C, shutting down"),
            Err(e) => {
                log::error!("Failed to install Ctrl+C handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal(SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
                log::info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                log::error!("Failed to install signal handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;
    use tempfile::tempdir;

    #[test]
    fn startup_compacts_the_log_and_keeps_live_records() {
        let dir = tempdir().unwrap();
        let config = AppConfig { data_dir: Some(dir.path().to_path_buf()), ..AppConfig::default() };
        let wal = dir.path().join("wal.bin");
        let kept = {
            let engine = Engine::open(EngineOptions { data_dir: config.data_dir.clone() }).unwrap();
            let kept = engine.insert("restaurants", doc! {"name": "kept"}).unwrap();
            for i in 0..10 {
                let d = engine.insert("restaurants", doc! {"name": format!("tmp{i}")}).unwrap();
                engine.delete("restaurants", &d.id).unwrap();
            }
            kept
        };
        let before = std::fs::metadata(&wal).unwrap().len();

        let engine = open_store(&config).unwrap();
        let after = std::fs::metadata(&wal).unwrap().len();
        assert!(after < before, "{after} >= {before}");
        assert_eq!(engine.get("restaurants", &kept.id).unwrap().data, doc! {"name": "kept"});
        assert_eq!(engine.count("restaurants", &crate::query::Filter::True), 1);
    }

    #[test]
    fn in_memory_store_opens_without_compaction() {
        let engine = open_store(&AppConfig::default()).unwrap();
        assert!(engine.list_collection_names().is_empty());
    }
}
