use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::EnvFilter;

use dashboard_server::bikes::{GbfsClient, RefreshLoop, SnapshotCache};
use dashboard_server::cache::{CacheConfig, CachedEnturClient, CachedWeatherClient};
use dashboard_server::config::AppConfig;
use dashboard_server::departures::EnturClient;
use dashboard_server::stops::{GtfsImporter, StopStore};
use dashboard_server::weather::WeatherClient;
use dashboard_server::web::{AppState, cors_layer, create_router};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = AppConfig::from_env().expect("Invalid configuration");
    let cancel = CancellationToken::new();

    // Bike snapshot refresh
    let bikes = Arc::new(SnapshotCache::new());
    let gbfs = GbfsClient::new(config.gbfs_config()).expect("Failed to create GBFS client");
    let mut refresh = RefreshLoop::new(gbfs, bikes.clone(), config.bike_refresh_interval);
    let refresh_task = tokio::spawn({
        let cancel = cancel.clone();
        async move { refresh.run(cancel).await }
    });

    // Stop table, imported in the background on first start
    let stops = StopStore::connect(&config.database_url)
        .await
        .expect("Failed to open stop database");
    let importer = GtfsImporter::new(config.import_config(), stops.clone());
    let import_task = tokio::spawn({
        let cancel = cancel.clone();
        async move { importer.run_until_cancelled(cancel).await }
    });

    let cache_config = CacheConfig::default();
    let entur = EnturClient::new(config.entur_config()).expect("Failed to create Entur client");
    let weather =
        WeatherClient::new(config.weather_config()).expect("Failed to create weather client");

    let state = AppState::new(
        bikes,
        CachedEnturClient::new(entur, &cache_config),
        CachedWeatherClient::new(weather, &cache_config),
        stops,
    );

    let app = create_router(state, config.static_dir.as_deref())
        .layer(cors_layer(&config.cors_origin).expect("Invalid CORS_ORIGIN"));

    let listener = tokio::net::TcpListener::bind(config.addr)
        .await
        .expect("Failed to bind listener");
    info!(addr = %config.addr, "Bergen dashboard listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(cancel.clone()))
        .await
        .expect("Server error");

    cancel.cancel();
    let state = refresh_task.await.expect("Refresh task panicked");
    info!(?state, "bike refresh stopped");
    import_task.await.expect("Import task panicked");
}

/// Resolves on ctrl-c, cancelling background work.
async fn shutdown_signal(cancel: CancellationToken) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for ctrl-c");
        cancel.cancelled().await;
    }
    info!("shutting down");
    cancel.cancel();
}
