//! Amana HTTP Server binary

use amana_core::Catalogue;
use amana_server::{router, AppState, ServerConfig};
use anyhow::Context;
use std::net::SocketAddr;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let enable_otel = std::env::var("OTEL_ENABLED")
        .unwrap_or_else(|_| "false".to_string())
        .parse::<bool>()
        .unwrap_or(false);

    if enable_otel {
        amana_server::tracing::init_tracing_stack("amana-server")?;
        info!("OpenTelemetry tracing enabled");
    } else {
        amana_server::tracing::init_console()?;
        info!("Console logging enabled (set OTEL_ENABLED=true for OpenTelemetry)");
    }

    info!("Starting Amana Bookstore API v{}", env!("CARGO_PKG_VERSION"));

    let config = ServerConfig::load()?;

    amana_server::metrics::init_prometheus()?;
    amana_server::metrics::init_metrics();

    let catalogue = Catalogue::open(&config.data_dir)
        .with_context(|| format!("Failed to load catalogue from {:?}", config.data_dir))?;
    amana_server::metrics::update_catalogue_metrics(catalogue.book_count(), catalogue.review_count());

    info!(
        "Serving {} books and {} reviews from {:?} ({} API tokens)",
        catalogue.book_count(),
        catalogue.review_count(),
        config.data_dir,
        config.api_tokens.len()
    );

    let state = AppState::new(Arc::new(catalogue), config.api_tokens.clone()).with_debug(config.debug);

    let app = router(state).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(
                CorsLayer::new()
                    .allow_origin(Any)
                    .allow_methods(Any)
                    .allow_headers(Any),
            )
            .layer(CompressionLayer::new()),
    );

    let addr: SocketAddr = config
        .bind_address
        .parse()
        .with_context(|| format!("Invalid bind address {:?}", config.bind_address))?;

    info!("Amana Bookstore API is running on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;

    let shutdown_signal = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for shutdown signal: {}", e);
            std::future::pending::<()>().await;
        }
        info!("Received shutdown signal, shutting down gracefully...");
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await
        .map_err(|e| anyhow::anyhow!("Server error: {}", e))?;

    if enable_otel {
        info!("Flushing OpenTelemetry traces...");
        amana_server::tracing::shutdown_telemetry();
    }

    info!("Server shutdown complete");
    Ok(())
}
