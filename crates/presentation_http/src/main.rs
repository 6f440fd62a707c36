//! Parley HTTP server
//!
//! Main entry point for the chat proxy.

use std::{sync::Arc, time::Duration};

use ai_core::NvidiaClient;
use infrastructure::{AppConfig, init_telemetry};
use presentation_http::{routes, state::AppState};
use tokio::{net::TcpListener, signal};
use tower_http::{
    cors::{Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    trace::TraceLayer,
};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration first so telemetry respects the configured format
    let (config, config_err) = match AppConfig::load() {
        Ok(config) => (config, None),
        Err(e) => (AppConfig::default(), Some(e)),
    };

    init_telemetry(&config.server.log_format);

    if let Some(e) = config_err {
        tracing::warn!("Failed to load config, using defaults: {e}");
    }

    info!("Parley v{} starting...", env!("CARGO_PKG_VERSION"));
    info!(
        host = %config.server.host,
        port = %config.server.port,
        model = %config.upstream.default_model,
        environment = %config.environment,
        "Configuration loaded"
    );

    // Resolve the upstream credential once at startup
    let api_key = ai_core::resolve_api_key(&config.credentials_file);
    match &api_key {
        Some(key) => info!(hint = %ai_core::key_hint(key), "Upstream credential found"),
        None => tracing::warn!("No upstream credential configured; chat requests will fail"),
    }

    let client = NvidiaClient::new(config.upstream.clone(), api_key)
        .map_err(|e| anyhow::anyhow!("Failed to build upstream client: {e}"))?;

    let state = AppState::new(Arc::new(client));
    let app = routes::create_router(state);

    // Configure CORS layer
    let cors_layer = if config.server.allowed_origins.is_empty() {
        // Development mode: allow all origins
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        // Production mode: restrict to configured origins
        use axum::http::{HeaderValue, Method};
        let origins: Vec<HeaderValue> = config
            .server
            .allowed_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([Method::GET, Method::POST])
            .allow_headers(Any)
    };

    // Add middleware (order matters: first added = outermost)
    let mut app = app
        .layer(TraceLayer::new_for_http())
        .layer(RequestBodyLimitLayer::new(
            config.server.max_body_size_json_bytes,
        ));
    if config.server.cors_enabled {
        app = app.layer(cors_layer);
    }

    // Start server
    let addr = config.server.bind_addr();
    let listener = TcpListener::bind(&addr).await?;

    info!("Server listening on http://{addr}");

    let shutdown_timeout = Duration::from_secs(config.server.shutdown_timeout_secs);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown_timeout))
        .await?;

    info!("Server shutdown complete");

    Ok(())
}

/// Wait for shutdown signals (SIGINT, SIGTERM)
async fn shutdown_signal(timeout: Duration) {
    let ctrl_c = async {
        // Log error but continue waiting: a best-effort signal handler
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {e}");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            },
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            },
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!(
        timeout_secs = timeout.as_secs(),
        "Shutdown signal received, draining connections"
    );
}
