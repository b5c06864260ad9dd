//! Axum API server binary.

use std::net::SocketAddr;

use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use tubely_api::{create_router, metrics, ApiConfig, AppState, PublishConfig};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // rustls 0.23 needs a process-wide crypto provider; an Err means one is already installed.
    let _ = rustls::crypto::ring::default_provider().install_default();

    init_tracing();

    info!("Starting tubely-api");

    let configs = ApiConfig::from_env()
        .and_then(|api| PublishConfig::from_env().map(|publish| (api, publish)));
    let (config, publish) = match configs {
        Ok(configs) => configs,
        Err(e) => {
            error!("Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };
    info!(
        host = %config.host,
        port = config.port,
        temp_dir = %publish.temp_dir.display(),
        max_upload_bytes = publish.max_upload_bytes,
        "API config loaded"
    );

    let addr: SocketAddr = match format!("{}:{}", config.host, config.port).parse() {
        Ok(addr) => addr,
        Err(e) => {
            error!("Invalid bind address {}:{}: {}", config.host, config.port, e);
            std::process::exit(1);
        }
    };

    let state = match AppState::new(config, publish).await {
        Ok(s) => s,
        Err(e) => {
            error!("Failed to create application state: {}", e);
            std::process::exit(1);
        }
    };

    let metrics_enabled = std::env::var("METRICS_ENABLED")
        .map(|v| v == "true" || v == "1")
        .unwrap_or(true);

    let metrics_handle = if metrics_enabled {
        match metrics::init_metrics() {
            Ok(handle) => {
                info!("Prometheus metrics enabled at /metrics");
                Some(handle)
            }
            Err(e) => {
                warn!("Failed to install Prometheus recorder: {}", e);
                None
            }
        }
    } else {
        None
    };

    let app = create_router(state, metrics_handle);

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind {}: {}", addr, e);
            std::process::exit(1);
        }
    };
    info!("Listening on {}", addr);

    if let Err(e) = axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    {
        error!("Server error: {}", e);
        std::process::exit(1);
    }

    info!("Server shutdown complete");
}

/// Colored output for dev, JSON when `LOG_FORMAT=json`.
fn init_tracing() {
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("tubely=info,tower_http=info"));

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_ansi(true)
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false),
            )
            .with(env_filter)
            .init();
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Received shutdown signal");
}
