mod adapters;
mod application;
mod domain;
mod services;
#[cfg(test)]
mod test_utils;

use std::{future::IntoFuture, sync::Arc, time::Duration};

use adapters::{
    repositories::PgStorageHandler,
    router::{build_router, with_request_limits},
    state::AppState,
};
use application::services::StorageHandler;
use domain::config::settings::Settings;
use tokio::sync::watch;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let settings = Settings::from_env().expect("ERROR: invalid configuration");

    tracing::info!(
        "Starting content-service with database '{}' and collection '{}'",
        settings.store.database,
        settings.store.file_collection
    );

    // Configure CORS
    let cors = if let Some(allowed_origins) = &settings.cors_allowed_origins {
        let origins: Vec<_> = allowed_origins
            .iter()
            .map(|s| s.parse().expect("Invalid CORS origin"))
            .collect();
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        // Allow all origins if not specified (only for development)
        CorsLayer::permissive()
    };

    tracing::info!("Connecting to database...");
    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(settings.store.max_connections)
        .acquire_timeout(Duration::from_secs(30))
        .connect(&settings.store.database_url)
        .await
        .expect("ERROR: Failed to connect to PostgreSQL database. Check DATABASE_URL and network connectivity.");
    tracing::info!("Database connection established");

    let storage_handler = PgStorageHandler::new(pool, &settings.store);
    storage_handler
        .ensure_schema()
        .await
        .expect("Failed to prepare storage tables");

    let auth_validator =
        services::create_auth_validator(&settings.auth).expect("Failed to create auth validator");

    let app_state = AppState {
        storage_handler: Arc::new(storage_handler) as Arc<dyn StorageHandler>,
        auth_validator,
    };

    let router = with_request_limits(
        build_router(app_state),
        settings.request_timeout,
        settings.max_upload_bytes,
    )
    .layer(TraceLayer::new_for_http())
    .layer(cors);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", settings.port))
        .await
        .expect("Failed to bind to port");

    tracing::info!("Server listening on 0.0.0.0:{}", settings.port);

    let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
    let server = axum::serve(listener, router).with_graceful_shutdown(async move {
        shutdown_signal().await;
        let _ = shutdown_tx.send(true);
    });

    let shutdown_timeout = settings.shutdown_timeout;
    let drain_deadline = async move {
        if shutdown_rx.changed().await.is_err() {
            // Sender dropped without a signal: the server already stopped.
            std::future::pending::<()>().await;
        }
        tokio::time::sleep(shutdown_timeout).await;
    };

    tokio::select! {
        result = server.into_future() => {
            result.expect("Failed to start server");
            tracing::info!("Server stopped");
        }
        _ = drain_deadline => {
            tracing::warn!(
                "In-flight requests still running after {:?}, shutting down anyway",
                shutdown_timeout
            );
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, draining connections");
}
