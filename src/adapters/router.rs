use std::time::Duration;

use axum::{
    extract::DefaultBodyLimit,
    http::StatusCode,
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::timeout::TimeoutLayer;

use crate::adapters::{
    controllers::{file_controller::FileController, health_controller::HealthController},
    middleware::require_bearer_token,
    state::AppState,
};

pub fn build_router(app_state: AppState) -> Router {
    // Routes that require `Authorization: Bearer <token>`
    let protected_routes = Router::new()
        .route("/upload", post(FileController::upload_file))
        .route(
            "/file/{id}",
            get(FileController::download_file)
                .delete(FileController::delete_file)
                .put(FileController::update_file_info),
        )
        .route("/files", get(FileController::get_files))
        .route_layer(middleware::from_fn_with_state(
            app_state.clone(),
            require_bearer_token,
        ));

    let public_routes = Router::new().route("/health", get(HealthController::health_check));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(app_state)
}

/// Body size cap and per-request deadline shared by every route.
pub fn with_request_limits(
    router: Router,
    request_timeout: Duration,
    max_body_bytes: usize,
) -> Router {
    router
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            request_timeout,
        ))
}
