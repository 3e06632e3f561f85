use std::sync::Arc;

use axum::{extract::State, Json};
use tracing::{error, info};

use crate::{
    adapters::dto::file_dto::MessageResponse,
    application::{error::ApplicationError, services::StorageHandler},
};

pub struct HealthController;

impl HealthController {
    /// GET /health
    /// Unauthenticated; reports whether the storage collaborator answers.
    pub async fn health_check(
        State(storage): State<Arc<dyn StorageHandler>>,
    ) -> Result<Json<MessageResponse>, ApplicationError> {
        if let Err(e) = storage.ping().await {
            error!("Health check failed to reach storage: {}", e);
            return Err(ApplicationError::InternalError(
                "API is running but unable to connect to database".to_string(),
            ));
        }

        info!("Health check requested");
        Ok(Json(MessageResponse::new(
            "API is running and connected to database",
        )))
    }
}
