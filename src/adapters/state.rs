use axum::extract::FromRef;
use std::sync::Arc;

use crate::application::services::{AuthValidator, StorageHandler};

#[derive(Clone, FromRef)]
pub struct AppState {
    pub storage_handler: Arc<dyn StorageHandler>,
    pub auth_validator: Arc<dyn AuthValidator>,
}
