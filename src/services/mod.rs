mod error;
mod http_auth_validator;

pub use error::{AuthError, StorageError};
pub use http_auth_validator::HttpAuthValidator;

use std::sync::Arc;

use crate::{application::services::AuthValidator, domain::config::settings::AuthSettings};

pub fn create_auth_validator(settings: &AuthSettings) -> Result<Arc<dyn AuthValidator>, AuthError> {
    let validator = HttpAuthValidator::new(settings)?;
    Ok(Arc::new(validator))
}
