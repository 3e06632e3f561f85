use async_trait::async_trait;

use crate::application::error::ApplicationError;

#[async_trait]
pub trait AuthValidator: Send + Sync {
    /// `Unauthorized` when the token is rejected, `InternalError` when the
    /// validator cannot be reached.
    async fn validate(&self, token: &str) -> Result<(), ApplicationError>;
}
