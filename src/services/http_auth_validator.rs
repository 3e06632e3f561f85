use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, warn};

use crate::{
    application::{error::ApplicationError, services::AuthValidator},
    domain::config::settings::AuthSettings,
    services::error::AuthError,
};

/// Validates bearer tokens against the login service. Any 2xx answer means
/// the token is valid.
pub struct HttpAuthValidator {
    client: Client,
    login_service_url: String,
}

impl HttpAuthValidator {
    pub fn new(settings: &AuthSettings) -> Result<Self, AuthError> {
        let client = Client::builder().timeout(settings.timeout).build()?;

        Ok(Self {
            client,
            login_service_url: settings.login_service_url.clone(),
        })
    }
}

#[async_trait]
impl AuthValidator for HttpAuthValidator {
    async fn validate(&self, token: &str) -> Result<(), ApplicationError> {
        let response = self
            .client
            .get(&self.login_service_url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(AuthError::from)?;

        let status = response.status();
        if status.is_success() {
            debug!("Token accepted by login service");
            return Ok(());
        }

        let error_text = response.text().await.unwrap_or_default();
        warn!("Login service rejected token with status {}", status);
        Err(AuthError::Rejected(format!("status {}: {}", status, error_text.trim())).into())
    }
}
