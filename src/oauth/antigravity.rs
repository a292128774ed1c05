use chrono::Utc;
use oauth2::basic::BasicClient;
use oauth2::{AuthUrl, ClientId, ClientSecret, RefreshToken, Scope, TokenResponse, TokenUrl};

use crate::config::AntigravityResolvedConfig;
use crate::error::ApiError;

use super::RefreshedToken;

/// Refreshes Antigravity tokens. Unlike Google Cloud Code, all Antigravity
/// tokens share one OAuth app (configured once in `providers.antigravity`),
/// so the client is built once and reused.
#[derive(Clone)]
pub struct AntigravityOauthClient {
    http: reqwest::Client,
    client: BasicClient<
        oauth2::EndpointSet,
        oauth2::EndpointNotSet,
        oauth2::EndpointNotSet,
        oauth2::EndpointNotSet,
        oauth2::EndpointSet,
    >,
}

impl AntigravityOauthClient {
    pub fn new(http: reqwest::Client, config: &AntigravityResolvedConfig) -> Result<Self, ApiError> {
        let client = BasicClient::new(ClientId::new(config.oauth_client_id.clone()))
            .set_client_secret(ClientSecret::new(config.oauth_client_secret.clone()))
            .set_auth_uri(
                AuthUrl::new(config.oauth_auth_url.to_string())
                    .map_err(|e| ApiError::internal(format!("invalid auth url: {e}")))?,
            )
            .set_token_uri(
                TokenUrl::new(config.oauth_token_url.to_string())
                    .map_err(|e| ApiError::internal(format!("invalid token url: {e}")))?,
            );
        Ok(Self { http, client })
    }

    pub async fn refresh(&self, refresh_token: &str) -> Result<RefreshedToken, ApiError> {
        let response = self
            .client
            .exchange_refresh_token(&RefreshToken::new(refresh_token.to_string()))
            .add_scope(Scope::new(
                "https://www.googleapis.com/auth/cloud-platform".to_string(),
            ))
            .request_async(&self.http)
            .await?;

        let expires_in = response
            .expires_in()
            .unwrap_or(std::time::Duration::from_secs(3600));
        let expires_at = Utc::now() + chrono::Duration::from_std(expires_in).unwrap_or_default();

        Ok(RefreshedToken {
            access_token: response.access_token().secret().clone(),
            expires_at,
        })
    }
}
