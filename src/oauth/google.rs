use chrono::{DateTime, Utc};
use oauth2::basic::BasicClient;
use oauth2::{AuthUrl, ClientId, ClientSecret, RefreshToken, TokenResponse, TokenUrl};

use crate::error::ApiError;

const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

pub struct RefreshedToken {
    pub access_token: String,
    pub expires_at: DateTime<Utc>,
}

/// Refreshes Google Cloud Code credentials. Each row in `google_credentials`
/// carries its own `client_id`/`client_secret` (the pool spans credentials
/// registered under different OAuth apps), so the client is built fresh per
/// call rather than held as shared state.
#[derive(Clone)]
pub struct GoogleOauthClient {
    http: reqwest::Client,
}

impl GoogleOauthClient {
    pub fn new(http: reqwest::Client) -> Self {
        Self { http }
    }

    pub async fn refresh(
        &self,
        client_id: &str,
        client_secret: &str,
        refresh_token: &str,
    ) -> Result<RefreshedToken, ApiError> {
        let client = BasicClient::new(ClientId::new(client_id.to_string()))
            .set_client_secret(ClientSecret::new(client_secret.to_string()))
            .set_auth_uri(
                AuthUrl::new(GOOGLE_AUTH_URL.to_string())
                    .map_err(|e| ApiError::internal(format!("invalid auth url: {e}")))?,
            )
            .set_token_uri(
                TokenUrl::new(GOOGLE_TOKEN_URL.to_string())
                    .map_err(|e| ApiError::internal(format!("invalid token url: {e}")))?,
            );

        let response = client
            .exchange_refresh_token(&RefreshToken::new(refresh_token.to_string()))
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
