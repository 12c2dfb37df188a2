//! Token endpoint client.

use crate::error::{Error, Result};
use crate::provider::Provider;
use crate::token::{ErrorResponse, Token, TokenResponse};
use chrono::Utc;
use reqwest::Client;
use std::collections::HashMap;

/// Confidential `OAuth2` client able to refresh access tokens.
#[derive(Debug, Clone)]
pub struct OAuthClient {
    /// Client ID from provider.
    pub client_id: String,
    /// Client secret (optional for public clients).
    pub client_secret: Option<String>,
    /// Provider configuration.
    pub provider: Provider,
    /// HTTP client.
    http_client: Client,
}

impl OAuthClient {
    /// Creates a new OAuth client.
    #[must_use]
    pub fn new(client_id: impl Into<String>, provider: Provider) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: None,
            provider,
            http_client: Client::new(),
        }
    }

    /// Sets the client secret.
    #[must_use]
    pub fn with_client_secret(mut self, secret: impl Into<String>) -> Self {
        self.client_secret = Some(secret.into());
        self
    }

    /// Uses a preconfigured HTTP client (timeouts, proxies).
    #[must_use]
    pub fn with_http_client(mut self, http_client: Client) -> Self {
        self.http_client = http_client;
        self
    }

    /// Exchanges a refresh token for a new access token.
    ///
    /// The returned token only carries `refresh_token` when the provider
    /// rotated it; callers keep their stored refresh token otherwise.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OAuth`] when the provider rejects the exchange
    /// (`invalid_grant` for a revoked or expired grant), or a transport error.
    pub async fn refresh_access_token(&self, refresh_token: &str) -> Result<Token> {
        if refresh_token.is_empty() {
            return Err(Error::NoRefreshToken);
        }

        let mut params = HashMap::new();
        params.insert("grant_type", "refresh_token");
        params.insert("refresh_token", refresh_token);
        params.insert("client_id", &self.client_id);

        if let Some(secret) = &self.client_secret {
            params.insert("client_secret", secret);
        }

        let response = self
            .http_client
            .post(self.provider.token_url.clone())
            .form(&params)
            .send()
            .await?;

        if !response.status().is_success() {
            let body = response.text().await?;
            return Err(serde_json::from_str::<ErrorResponse>(&body)
                .map_or_else(|_| Error::InvalidResponse(body), ErrorResponse::into_error));
        }

        let token_response: TokenResponse = response.json().await?;
        Token::from_response(token_response, Utc::now())
    }
}
