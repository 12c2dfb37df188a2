//! Credential refresher.

use std::sync::Arc;

use async_trait::async_trait;
use draftly_oauth::{OAuthClient, Token};
use tracing::{debug, info, warn};

use super::cipher::{PlaintextCipher, SecretCipher};
use super::model::{AuthProvider, Credential, NewCredential};
use super::repository;
use crate::clock::Clock;
use crate::store::Store;
use crate::{Error, Result, UserId};

/// Exchanges a refresh token for a new access token at the identity provider.
#[async_trait]
pub trait TokenExchange: Send + Sync {
    /// Perform the refresh-token grant.
    async fn exchange(&self, refresh_token: &str) -> draftly_oauth::Result<Token>;
}

#[async_trait]
impl TokenExchange for OAuthClient {
    async fn exchange(&self, refresh_token: &str) -> draftly_oauth::Result<Token> {
        self.refresh_access_token(refresh_token).await
    }
}

/// Keeps stored credentials usable.
///
/// Every refresh is persisted before it is returned, so concurrent callers
/// loading the credential afterwards see the new access token.
#[derive(Clone)]
pub struct CredentialRefresher {
    store: Store,
    exchange: Arc<dyn TokenExchange>,
    cipher: Arc<dyn SecretCipher>,
    clock: Arc<dyn Clock>,
    provider: AuthProvider,
}

impl CredentialRefresher {
    /// Creates a refresher for Google credentials stored unencrypted.
    #[must_use]
    pub fn new(store: Store, exchange: Arc<dyn TokenExchange>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            exchange,
            cipher: Arc::new(PlaintextCipher),
            clock,
            provider: AuthProvider::Google,
        }
    }

    /// Uses `cipher` for refresh tokens at rest.
    #[must_use]
    pub fn with_cipher(mut self, cipher: Arc<dyn SecretCipher>) -> Self {
        self.cipher = cipher;
        self
    }

    /// Provider this refresher manages.
    #[must_use]
    pub const fn provider(&self) -> AuthProvider {
        self.provider
    }

    /// Store the token obtained from a login, replacing any previous
    /// credential for the user.
    ///
    /// # Errors
    ///
    /// Returns [`Error::RefreshFailed`] if the token has no refresh token,
    /// or a storage error.
    pub async fn save(&self, user_id: UserId, token: &Token) -> Result<Credential> {
        let refresh_token = token
            .refresh_token
            .as_deref()
            .filter(|t| !t.is_empty())
            .ok_or(draftly_oauth::Error::NoRefreshToken)?;

        let credential = NewCredential {
            user_id,
            provider: self.provider,
            access_token: Some(token.access_token.clone()),
            refresh_token_encrypted: self.cipher.encrypt(refresh_token)?,
            scope: token.scope.clone(),
            expires_at: token.expires_at,
        };

        let mut conn = self.store.acquire().await?;
        repository::save(&mut conn, &credential, self.clock.now()).await
    }

    /// Load the user's credential.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the user has no credential.
    pub async fn load(&self, user_id: UserId) -> Result<Credential> {
        let mut conn = self.store.acquire().await?;
        repository::find(&mut conn, user_id, self.provider)
            .await?
            .ok_or_else(|| Error::not_found("credential", user_id))
    }

    /// Returns `credential` unchanged if its access token is still valid,
    /// otherwise refreshes it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CredentialRevoked`] for a revoked credential, or any
    /// error from [`Self::refresh`].
    pub async fn ensure_valid(&self, credential: &Credential) -> Result<Credential> {
        if credential.is_revoked() {
            return Err(Error::CredentialRevoked(credential.user_id));
        }
        if !credential.needs_refresh(self.clock.now()) {
            return Ok(credential.clone());
        }
        debug!(user_id = %credential.user_id, "access token expired");
        self.refresh(credential).await
    }

    /// Exchange the stored refresh token for a new access token and persist
    /// the result.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CredentialRevoked`] for a revoked credential,
    /// [`Error::RefreshFailed`] if the provider rejects the exchange, or a
    /// storage error.
    pub async fn refresh(&self, credential: &Credential) -> Result<Credential> {
        if credential.is_revoked() {
            return Err(Error::CredentialRevoked(credential.user_id));
        }

        let refresh_token = self.cipher.decrypt(&credential.refresh_token_encrypted)?;
        let token = self.exchange.exchange(&refresh_token).await.map_err(|e| {
            warn!(user_id = %credential.user_id, error = %e, "credential refresh failed");
            Error::RefreshFailed(e)
        })?;

        let mut refreshed = credential.clone();
        refreshed.access_token = Some(token.access_token);
        refreshed.expires_at = token.expires_at;
        if token.scope.is_some() {
            refreshed.scope = token.scope;
        }
        if let Some(rotated) = token.refresh_token.as_deref().filter(|t| !t.is_empty()) {
            refreshed.refresh_token_encrypted = self.cipher.encrypt(rotated)?;
        }

        let now = self.clock.now();
        let mut conn = self.store.acquire().await?;
        repository::update_tokens(&mut conn, &refreshed, now).await?;
        refreshed.updated_at = now;

        info!(
            user_id = %credential.user_id,
            expires_at = ?refreshed.expires_at,
            "refreshed credential"
        );
        Ok(refreshed)
    }

    /// Mark the user's credential revoked so it is never refreshed again.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn revoke(&self, user_id: UserId) -> Result<()> {
        let mut conn = self.store.acquire().await?;
        if repository::mark_revoked(&mut conn, user_id, self.provider, self.clock.now()).await? {
            warn!(user_id = %user_id, "credential revoked, user must sign in again");
        }
        Ok(())
    }
}
