//! Send executor.
//!
//! Wraps each outbound transport call with a single refresh-and-retry: on
//! any failure the credential is refreshed once and the call repeated once.
//! A failed refresh or a second failure is returned to the caller.

use std::future::Future;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::Result;
use crate::credential::{Credential, CredentialRefresher};
use crate::transport::{MailTransport, MessageDetails, SentReceipt, TransportError};

/// Dispatches drafts through a [`MailTransport`].
#[derive(Clone)]
pub struct SendExecutor {
    transport: Arc<dyn MailTransport>,
    refresher: CredentialRefresher,
}

impl SendExecutor {
    /// Creates an executor.
    #[must_use]
    pub fn new(transport: Arc<dyn MailTransport>, refresher: CredentialRefresher) -> Self {
        Self {
            transport,
            refresher,
        }
    }

    /// The refresher used for retries.
    #[must_use]
    pub const fn refresher(&self) -> &CredentialRefresher {
        &self.refresher
    }

    /// Send a new message. `credential` is replaced if it had to be refreshed.
    ///
    /// # Errors
    ///
    /// Returns the transport error of the retried call, or the refresh error.
    pub async fn send_new(
        &self,
        credential: &mut Credential,
        to: &str,
        subject: &str,
        body: &str,
    ) -> Result<SentReceipt> {
        let transport = &self.transport;
        self.with_retry(credential, "send_email", |cred| async move {
            transport.send_email(&cred, to, subject, body).await
        })
        .await
    }

    /// Reply to `original`. `credential` is replaced if it had to be refreshed.
    ///
    /// # Errors
    ///
    /// Returns the transport error of the retried call, or the refresh error.
    pub async fn send_reply(
        &self,
        credential: &mut Credential,
        original: &MessageDetails,
        body: &str,
    ) -> Result<SentReceipt> {
        let transport = &self.transport;
        self.with_retry(credential, "send_reply", |cred| async move {
            transport.send_reply(&cred, original, body).await
        })
        .await
    }

    /// Fetch the message a reply answers.
    ///
    /// # Errors
    ///
    /// Returns the transport error of the retried call, or the refresh error.
    pub async fn fetch_details(
        &self,
        credential: &mut Credential,
        message_id: &str,
    ) -> Result<MessageDetails> {
        let transport = &self.transport;
        self.with_retry(credential, "fetch_message_details", |cred| async move {
            transport.fetch_message_details(&cred, message_id).await
        })
        .await
    }

    async fn with_retry<T, F, Fut>(
        &self,
        credential: &mut Credential,
        operation: &'static str,
        call: F,
    ) -> Result<T>
    where
        F: Fn(Credential) -> Fut + Send + Sync,
        Fut: Future<Output = std::result::Result<T, TransportError>> + Send,
        T: Send,
    {
        let first = match call(credential.clone()).await {
            Ok(value) => return Ok(value),
            Err(e) => e,
        };

        warn!(
            user_id = %credential.user_id,
            operation,
            error = %first,
            "transport call failed, refreshing credential and retrying once"
        );
        *credential = self.refresher.refresh(credential).await?;

        let value = call(credential.clone()).await?;
        debug!(user_id = %credential.user_id, operation, "retry succeeded");
        Ok(value)
    }
}
