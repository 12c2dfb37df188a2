//! Mail-transport seam.
//!
//! The workflow only sees [`MailTransport`]; [`GmailTransport`] is the
//! production implementation over the Gmail REST API.

mod gmail;

pub use gmail::{DEFAULT_API_BASE, GmailTransport};

use async_trait::async_trait;
use draftly_mime::ReplyContext;
use draftly_oauth::INVALID_GRANT;
use serde::{Deserialize, Serialize};

use crate::credential::Credential;

/// Errors reported by a mail transport.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The provider reported the grant behind the access token dead.
    #[error("invalid_grant: {0}")]
    InvalidGrant(String),

    /// The access token was rejected (usually stale).
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// The API answered with a non-success status.
    #[error("API error ({status}): {body}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Response body.
        body: String,
    },

    /// The credential carries no access token.
    #[error("No access token available")]
    MissingAccessToken,

    /// A message id that cannot be used in a request path.
    #[error("Invalid message id: {0:?}")]
    InvalidMessageId(String),

    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The outgoing message could not be built.
    #[error("Message error: {0}")]
    Message(#[from] draftly_mime::Error),

    /// The API answered with something unexpected.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl TransportError {
    /// Returns true if the failure signals a revoked or invalid grant.
    #[must_use]
    pub fn is_invalid_grant(&self) -> bool {
        match self {
            Self::InvalidGrant(_) => true,
            Self::Unauthorized(body) | Self::Api { body, .. } => body.contains(INVALID_GRANT),
            _ => false,
        }
    }
}

/// What the transport returned for a dispatched message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentReceipt {
    /// Transport id of the new message.
    pub message_id: String,
    /// Thread the message landed in.
    pub thread_id: Option<String>,
}

/// The parts of an inbound message needed to reply to it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageDetails {
    /// Transport id.
    pub id: String,
    /// Transport thread id.
    pub thread_id: Option<String>,
    /// `From` header.
    pub from: Option<String>,
    /// `Subject` header.
    pub subject: Option<String>,
    /// `Message-ID` header.
    pub message_id_header: Option<String>,
    /// `References` header.
    pub references_header: Option<String>,
    /// Readable body text.
    pub body_text: String,
}

impl MessageDetails {
    /// Header fields used to address and thread a reply.
    #[must_use]
    pub fn reply_context(&self) -> ReplyContext {
        ReplyContext {
            from: self.from.clone(),
            subject: self.subject.clone(),
            message_id: self.message_id_header.clone(),
            references: self.references_header.clone(),
        }
    }
}

/// Outbound mail operations, authorized by a [`Credential`].
#[async_trait]
pub trait MailTransport: Send + Sync {
    /// Send a new plain-text message.
    async fn send_email(
        &self,
        credential: &Credential,
        to: &str,
        subject: &str,
        body: &str,
    ) -> Result<SentReceipt, TransportError>;

    /// Reply to `original`, threaded with it.
    async fn send_reply(
        &self,
        credential: &Credential,
        original: &MessageDetails,
        body: &str,
    ) -> Result<SentReceipt, TransportError>;

    /// Fetch headers and body text of a message.
    async fn fetch_message_details(
        &self,
        credential: &Credential,
        message_id: &str,
    ) -> Result<MessageDetails, TransportError>;
}
