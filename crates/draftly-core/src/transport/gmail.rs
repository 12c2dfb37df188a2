//! Gmail REST transport.

use async_trait::async_trait;
use draftly_mime::encoding::decode_base64url_text;
use draftly_mime::{BodyPart, OutgoingMessage};
use draftly_oauth::INVALID_GRANT;
use reqwest::{Client, Response};
use serde::Deserialize;
use tracing::debug;

use super::{MailTransport, MessageDetails, SentReceipt, TransportError};
use crate::credential::Credential;

/// Default Gmail API root.
pub const DEFAULT_API_BASE: &str = "https://gmail.googleapis.com/gmail/v1";

/// [`MailTransport`] over the Gmail REST API.
#[derive(Debug, Clone)]
pub struct GmailTransport {
    client: Client,
    base_url: String,
}

impl Default for GmailTransport {
    fn default() -> Self {
        Self::new(DEFAULT_API_BASE)
    }
}

impl GmailTransport {
    /// Creates a transport against `api_base` (e.g. `https://gmail.googleapis.com/gmail/v1`).
    #[must_use]
    pub fn new(api_base: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: format!("{}/users/me", api_base.trim_end_matches('/')),
        }
    }

    /// Uses a preconfigured HTTP client (timeouts, proxies).
    #[must_use]
    pub fn with_http_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }

    async fn send_message(
        &self,
        credential: &Credential,
        message: &OutgoingMessage,
        thread_id: Option<&str>,
    ) -> Result<SentReceipt, TransportError> {
        let token = access_token(credential)?;
        let request = SendRequest {
            raw: message.to_base64url()?,
            thread_id,
        };

        let response = self
            .client
            .post(format!("{}/messages/send", self.base_url))
            .bearer_auth(token)
            .json(&request)
            .send()
            .await?;

        let sent: SendResponse = check(response).await?.json().await?;
        debug!(message_id = %sent.id, "gmail accepted message");
        Ok(SentReceipt {
            message_id: sent.id,
            thread_id: sent.thread_id,
        })
    }
}

#[async_trait]
impl MailTransport for GmailTransport {
    async fn send_email(
        &self,
        credential: &Credential,
        to: &str,
        subject: &str,
        body: &str,
    ) -> Result<SentReceipt, TransportError> {
        let message = OutgoingMessage::new(to, subject, body);
        self.send_message(credential, &message, None).await
    }

    async fn send_reply(
        &self,
        credential: &Credential,
        original: &MessageDetails,
        body: &str,
    ) -> Result<SentReceipt, TransportError> {
        let message = OutgoingMessage::reply_to(&original.reply_context(), body);
        self.send_message(credential, &message, original.thread_id.as_deref())
            .await
    }

    async fn fetch_message_details(
        &self,
        credential: &Credential,
        message_id: &str,
    ) -> Result<MessageDetails, TransportError> {
        if message_id.is_empty() || message_id.contains(['/', '\\', '?', '#']) {
            return Err(TransportError::InvalidMessageId(message_id.to_string()));
        }
        let token = access_token(credential)?;

        let response = self
            .client
            .get(format!("{}/messages/{message_id}", self.base_url))
            .bearer_auth(token)
            .query(&[("format", "full")])
            .send()
            .await?;

        let message: GmailMessage = check(response).await?.json().await?;
        Ok(message.into_details())
    }
}

fn access_token(credential: &Credential) -> Result<&str, TransportError> {
    credential
        .access_token()
        .ok_or(TransportError::MissingAccessToken)
}

async fn check(response: Response) -> Result<Response, TransportError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(classify(status.as_u16(), body))
}

/// Maps a failed Gmail response to a transport error.
fn classify(status: u16, body: String) -> TransportError {
    match status {
        400 | 401 if body.contains(INVALID_GRANT) => TransportError::InvalidGrant(body),
        401 => TransportError::Unauthorized(body),
        _ => TransportError::Api { status, body },
    }
}

#[derive(Debug, serde::Serialize)]
#[serde(rename_all = "camelCase")]
struct SendRequest<'a> {
    raw: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    thread_id: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SendResponse {
    id: String,
    #[serde(default)]
    thread_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GmailMessage {
    id: String,
    #[serde(default)]
    thread_id: Option<String>,
    #[serde(default)]
    payload: Option<GmailPart>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GmailPart {
    #[serde(default)]
    mime_type: String,
    #[serde(default)]
    headers: Vec<GmailHeader>,
    #[serde(default)]
    body: Option<GmailBody>,
    #[serde(default)]
    parts: Vec<GmailPart>,
}

#[derive(Debug, Deserialize)]
struct GmailHeader {
    name: String,
    value: String,
}

#[derive(Debug, Deserialize)]
struct GmailBody {
    #[serde(default)]
    data: Option<String>,
}

impl GmailMessage {
    fn into_details(self) -> MessageDetails {
        let payload = self.payload.unwrap_or_default();
        MessageDetails {
            id: self.id,
            thread_id: self.thread_id,
            from: payload.header("From"),
            subject: payload.header("Subject"),
            message_id_header: payload.header("Message-ID"),
            references_header: payload.header("References"),
            body_text: payload.to_body_part().extract_text(),
        }
    }
}

impl GmailPart {
    fn header(&self, name: &str) -> Option<String> {
        self.headers
            .iter()
            .find(|h| h.name.eq_ignore_ascii_case(name))
            .map(|h| h.value.clone())
    }

    fn to_body_part(&self) -> BodyPart {
        let mime_type = self.mime_type.to_ascii_lowercase();
        if let Some(subtype) = mime_type.strip_prefix("multipart/") {
            return BodyPart::multipart(
                subtype,
                self.parts.iter().map(Self::to_body_part).collect(),
            );
        }

        let text = self
            .body
            .as_ref()
            .and_then(|b| b.data.as_deref())
            .and_then(|data| decode_base64url_text(data).ok())
            .unwrap_or_default();
        BodyPart::leaf(mime_type, text)
    }
}
