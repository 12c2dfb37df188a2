//! Outgoing plain-text messages.

use std::fmt::Write;

use crate::content_type::ContentType;
use crate::encoding::{encode_base64url, encode_rfc2047};
use crate::error::{Error, Result};
use crate::reply::{ReplyContext, extract_address, reply_subject, thread_references};

/// A plain-text email message to send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMessage {
    /// Recipient address.
    pub to: String,
    /// Subject line.
    pub subject: String,
    /// Plain text body.
    pub body: String,
    /// `In-Reply-To` header for replies.
    pub in_reply_to: Option<String>,
    /// `References` header for replies.
    pub references: Option<String>,
}

impl OutgoingMessage {
    /// Creates a new message.
    #[must_use]
    pub fn new(to: impl Into<String>, subject: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            to: to.into(),
            subject: subject.into(),
            body: body.into(),
            in_reply_to: None,
            references: None,
        }
    }

    /// Creates a reply to `original`: addressed to its sender, `Re:` subject,
    /// threaded through `In-Reply-To` and `References` when it has a
    /// `Message-ID`.
    #[must_use]
    pub fn reply_to(original: &ReplyContext, body: impl Into<String>) -> Self {
        let to = original.from.as_deref().map(extract_address).unwrap_or_default();
        let mut message = Self::new(to, reply_subject(original.subject.as_deref()), body);

        if let Some(message_id) = original
            .message_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
        {
            message.in_reply_to = Some(message_id.to_string());
            message.references = Some(thread_references(
                original.references.as_deref(),
                message_id,
            ));
        }

        message
    }

    /// Renders the RFC 5322 message text.
    ///
    /// # Errors
    ///
    /// Returns an error if there is no recipient or a header value contains
    /// a line break.
    pub fn to_rfc5322(&self) -> Result<String> {
        if self.to.trim().is_empty() {
            return Err(Error::MissingHeader("To".into()));
        }

        let mut message = String::new();

        write_header(&mut message, "To", &self.to)?;
        write_header(&mut message, "Subject", &encode_rfc2047(&self.subject, "utf-8"))?;
        if let Some(in_reply_to) = &self.in_reply_to {
            write_header(&mut message, "In-Reply-To", in_reply_to)?;
        }
        if let Some(references) = &self.references {
            write_header(&mut message, "References", references)?;
        }
        message.push_str("MIME-Version: 1.0\r\n");
        let _ = write!(message, "Content-Type: {}\r\n", ContentType::text_plain());
        message.push_str("Content-Transfer-Encoding: 8bit\r\n");

        // Empty line between headers and body
        message.push_str("\r\n");
        message.push_str(&self.body.replace("\r\n", "\n").replace('\n', "\r\n"));

        Ok(message)
    }

    /// Renders the message and encodes it as Base64url.
    ///
    /// # Errors
    ///
    /// Returns an error if rendering fails.
    pub fn to_base64url(&self) -> Result<String> {
        Ok(encode_base64url(self.to_rfc5322()?.as_bytes()))
    }
}

fn write_header(message: &mut String, name: &str, value: &str) -> Result<()> {
    if value.contains(['\r', '\n']) {
        return Err(Error::InvalidHeader(name.to_string()));
    }
    let _ = write!(message, "{name}: {value}\r\n");
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::encoding::decode_base64url_text;

    fn original() -> ReplyContext {
        ReplyContext {
            from: Some("Alice Example <alice@example.com>".into()),
            subject: Some("Quarterly report".into()),
            message_id: Some("<CAF123@mail.gmail.com>".into()),
            references: Some("<older@mail.gmail.com>".into()),
        }
    }

    #[test]
    fn test_new_message_rendering() {
        let raw = OutgoingMessage::new("bob@example.com", "Draftly Reply", "Line 1\nLine 2")
            .to_rfc5322()
            .unwrap();

        assert!(raw.starts_with("To: bob@example.com\r\nSubject: Draftly Reply\r\n"));
        assert!(raw.contains("Content-Type: text/plain; charset=utf-8\r\n"));
        assert!(raw.ends_with("\r\n\r\nLine 1\r\nLine 2"));
        assert!(!raw.contains("In-Reply-To"));
    }

    #[test]
    fn test_reply_threading_headers() {
        let reply = OutgoingMessage::reply_to(&original(), "Thanks!");
        assert_eq!(reply.to, "alice@example.com");
        assert_eq!(reply.subject, "Re: Quarterly report");
        assert_eq!(reply.in_reply_to.as_deref(), Some("<CAF123@mail.gmail.com>"));
        assert_eq!(
            reply.references.as_deref(),
            Some("<older@mail.gmail.com> <CAF123@mail.gmail.com>")
        );

        let raw = reply.to_rfc5322().unwrap();
        assert!(raw.contains("In-Reply-To: <CAF123@mail.gmail.com>\r\n"));
    }

    #[test]
    fn test_reply_without_message_id_is_unthreaded() {
        let mut ctx = original();
        ctx.message_id = None;
        let reply = OutgoingMessage::reply_to(&ctx, "Thanks!");
        assert!(reply.in_reply_to.is_none());
        assert!(reply.references.is_none());
    }

    #[test]
    fn test_missing_recipient() {
        let err = OutgoingMessage::new("", "s", "b").to_rfc5322().unwrap_err();
        assert!(matches!(err, Error::MissingHeader(_)));
    }

    #[test]
    fn test_header_injection_rejected() {
        let err = OutgoingMessage::new("a@example.com", "hi\r\nBcc: evil@example.com", "b")
            .to_rfc5322()
            .unwrap_err();
        assert!(matches!(err, Error::InvalidHeader(_)));
    }

    #[test]
    fn test_base64url_roundtrips_rendering() {
        let message = OutgoingMessage::new("bob@example.com", "Héllo", "Body");
        let decoded = decode_base64url_text(&message.to_base64url().unwrap()).unwrap();
        assert_eq!(decoded, message.to_rfc5322().unwrap());
        assert!(decoded.contains("Subject: =?utf-8?B?"));
    }
}
