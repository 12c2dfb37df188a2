//! Encoding helpers.
//!
//! Base64 for MIME bodies, unpadded-tolerant Base64url for HTTP mail APIs,
//! and RFC 2047 encoded-words for non-ASCII header values.

use crate::error::Result;
use base64::Engine;
use base64::engine::general_purpose::{STANDARD, URL_SAFE, URL_SAFE_NO_PAD};

/// Encodes data as Base64.
#[must_use]
pub fn encode_base64(data: &[u8]) -> String {
    STANDARD.encode(data)
}

/// Encodes data as padded Base64url (the `raw` format of the Gmail API).
#[must_use]
pub fn encode_base64url(data: &[u8]) -> String {
    URL_SAFE.encode(data)
}

/// Decodes Base64url data, with or without padding.
///
/// # Errors
///
/// Returns an error if the input is not valid Base64url.
pub fn decode_base64url(data: &str) -> Result<Vec<u8>> {
    let trimmed = data.trim().trim_end_matches('=');
    URL_SAFE_NO_PAD.decode(trimmed).map_err(Into::into)
}

/// Decodes Base64url data into UTF-8 text, replacing invalid sequences.
///
/// # Errors
///
/// Returns an error if the input is not valid Base64url.
pub fn decode_base64url_text(data: &str) -> Result<String> {
    let bytes = decode_base64url(data)?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Encodes a header value using RFC 2047 encoding.
///
/// Format: `=?charset?B?encoded-text?=`. Pure ASCII values without `=` or `?`
/// are returned unchanged.
#[must_use]
pub fn encode_rfc2047(text: &str, charset: &str) -> String {
    if text.chars().all(|c| c.is_ascii() && c != '=' && c != '?') {
        return text.to_string();
    }

    let encoded = encode_base64(text.as_bytes());
    format!("=?{charset}?B?{encoded}?=")
}
