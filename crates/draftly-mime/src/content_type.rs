//! `Content-Type` values of message parts.

use std::fmt;

use crate::error::{Error, Result};

/// A parsed `type/subtype; key=value` header value.
///
/// Type, subtype and parameter names are lowercased; parameter values keep
/// their case and order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentType {
    /// Top-level type, such as `text` or `multipart`.
    pub main_type: String,
    /// Subtype, such as `plain` or `alternative`.
    pub sub_type: String,
    /// Parameters in header order.
    pub parameters: Vec<(String, String)>,
}

impl ContentType {
    /// `text/plain; charset=utf-8`, the type of every outgoing draft.
    #[must_use]
    pub fn text_plain() -> Self {
        Self {
            main_type: "text".into(),
            sub_type: "plain".into(),
            parameters: vec![("charset".into(), "utf-8".into())],
        }
    }

    /// Value of the parameter `name` (case-insensitive).
    #[must_use]
    pub fn parameter(&self, name: &str) -> Option<&str> {
        self.parameters
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// True for `text/plain`.
    #[must_use]
    pub fn is_plain_text(&self) -> bool {
        self.is("text", "plain")
    }

    /// True for `text/html`.
    #[must_use]
    pub fn is_html(&self) -> bool {
        self.is("text", "html")
    }

    /// True for any `multipart/*`.
    #[must_use]
    pub fn is_multipart(&self) -> bool {
        self.main_type == "multipart"
    }

    fn is(&self, main_type: &str, sub_type: &str) -> bool {
        self.main_type == main_type && self.sub_type == sub_type
    }

    /// Parse a header value. Parameters without `=` are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidContentType`] if the value has no
    /// `type/subtype` pair.
    pub fn parse(value: &str) -> Result<Self> {
        let invalid = || Error::InvalidContentType(value.to_string());

        let mut segments = value.split(';');
        let essence = segments.next().map(str::trim).unwrap_or_default();
        let (main_type, sub_type) = essence.split_once('/').ok_or_else(invalid)?;
        let (main_type, sub_type) = (main_type.trim(), sub_type.trim());
        if main_type.is_empty() || sub_type.is_empty() {
            return Err(invalid());
        }

        let parameters = segments
            .filter_map(|segment| segment.split_once('='))
            .map(|(key, val)| {
                (
                    key.trim().to_ascii_lowercase(),
                    val.trim().trim_matches('"').to_string(),
                )
            })
            .collect();

        Ok(Self {
            main_type: main_type.to_ascii_lowercase(),
            sub_type: sub_type.to_ascii_lowercase(),
            parameters,
        })
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.main_type, self.sub_type)?;
        for (key, value) in &self.parameters {
            let needs_quotes = value
                .chars()
                .any(|c| c.is_whitespace() || "()<>@,;:\\\"/[]?=".contains(c));
            if needs_quotes {
                write!(f, "; {key}=\"{value}\"")?;
            } else {
                write!(f, "; {key}={value}")?;
            }
        }
        Ok(())
    }
}
