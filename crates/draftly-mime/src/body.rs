//! Message body trees and readable-text extraction.

use crate::content_type::ContentType;

/// One node of a message body, already transfer-decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BodyPart {
    /// A single-part body with its declared content type.
    Leaf {
        /// Raw `Content-Type` value (e.g. `text/plain; charset=utf-8`).
        content_type: String,
        /// Decoded text content.
        text: String,
    },
    /// A multipart container (`multipart/<subtype>`).
    Multipart {
        /// Multipart subtype (e.g. `alternative`, `mixed`).
        subtype: String,
        /// Child parts in message order.
        parts: Vec<BodyPart>,
    },
}

impl BodyPart {
    /// Creates a leaf part.
    #[must_use]
    pub fn leaf(content_type: impl Into<String>, text: impl Into<String>) -> Self {
        Self::Leaf {
            content_type: content_type.into(),
            text: text.into(),
        }
    }

    /// Creates a multipart container.
    #[must_use]
    pub fn multipart(subtype: impl Into<String>, parts: Vec<Self>) -> Self {
        Self::Multipart {
            subtype: subtype.into(),
            parts,
        }
    }

    /// Returns the readable text of this body.
    ///
    /// The first non-blank `text/plain` leaf (depth-first, in message order)
    /// wins. Without one, the first non-blank `text/html` leaf is returned with
    /// its markup stripped. Anything else yields an empty string.
    #[must_use]
    pub fn extract_text(&self) -> String {
        if let Some(plain) = self.find_leaf(ContentType::is_plain_text) {
            return plain.to_string();
        }

        self.find_leaf(ContentType::is_html)
            .map(strip_html)
            .unwrap_or_default()
    }

    fn find_leaf(&self, accept: fn(&ContentType) -> bool) -> Option<&str> {
        match self {
            Self::Leaf { content_type, text } => ContentType::parse(content_type)
                .ok()
                .filter(|ct| accept(ct))
                .map(|_| text.as_str())
                .filter(|text| !text.trim().is_empty()),
            Self::Multipart { parts, .. } => parts.iter().find_map(|part| part.find_leaf(accept)),
        }
    }
}

/// Strips HTML tags and collapses whitespace.
///
/// Tags become a single space; common character entities are decoded.
#[must_use]
pub fn strip_html(html: &str) -> String {
    let mut text = String::with_capacity(html.len());
    let mut in_tag = false;

    for c in html.chars() {
        match c {
            '<' => {
                in_tag = true;
                text.push(' ');
            }
            '>' if in_tag => in_tag = false,
            _ if !in_tag => text.push(c),
            _ => {}
        }
    }

    let decoded = decode_entities(&text);
    decoded.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn decode_entities(text: &str) -> String {
    text.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_plain_leaf() {
        let part = BodyPart::leaf("text/plain; charset=utf-8", "Hello there");
        assert_eq!(part.extract_text(), "Hello there");
    }

    #[test]
    fn test_plain_preferred_over_earlier_html() {
        let part = BodyPart::multipart(
            "alternative",
            vec![
                BodyPart::leaf("text/html", "<p>Hello <b>HTML</b></p>"),
                BodyPart::leaf("text/plain", "Hello plain"),
            ],
        );
        assert_eq!(part.extract_text(), "Hello plain");
    }

    #[test]
    fn test_nested_plain_found() {
        let part = BodyPart::multipart(
            "mixed",
            vec![
                BodyPart::leaf("application/pdf", "%PDF"),
                BodyPart::multipart(
                    "related",
                    vec![BodyPart::multipart(
                        "alternative",
                        vec![BodyPart::leaf("text/plain", "deep text")],
                    )],
                ),
            ],
        );
        assert_eq!(part.extract_text(), "deep text");
    }

    #[test]
    fn test_html_fallback_is_stripped() {
        let part = BodyPart::multipart(
            "alternative",
            vec![
                BodyPart::leaf("text/plain", "   \n"),
                BodyPart::leaf("text/html", "<div>Hi&nbsp;<i>Bob</i>,</div>\n<p>Q&amp;A</p>"),
            ],
        );
        assert_eq!(part.extract_text(), "Hi Bob , Q&A");
    }

    #[test]
    fn test_no_text_parts() {
        let part = BodyPart::multipart("mixed", vec![BodyPart::leaf("image/png", "....")]);
        assert_eq!(part.extract_text(), "");
    }

    #[test]
    fn test_malformed_content_type_is_skipped() {
        let part = BodyPart::multipart(
            "mixed",
            vec![
                BodyPart::leaf("garbage", "ignored"),
                BodyPart::leaf("TEXT/PLAIN", "kept"),
            ],
        );
        assert_eq!(part.extract_text(), "kept");
    }

    #[test]
    fn test_strip_html_collapses_whitespace() {
        assert_eq!(strip_html("<p>a</p>\n\n<p>b   c</p>"), "a b c");
        assert_eq!(strip_html("no tags"), "no tags");
    }

    proptest! {
        #[test]
        fn prop_strip_html_leaves_no_tags(html in "[a-z <>/]{0,64}") {
            let stripped = strip_html(&html);
            prop_assert!(!stripped.contains('<'));
            prop_assert!(!stripped.starts_with(' ') && !stripped.ends_with(' '));
        }

        #[test]
        fn prop_plain_leaf_wins_anywhere(
            html in "[a-z]{1,16}",
            plain in "[a-z]{1,16}",
            html_first in any::<bool>(),
        ) {
            let html_leaf = BodyPart::leaf("text/html", format!("<b>{html}</b>"));
            let plain_leaf = BodyPart::leaf("text/plain", plain.clone());
            let parts = if html_first {
                vec![html_leaf, plain_leaf]
            } else {
                vec![plain_leaf, html_leaf]
            };
            prop_assert_eq!(BodyPart::multipart("alternative", parts).extract_text(), plain);
        }
    }
}
