//! # draftly-mime
//!
//! Pure message helpers used by the mail-transport client.
//!
//! ## Features
//!
//! - **Body extraction**: walk a tagged tree of message parts and pick the
//!   readable text, preferring `text/plain` leaves over HTML
//! - **Reply composition**: `Re:` subjects, recipient extraction from `From`,
//!   `In-Reply-To`/`References` threading headers
//! - **Rendering**: RFC 5322 text for outgoing plain-text messages, ready to be
//!   Base64url-encoded for HTTP mail APIs
//!
//! ## Quick Start
//!
//! ```ignore
//! use draftly_mime::{BodyPart, OutgoingMessage, ReplyContext};
//!
//! let tree = BodyPart::multipart("alternative", vec![
//!     BodyPart::leaf("text/html", "<p>Hi <b>there</b></p>"),
//!     BodyPart::leaf("text/plain", "Hi there"),
//! ]);
//! assert_eq!(tree.extract_text(), "Hi there");
//!
//! let original = ReplyContext {
//!     from: Some("Alice <alice@example.com>".into()),
//!     subject: Some("Lunch".into()),
//!     message_id: Some("<abc@mail.example.com>".into()),
//!     references: None,
//! };
//! let reply = OutgoingMessage::reply_to(&original, "Sounds good!");
//! let raw = reply.to_base64url()?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod body;
mod compose;
mod content_type;
mod error;
mod reply;

pub mod encoding;

pub use body::{BodyPart, strip_html};
pub use compose::OutgoingMessage;
pub use content_type::ContentType;
pub use error::{Error, Result};
pub use reply::{ReplyContext, extract_address, reply_subject, thread_references};
