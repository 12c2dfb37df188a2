//! # draftly-core
//!
//! Core business logic for the Draftly reply-triage engine.
//!
//! This crate provides:
//! - Draft lifecycle (generate, edit, approve, reject, send)
//! - **Idempotent send protocol** - attempt ledger plus sent-record witness
//! - Audit log of every lifecycle transition
//! - Credential storage and refresh
//! - Retry scheduler for approved and failed drafts
//! - Local storage (`SQLite`)

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod account;
pub mod audit;
pub mod clock;
pub mod config;
pub mod credential;
pub mod draft;
mod error;
pub mod executor;
pub mod generator;
pub mod ledger;
pub mod scheduler;
pub mod sent;
pub mod store;
pub mod transport;
pub mod workflow;

pub use account::{User, UserId, UserPreference};
pub use audit::{Actor, DraftAction, DraftLog};
pub use clock::{Clock, MockClock, SystemClock};
pub use config::Config;
pub use credential::{Credential, CredentialRefresher, NewCredential, TokenExchange};
pub use draft::{Draft, DraftId, DraftStatus};
pub use error::{Error, Result};
pub use executor::SendExecutor;
pub use generator::{ContentGenerator, GenerationError};
pub use ledger::{SendAttempt, SendStatus};
pub use scheduler::{RetryScheduler, SkipReason, SweepOutcome, SweepReport};
pub use sent::SentMessage;
pub use store::Store;
pub use transport::{MailTransport, MessageDetails, SentReceipt, TransportError};
pub use workflow::{DraftWorkflow, GenerateRequest, SendOutcome};
