//! Drafts: the central entity of the triage workflow.
//!
//! A draft is a candidate reply owned by one user. Its lifecycle status is
//! only ever advanced by the workflow engine; this module holds the model and
//! the row-level storage functions the engine composes into transactions.

mod model;
pub mod repository;

pub use model::{Draft, DraftId, DraftStatus, NewDraft};
