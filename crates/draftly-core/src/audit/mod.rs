//! Append-only audit log of draft lifecycle transitions.

mod model;
pub mod repository;

pub use model::{Actor, DraftAction, DraftLog};
