//! Attempt ledger: one row per physical send try.

mod model;
pub mod repository;

pub use model::{SendAttempt, SendStatus};
