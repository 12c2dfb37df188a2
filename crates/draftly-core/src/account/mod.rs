//! Users and their drafting preferences.

mod model;
pub mod repository;

pub use model::{User, UserId, UserPreference};
