//! Draft workflow engine.
//!
//! The sole owner of draft status. Each lifecycle operation runs its writes
//! in store transactions; [`DraftWorkflow::send`] implements the at-most-once
//! send protocol on top of the attempt ledger and the sent-record store.

mod lifecycle;
mod send;

pub use lifecycle::GenerateRequest;
pub use send::SendOutcome;

use std::sync::Arc;

use crate::audit::{self, DraftLog};
use crate::clock::Clock;
use crate::config::DraftSettings;
use crate::draft::{self, Draft, DraftId, DraftStatus};
use crate::executor::SendExecutor;
use crate::generator::ContentGenerator;
use crate::ledger::{self, SendAttempt};
use crate::sent::{self, SentMessage};
use crate::store::Store;
use crate::{Result, UserId};

/// Orchestrates the draft lifecycle.
#[derive(Clone)]
pub struct DraftWorkflow {
    store: Store,
    generator: Arc<dyn ContentGenerator>,
    executor: SendExecutor,
    clock: Arc<dyn Clock>,
    settings: DraftSettings,
}

impl DraftWorkflow {
    /// Creates a workflow engine.
    #[must_use]
    pub fn new(
        store: Store,
        generator: Arc<dyn ContentGenerator>,
        executor: SendExecutor,
        clock: Arc<dyn Clock>,
        settings: DraftSettings,
    ) -> Self {
        Self {
            store,
            generator,
            executor,
            clock,
            settings,
        }
    }

    /// The store this engine writes to.
    #[must_use]
    pub const fn store(&self) -> &Store {
        &self.store
    }

    /// A user's drafts, newest first, capped at the configured list limit.
    /// An empty `statuses` slice lists every status.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list_drafts(
        &self,
        user_id: UserId,
        statuses: &[DraftStatus],
    ) -> Result<Vec<Draft>> {
        let mut conn = self.store.acquire().await?;
        draft::repository::list_for_user(&mut conn, user_id, statuses, self.settings.list_limit)
            .await
    }

    /// Load a draft.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`](crate::Error::NotFound) if the draft does not exist.
    pub async fn get_draft(&self, id: DraftId) -> Result<Draft> {
        let mut conn = self.store.acquire().await?;
        draft::repository::get(&mut conn, id).await
    }

    /// Send attempts recorded for a draft, in order.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn attempts(&self, id: DraftId) -> Result<Vec<SendAttempt>> {
        let mut conn = self.store.acquire().await?;
        ledger::repository::list_for_draft(&mut conn, id).await
    }

    /// Audit trail of a draft, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn audit_trail(&self, id: DraftId) -> Result<Vec<DraftLog>> {
        let mut conn = self.store.acquire().await?;
        audit::repository::list_for_draft(&mut conn, id).await
    }

    /// The sent record of a draft, if it was dispatched.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn sent_message(&self, id: DraftId) -> Result<Option<SentMessage>> {
        let mut conn = self.store.acquire().await?;
        sent::repository::find_for_draft(&mut conn, id).await
    }
}
