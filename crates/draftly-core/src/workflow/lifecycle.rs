//! Generate, edit, approve and reject.

use serde_json::json;
use tracing::{debug, info};

use super::DraftWorkflow;
use crate::account;
use crate::audit::{self, Actor, DraftAction};
use crate::draft::{self, Draft, DraftId, DraftStatus, NewDraft};
use crate::sent;
use crate::{Error, Result, UserId};

/// Input for [`DraftWorkflow::generate`].
#[derive(Debug, Clone)]
pub struct GenerateRequest {
    /// Owner of the new draft.
    pub user_id: UserId,
    /// Transport id of the message being answered; `None` drafts a new message.
    pub source_message_id: Option<String>,
    /// Transport thread of the message being answered.
    pub thread_id: Option<String>,
    /// Text of the message being answered.
    pub email_content: String,
    /// Requested tone; falls back to the user's default, then the configured one.
    pub tone: Option<String>,
}

impl DraftWorkflow {
    /// Generate a reply with the content generator and store it as a
    /// `PENDING` draft.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] for an unknown user, [`Error::Generation`]
    /// if the generator fails, or a storage error.
    pub async fn generate(&self, request: GenerateRequest) -> Result<Draft> {
        let (preference, tone) = {
            let mut conn = self.store.acquire().await?;
            account::repository::get_user(&mut conn, request.user_id).await?;
            let preference = account::repository::find_preference(&mut conn, request.user_id)
                .await?
                .unwrap_or_default();

            let tone = request
                .tone
                .as_deref()
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .or_else(|| preference.tone())
                .unwrap_or(&self.settings.default_tone)
                .to_string();
            (preference, tone)
        };

        debug!(
            user_id = %request.user_id,
            generator = self.generator.name(),
            tone,
            "generating reply"
        );
        let reply = self
            .generator
            .generate_reply(&request.email_content, &tone)
            .await?;

        let new_draft = NewDraft {
            user_id: request.user_id,
            source_message_id: request.source_message_id,
            thread_id: request.thread_id,
            tone,
            draft_text: preference.sign(&reply),
            max_attempts: self.settings.max_attempts,
        };

        let now = self.clock.now();
        let mut tx = self.store.begin().await?;
        let draft = draft::repository::insert(&mut tx, &new_draft, now).await?;
        let meta = json!({ "tone": draft.tone, "generator": self.generator.name() });
        audit::repository::append(
            &mut tx,
            draft.id,
            Actor::System,
            DraftAction::Generated,
            &meta,
            now,
        )
        .await?;
        tx.commit().await?;

        info!(draft_id = %draft.id, user_id = %draft.user_id, "draft generated");
        Ok(draft)
    }

    /// Replace the text of a `PENDING` or `EDITED` draft.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] for an unknown draft or
    /// [`Error::InvalidState`] from any other status.
    pub async fn edit(&self, id: DraftId, text: &str) -> Result<Draft> {
        let now = self.clock.now();
        let mut tx = self.store.begin().await?;

        let current = draft::repository::get(&mut tx, id).await?;
        if !current.status.is_editable() {
            return Err(Error::InvalidState {
                operation: "edit",
                status: current.status,
            });
        }
        draft::repository::update_text(&mut tx, id, text, now).await?;
        let meta = json!({ "length": text.chars().count() });
        audit::repository::append(&mut tx, id, Actor::User, DraftAction::Edited, &meta, now)
            .await?;
        let edited = draft::repository::get(&mut tx, id).await?;
        tx.commit().await?;

        info!(draft_id = %id, "draft edited");
        Ok(edited)
    }

    /// Approve a `PENDING` or `EDITED` draft for sending.
    ///
    /// Approving a draft that was already sent is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] for an unknown draft or
    /// [`Error::InvalidState`] from any other status.
    pub async fn approve(&self, id: DraftId) -> Result<Draft> {
        let now = self.clock.now();
        let mut tx = self.store.begin().await?;

        let current = draft::repository::get(&mut tx, id).await?;
        if sent::repository::exists_for_draft(&mut tx, id).await? {
            debug!(draft_id = %id, "approve ignored, draft already sent");
            return Ok(current);
        }
        if !current.status.is_editable() {
            return Err(Error::InvalidState {
                operation: "approve",
                status: current.status,
            });
        }
        draft::repository::mark_approved(&mut tx, id, now).await?;
        let meta = json!({});
        audit::repository::append(&mut tx, id, Actor::User, DraftAction::Approved, &meta, now)
            .await?;
        let approved = draft::repository::get(&mut tx, id).await?;
        tx.commit().await?;

        info!(draft_id = %id, "draft approved");
        Ok(approved)
    }

    /// Reject a draft. Rejecting a `SENT` draft is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] for an unknown draft.
    pub async fn reject(&self, id: DraftId) -> Result<Draft> {
        let now = self.clock.now();
        let mut tx = self.store.begin().await?;

        let current = draft::repository::get(&mut tx, id).await?;
        if current.status == DraftStatus::Sent {
            debug!(draft_id = %id, "reject ignored, draft already sent");
            return Ok(current);
        }
        draft::repository::mark_rejected(&mut tx, id, now).await?;
        let meta = json!({ "previous_status": current.status });
        audit::repository::append(&mut tx, id, Actor::User, DraftAction::Rejected, &meta, now)
            .await?;
        let rejected = draft::repository::get(&mut tx, id).await?;
        tx.commit().await?;

        info!(draft_id = %id, previous = %current.status, "draft rejected");
        Ok(rejected)
    }
}
