//! The idempotent send protocol.
//!
//! A draft is dispatched at most once. The sent record is the witness: once
//! it exists every later call short-circuits to [`SendOutcome::AlreadySent`].
//! Between the claim and the outcome the draft sits in `SENDING` with a
//! `STARTED` attempt, which nothing else will pick up.

use chrono::{DateTime, Utc};
use serde_json::json;
use sqlx::SqliteConnection;
use tracing::{error, info, warn};

use super::DraftWorkflow;
use crate::account;
use crate::audit::{self, Actor, DraftAction};
use crate::draft::{self, Draft, DraftId, DraftStatus};
use crate::ledger::{self, SendAttempt};
use crate::sent;
use crate::transport::SentReceipt;
use crate::{Error, Result};

/// How a send request ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    /// This call dispatched the draft.
    Sent {
        /// Transport id of the dispatched message.
        transport_message_id: String,
        /// Ledger number of the successful attempt.
        attempt_no: u32,
    },
    /// The draft had already been dispatched; nothing was sent.
    AlreadySent,
}

/// A draft claimed for dispatch, with everything the outbound call needs.
struct Claim {
    draft: Draft,
    attempt: SendAttempt,
    recipient: String,
}

impl DraftWorkflow {
    /// Send an approved or previously failed draft.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] for an unknown draft and
    /// [`Error::NotEligible`] when the draft is in any status other than
    /// `APPROVED` or `FAILED`. When the outbound call fails the attempt and
    /// draft are marked failed and the cause is returned. A draft rejected
    /// while the call was in flight stays `REJECTED`.
    pub async fn send(&self, id: DraftId) -> Result<SendOutcome> {
        let claim = match self.claim(id).await? {
            Ok(claim) => claim,
            Err(outcome) => return Ok(outcome),
        };

        match self.dispatch(&claim).await {
            Ok(receipt) => self.complete(&claim, receipt).await,
            Err(e) => {
                self.fail(&claim, &e).await?;
                Err(e)
            }
        }
    }

    /// Checks the witness and eligibility, then moves the draft to `SENDING`
    /// and opens a ledger attempt in one transaction.
    async fn claim(&self, id: DraftId) -> Result<std::result::Result<Claim, SendOutcome>> {
        let now = self.clock.now();
        let mut tx = self.store.begin().await?;

        let current = draft::repository::get(&mut tx, id).await?;
        if settle_if_sent(&mut tx, &current, now).await? {
            tx.commit().await?;
            return Ok(Err(SendOutcome::AlreadySent));
        }
        if !current.status.is_sendable() {
            return Err(Error::NotEligible {
                status: current.status,
            });
        }
        if !draft::repository::claim_for_send(&mut tx, id, now).await? {
            let current = draft::repository::get(&mut tx, id).await?;
            if settle_if_sent(&mut tx, &current, now).await? {
                tx.commit().await?;
                return Ok(Err(SendOutcome::AlreadySent));
            }
            return Err(Error::NotEligible {
                status: current.status,
            });
        }

        let attempt = ledger::repository::start(&mut tx, id, now).await?;
        let meta = json!({ "attempt_no": attempt.attempt_no });
        audit::repository::append(&mut tx, id, Actor::System, DraftAction::SendStarted, &meta, now)
            .await?;
        let recipient = account::repository::get_user(&mut tx, current.user_id)
            .await?
            .email;
        let draft = draft::repository::get(&mut tx, id).await?;
        tx.commit().await?;

        info!(draft_id = %id, attempt_no = attempt.attempt_no, "send claimed");
        Ok(Ok(Claim {
            draft,
            attempt,
            recipient,
        }))
    }

    /// The outbound call. Holds no database connection.
    async fn dispatch(&self, claim: &Claim) -> Result<SentReceipt> {
        let refresher = self.executor.refresher();
        let stored = refresher.load(claim.draft.user_id).await?;
        let mut credential = refresher.ensure_valid(&stored).await?;

        match claim.draft.reply_to() {
            Some(message_id) => {
                let details = self
                    .executor
                    .fetch_details(&mut credential, message_id)
                    .await?;
                self.executor
                    .send_reply(&mut credential, &details, &claim.draft.draft_text)
                    .await
            }
            None => {
                self.executor
                    .send_new(
                        &mut credential,
                        &claim.recipient,
                        &self.settings.new_message_subject,
                        &claim.draft.draft_text,
                    )
                    .await
            }
        }
    }

    /// Records a successful dispatch: attempt and witness first, then the
    /// draft status and audit entry.
    async fn complete(&self, claim: &Claim, receipt: SentReceipt) -> Result<SendOutcome> {
        let id = claim.draft.id;
        let now = self.clock.now();
        let thread_id = receipt
            .thread_id
            .as_deref()
            .or(claim.draft.thread_id.as_deref());

        let mut tx = self.store.begin().await?;
        ledger::repository::succeed(&mut tx, claim.attempt.id, &receipt.message_id, now).await?;
        let recorded =
            sent::repository::record(&mut tx, id, &receipt.message_id, thread_id, now).await?;
        tx.commit().await?;

        let mut tx = self.store.begin().await?;
        let outcome = if let Some(record) = recorded {
            draft::repository::mark_sent(&mut tx, id, record.sent_at, now).await?;
            SendOutcome::Sent {
                transport_message_id: record.transport_message_id,
                attempt_no: claim.attempt.attempt_no,
            }
        } else {
            warn!(draft_id = %id, "draft was recorded as sent by another caller");
            draft::repository::mark_sent(&mut tx, id, now, now).await?;
            SendOutcome::AlreadySent
        };
        let meta = json!({
            "transport_message_id": receipt.message_id,
            "attempt_no": claim.attempt.attempt_no,
        });
        audit::repository::append(&mut tx, id, Actor::System, DraftAction::Sent, &meta, now)
            .await?;
        tx.commit().await?;

        info!(
            draft_id = %id,
            transport_message_id = %receipt.message_id,
            attempt_no = claim.attempt.attempt_no,
            "draft sent"
        );
        Ok(outcome)
    }

    /// Records a failed dispatch. An `invalid_grant` failure also revokes
    /// the user's credential.
    async fn fail(&self, claim: &Claim, cause: &Error) -> Result<()> {
        let id = claim.draft.id;
        let message = cause.to_string();
        let code = cause.code();

        let mut conn = self.store.acquire().await?;
        let now = self.clock.now();
        ledger::repository::fail(&mut conn, claim.attempt.id, code, &message, now).await?;
        drop(conn);

        if cause.is_invalid_grant()
            && let Err(e) = self.executor.refresher().revoke(claim.draft.user_id).await
        {
            error!(user_id = %claim.draft.user_id, error = %e, "failed to revoke credential");
        }

        let now = self.clock.now();
        let mut tx = self.store.begin().await?;
        if !draft::repository::mark_failed(&mut tx, id, &message, now).await? {
            let status = draft::repository::get(&mut tx, id).await?.status;
            info!(draft_id = %id, %status, "draft moved on during send; status kept");
        }
        let meta = json!({
            "error": message,
            "code": code,
            "attempt_no": claim.attempt.attempt_no,
        });
        audit::repository::append(&mut tx, id, Actor::System, DraftAction::Failed, &meta, now)
            .await?;
        tx.commit().await?;

        warn!(
            draft_id = %id,
            attempt_no = claim.attempt.attempt_no,
            code,
            error = %message,
            "send failed"
        );
        Ok(())
    }
}

/// Checks for a sent record and, when one exists, brings a draft whose
/// status lags behind (a crash between the two writes) up to `SENT`.
///
/// Returns whether the draft had already been sent.
async fn settle_if_sent(
    conn: &mut SqliteConnection,
    current: &Draft,
    now: DateTime<Utc>,
) -> Result<bool> {
    let Some(record) = sent::repository::find_for_draft(conn, current.id).await? else {
        return Ok(false);
    };
    if current.status != DraftStatus::Sent {
        warn!(draft_id = %current.id, status = %current.status, "repairing status of sent draft");
        draft::repository::mark_sent(conn, current.id, record.sent_at, now).await?;
    }
    Ok(true)
}
