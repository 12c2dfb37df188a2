//! Background retry of approved and failed drafts.
//!
//! Each sweep reads a batch of candidates, re-reads every draft before acting
//! on it and hands the eligible ones to [`DraftWorkflow::send`]. Failures are
//! logged and recorded in the report; they never stop the sweep or the loop.

use std::future::Future;

use tracing::{debug, error, info, warn};

use crate::Result;
use crate::config::RetrySettings;
use crate::draft::{self, DraftId, DraftStatus};
use crate::workflow::{DraftWorkflow, SendOutcome};

/// Why a candidate was left alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Another send holds the draft in `SENDING`.
    InFlight,
    /// The draft used up its attempts.
    Exhausted,
    /// The draft moved to a status that cannot be sent.
    NotEligible(DraftStatus),
}

/// What a sweep did with one draft.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SweepOutcome {
    /// The draft was dispatched.
    Sent,
    /// The draft turned out to be sent already.
    AlreadySent,
    /// The draft was not attempted.
    Skipped(SkipReason),
    /// The attempt failed.
    Failed {
        /// Rendered cause.
        error: String,
    },
}

/// Per-draft results of one sweep, in processing order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Draft and outcome pairs.
    pub outcomes: Vec<(DraftId, SweepOutcome)>,
}

impl SweepReport {
    /// Number of drafts dispatched by this sweep.
    #[must_use]
    pub fn sent(&self) -> usize {
        self.count(|o| matches!(o, SweepOutcome::Sent))
    }

    /// Number of attempts that failed.
    #[must_use]
    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, SweepOutcome::Failed { .. }))
    }

    /// Number of drafts left alone.
    #[must_use]
    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, SweepOutcome::Skipped(_)))
    }

    /// Outcome recorded for `id`, if the sweep saw it.
    #[must_use]
    pub fn outcome(&self, id: DraftId) -> Option<&SweepOutcome> {
        self.outcomes
            .iter()
            .find(|(draft_id, _)| *draft_id == id)
            .map(|(_, outcome)| outcome)
    }

    fn count(&self, pred: impl Fn(&SweepOutcome) -> bool) -> usize {
        self.outcomes.iter().filter(|(_, o)| pred(o)).count()
    }
}

/// Periodically re-sends drafts that are approved or failed with attempts
/// remaining.
#[derive(Clone)]
pub struct RetryScheduler {
    workflow: DraftWorkflow,
    settings: RetrySettings,
}

impl RetryScheduler {
    /// Creates a scheduler.
    #[must_use]
    pub const fn new(workflow: DraftWorkflow, settings: RetrySettings) -> Self {
        Self { workflow, settings }
    }

    /// Run one sweep over at most `batch_size` candidates, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error only if the candidate query fails. Per-draft
    /// failures are reported in the [`SweepReport`].
    pub async fn sweep(&self) -> Result<SweepReport> {
        let candidates = {
            let mut conn = self.workflow.store().acquire().await?;
            draft::repository::find_retryable(&mut conn, self.settings.batch_size).await?
        };
        debug!(candidates = candidates.len(), "retry sweep started");

        let mut report = SweepReport::default();
        for candidate in candidates {
            let outcome = self.process(candidate.id).await;
            report.outcomes.push((candidate.id, outcome));
        }

        if !report.outcomes.is_empty() {
            info!(
                sent = report.sent(),
                failed = report.failed(),
                skipped = report.skipped(),
                "retry sweep finished"
            );
        }
        Ok(report)
    }

    async fn process(&self, id: DraftId) -> SweepOutcome {
        let current = match self.workflow.get_draft(id).await {
            Ok(draft) => draft,
            Err(e) => {
                warn!(draft_id = %id, error = %e, "failed to reload retry candidate");
                return SweepOutcome::Failed {
                    error: e.to_string(),
                };
            }
        };

        if current.status == DraftStatus::Sending {
            return SweepOutcome::Skipped(SkipReason::InFlight);
        }
        if !current.status.is_sendable() {
            return SweepOutcome::Skipped(SkipReason::NotEligible(current.status));
        }
        if current.is_exhausted() {
            debug!(draft_id = %id, attempts = current.attempts, "retry attempts exhausted");
            return SweepOutcome::Skipped(SkipReason::Exhausted);
        }

        match self.workflow.send(id).await {
            Ok(SendOutcome::Sent { .. }) => SweepOutcome::Sent,
            Ok(SendOutcome::AlreadySent) => SweepOutcome::AlreadySent,
            Err(e) => {
                warn!(draft_id = %id, error = %e, "retry send failed");
                SweepOutcome::Failed {
                    error: e.to_string(),
                }
            }
        }
    }

    /// Sweep, wait the configured interval, and repeat until `shutdown`
    /// resolves. A sweep in progress is finished before the loop exits.
    pub async fn run(&self, shutdown: impl Future<Output = ()>) {
        let mut shutdown = std::pin::pin!(shutdown);
        info!(interval_secs = self.settings.interval_secs, "retry scheduler started");

        loop {
            if let Err(e) = self.sweep().await {
                error!(error = %e, "retry sweep failed");
            }

            tokio::select! {
                () = &mut shutdown => break,
                () = tokio::time::sleep(self.settings.interval()) => {}
            }
        }

        info!("retry scheduler stopped");
    }
}
