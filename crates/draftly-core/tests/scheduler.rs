//! Retry scheduler tests.

#![allow(clippy::unwrap_used)]

mod support;

use std::time::Duration;

use draftly_core::config::RetrySettings;
use draftly_core::{
    DraftAction, DraftStatus, RetryScheduler, SendStatus, SweepOutcome, TransportError,
};
use support::Harness;

fn scheduler(h: &Harness) -> RetryScheduler {
    RetryScheduler::new(
        h.workflow.clone(),
        RetrySettings {
            interval_secs: 1,
            batch_size: 10,
        },
    )
}

#[tokio::test]
async fn test_sweep_sends_approved_drafts() {
    let h = Harness::new().await;
    let draft = h.approved_reply().await;
    let pending = h.pending_reply().await;

    let report = scheduler(&h).sweep().await.unwrap();

    assert_eq!(report.outcome(draft.id), Some(&SweepOutcome::Sent));
    assert!(report.outcome(pending.id).is_none());
    assert_eq!(report.sent(), 1);
    assert_eq!(
        h.workflow.get_draft(draft.id).await.unwrap().status,
        DraftStatus::Sent
    );

    let report = scheduler(&h).sweep().await.unwrap();
    assert!(report.outcomes.is_empty());
    assert_eq!(h.transport.accepted_count(), 1);
}

#[tokio::test]
async fn test_retries_stop_at_max_attempts() {
    let h = Harness::new().await;
    let draft = h.approved_reply().await;
    h.transport.set_down(true);
    let scheduler = scheduler(&h);

    for attempt in 1..=3 {
        let report = scheduler.sweep().await.unwrap();
        assert!(
            matches!(report.outcome(draft.id), Some(SweepOutcome::Failed { .. })),
            "sweep {attempt}"
        );
        let current = h.workflow.get_draft(draft.id).await.unwrap();
        assert_eq!(current.attempts, attempt);
        assert_eq!(current.status, DraftStatus::Failed);
    }

    let report = scheduler.sweep().await.unwrap();
    assert!(report.outcome(draft.id).is_none());

    let current = h.workflow.get_draft(draft.id).await.unwrap();
    assert_eq!(current.status, DraftStatus::Failed);
    assert!(current.is_exhausted());

    let attempts = h.workflow.attempts(draft.id).await.unwrap();
    assert_eq!(attempts.len(), 3);
    assert!(attempts.iter().all(|a| a.status == SendStatus::Failed));
    assert_eq!(
        attempts.iter().map(|a| a.attempt_no).collect::<Vec<_>>(),
        [1, 2, 3]
    );
}

#[tokio::test]
async fn test_sweep_continues_past_failures() {
    let h = Harness::new().await;
    let first = h.approved_reply().await;
    h.clock.advance(chrono::Duration::seconds(1));
    let second = h.approved_new_message().await;

    // Both the try and the retry of the oldest draft fail.
    let outage = || TransportError::Api {
        status: 500,
        body: "internal".into(),
    };
    h.transport.fail_next([outage(), outage()]);

    let report = scheduler(&h).sweep().await.unwrap();

    assert_eq!(report.outcomes[0].0, first.id);
    assert!(matches!(report.outcome(first.id), Some(SweepOutcome::Failed { .. })));
    assert_eq!(report.outcome(second.id), Some(&SweepOutcome::Sent));
    assert_eq!(report.failed(), 1);
    assert_eq!(report.sent(), 1);

    let report = scheduler(&h).sweep().await.unwrap();
    assert_eq!(report.outcome(first.id), Some(&SweepOutcome::Sent));
    assert_eq!(
        h.workflow.get_draft(first.id).await.unwrap().attempts,
        2
    );
}

#[tokio::test]
async fn test_sweep_respects_batch_size() {
    let h = Harness::new().await;
    for _ in 0..3 {
        h.approved_new_message().await;
        h.clock.advance(chrono::Duration::seconds(1));
    }
    let scheduler = RetryScheduler::new(
        h.workflow.clone(),
        RetrySettings {
            interval_secs: 1,
            batch_size: 2,
        },
    );

    assert_eq!(scheduler.sweep().await.unwrap().sent(), 2);
    assert_eq!(scheduler.sweep().await.unwrap().sent(), 1);
}

#[tokio::test]
async fn test_run_stops_on_shutdown() {
    let h = Harness::new().await;
    let draft = h.approved_reply().await;
    let (stop, stopped) = tokio::sync::oneshot::channel::<()>();

    let scheduler = scheduler(&h);
    let handle = tokio::spawn(async move {
        scheduler
            .run(async {
                let _ = stopped.await;
            })
            .await;
    });

    tokio::time::timeout(Duration::from_secs(5), async {
        while h.transport.accepted_count() == 0 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap();

    stop.send(()).unwrap();
    tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .unwrap()
        .unwrap();

    assert_eq!(
        h.workflow.get_draft(draft.id).await.unwrap().status,
        DraftStatus::Sent
    );
}

#[tokio::test]
async fn test_rejected_during_failing_send_stays_rejected() {
    let h = Harness::new().await;
    let draft = h.approved_reply().await;
    h.transport.set_down(true);
    h.transport.set_delay(Duration::from_millis(100));

    let (sent, rejected) = tokio::join!(h.workflow.send(draft.id), async {
        tokio::time::sleep(Duration::from_millis(30)).await;
        h.workflow.reject(draft.id).await
    });
    assert!(sent.is_err());
    assert_eq!(rejected.unwrap().status, DraftStatus::Rejected);

    let current = h.workflow.get_draft(draft.id).await.unwrap();
    assert_eq!(current.status, DraftStatus::Rejected);
    assert!(current.last_error.is_none());

    let attempts = h.workflow.attempts(draft.id).await.unwrap();
    assert_eq!(attempts.len(), 1);
    assert_eq!(attempts[0].status, SendStatus::Failed);
    let log = h.workflow.audit_trail(draft.id).await.unwrap();
    let actions: Vec<_> = log.iter().map(|entry| entry.action).collect();
    assert_eq!(
        actions,
        [
            DraftAction::Generated,
            DraftAction::Approved,
            DraftAction::SendStarted,
            DraftAction::Rejected,
            DraftAction::Failed
        ]
    );

    h.transport.set_down(false);
    let report = scheduler(&h).sweep().await.unwrap();
    assert!(report.outcome(draft.id).is_none());
    assert_eq!(h.transport.accepted_count(), 0);
    assert_eq!(
        h.workflow.get_draft(draft.id).await.unwrap().status,
        DraftStatus::Rejected
    );
}
