//! Shared fakes and fixtures for the workflow integration tests.

#![allow(dead_code, clippy::unwrap_used)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::DateTime;
use draftly_oauth::Token;

use draftly_core::account::repository as accounts;
use draftly_core::config::DraftSettings;
use draftly_core::generator::GenerationError;
use draftly_core::sent::repository as sent_records;
use draftly_core::{
    Clock, ContentGenerator, Credential, CredentialRefresher, Draft, DraftId, DraftWorkflow,
    GenerateRequest, MailTransport, MessageDetails, MockClock, SendExecutor, SentReceipt, Store,
    TokenExchange, TransportError, UserId, UserPreference,
};

/// Fixed start time; whole seconds so stored timestamps compare exactly.
pub const EPOCH: i64 = 1_700_000_000;

/// Mail transport that records calls and plays back scripted failures.
#[derive(Default)]
pub struct FakeTransport {
    sends: AtomicUsize,
    fetches: AtomicUsize,
    script: Mutex<VecDeque<TransportError>>,
    down: Mutex<bool>,
    delay: Mutex<Option<Duration>>,
    record_first: Mutex<Option<(Store, DraftId)>>,
    /// `(to, subject, body)` of every accepted message.
    pub accepted: Mutex<Vec<(String, String, String)>>,
    /// Access tokens presented on every send call.
    pub tokens_seen: Mutex<Vec<String>>,
}

impl FakeTransport {
    /// Fail the next send calls with these errors, in order.
    pub fn fail_next(&self, errors: impl IntoIterator<Item = TransportError>) {
        self.script.lock().unwrap().extend(errors);
    }

    /// Fail every send call with a 503 until called again with `false`.
    pub fn set_down(&self, down: bool) {
        *self.down.lock().unwrap() = down;
    }

    /// Hold every send call for `delay` before answering.
    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }

    /// Write a competing sent record for `draft` while the next send is in
    /// flight, as a second dispatcher finishing first would.
    pub fn record_first(&self, store: Store, draft: DraftId) {
        *self.record_first.lock().unwrap() = Some((store, draft));
    }

    /// Number of send calls, failed ones included.
    pub fn send_calls(&self) -> usize {
        self.sends.load(Ordering::SeqCst)
    }

    /// Number of message-detail fetches.
    pub fn fetch_calls(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    /// Number of messages that were accepted.
    pub fn accepted_count(&self) -> usize {
        self.accepted.lock().unwrap().len()
    }

    async fn deliver(
        &self,
        credential: &Credential,
        to: &str,
        subject: &str,
        body: &str,
    ) -> Result<SentReceipt, TransportError> {
        let call = self.sends.fetch_add(1, Ordering::SeqCst) + 1;
        self.tokens_seen
            .lock()
            .unwrap()
            .push(credential.access_token().unwrap_or_default().to_string());

        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let competing = self.record_first.lock().unwrap().take();
        if let Some((store, draft)) = competing {
            let mut conn = store.acquire().await.unwrap();
            let at = DateTime::from_timestamp(EPOCH, 0).unwrap();
            sent_records::record(&mut conn, draft, "msg-elsewhere", None, at)
                .await
                .unwrap()
                .unwrap();
        }

        let scripted = self.script.lock().unwrap().pop_front();
        if let Some(err) = scripted {
            return Err(err);
        }
        if *self.down.lock().unwrap() {
            return Err(TransportError::Api {
                status: 503,
                body: "backend unavailable".into(),
            });
        }

        let mut accepted = self.accepted.lock().unwrap();
        accepted.push((to.to_string(), subject.to_string(), body.to_string()));
        Ok(SentReceipt {
            message_id: format!("msg-{call}"),
            thread_id: Some("thread-from-transport".into()),
        })
    }
}

#[async_trait]
impl MailTransport for FakeTransport {
    async fn send_email(
        &self,
        credential: &Credential,
        to: &str,
        subject: &str,
        body: &str,
    ) -> Result<SentReceipt, TransportError> {
        self.deliver(credential, to, subject, body).await
    }

    async fn send_reply(
        &self,
        credential: &Credential,
        original: &MessageDetails,
        body: &str,
    ) -> Result<SentReceipt, TransportError> {
        let to = original.from.clone().unwrap_or_default();
        let subject = format!("Re: {}", original.subject.clone().unwrap_or_default());
        self.deliver(credential, &to, &subject, body).await
    }

    async fn fetch_message_details(
        &self,
        _credential: &Credential,
        message_id: &str,
    ) -> Result<MessageDetails, TransportError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        Ok(MessageDetails {
            id: message_id.to_string(),
            thread_id: Some("thread-1".into()),
            from: Some("alice@example.com".into()),
            subject: Some("Lunch on Friday?".into()),
            message_id_header: Some("<lunch@mail.example.com>".into()),
            references_header: None,
            body_text: "Are you free for lunch on Friday?".into(),
        })
    }
}

/// Generator that echoes its tone and records every request.
#[derive(Default)]
pub struct FakeGenerator {
    fail: Mutex<bool>,
    /// Tones requested so far.
    pub tones: Mutex<Vec<String>>,
}

impl FakeGenerator {
    /// Make every following request fail.
    pub fn set_failing(&self, fail: bool) {
        *self.fail.lock().unwrap() = fail;
    }
}

#[async_trait]
impl ContentGenerator for FakeGenerator {
    fn name(&self) -> &'static str {
        "fake"
    }

    async fn generate_reply(
        &self,
        _email_content: &str,
        tone: &str,
    ) -> Result<String, GenerationError> {
        self.tones.lock().unwrap().push(tone.to_string());
        if *self.fail.lock().unwrap() {
            return Err(GenerationError::EmptyReply("fake"));
        }
        Ok(format!("A {tone} reply."))
    }
}

/// Token endpoint that hands out numbered access tokens.
#[derive(Default)]
pub struct FakeExchange {
    calls: AtomicUsize,
    revoked: Mutex<bool>,
}

impl FakeExchange {
    /// Answer every following exchange with `invalid_grant`.
    pub fn revoke_grant(&self) {
        *self.revoked.lock().unwrap() = true;
    }

    /// Number of exchanges performed.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TokenExchange for FakeExchange {
    async fn exchange(&self, _refresh_token: &str) -> draftly_oauth::Result<Token> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if *self.revoked.lock().unwrap() {
            return Err(draftly_oauth::Error::oauth_error(
                "invalid_grant",
                "Token has been expired or revoked.",
            ));
        }
        let expires_at = DateTime::from_timestamp(EPOCH + 86_400, 0).unwrap();
        Ok(Token::new(format!("at-refreshed-{call}"), "Bearer").with_expires_at(expires_at))
    }
}

/// A workflow wired to fakes, with one logged-in user.
pub struct Harness {
    pub store: Store,
    pub clock: Arc<MockClock>,
    pub transport: Arc<FakeTransport>,
    pub generator: Arc<FakeGenerator>,
    pub exchange: Arc<FakeExchange>,
    pub refresher: CredentialRefresher,
    pub workflow: DraftWorkflow,
    pub user: UserId,
}

impl Harness {
    pub async fn new() -> Self {
        Self::with_settings(DraftSettings::default()).await
    }

    pub async fn with_settings(settings: DraftSettings) -> Self {
        let store = Store::in_memory().await.unwrap();
        let clock = Arc::new(MockClock::starting_at(
            DateTime::from_timestamp(EPOCH, 0).unwrap(),
        ));

        let mut conn = store.acquire().await.unwrap();
        let user = accounts::create_user(&mut conn, "owner@example.com", clock.now())
            .await
            .unwrap();
        drop(conn);

        let transport = Arc::new(FakeTransport::default());
        let generator = Arc::new(FakeGenerator::default());
        let exchange = Arc::new(FakeExchange::default());
        let refresher = CredentialRefresher::new(store.clone(), exchange.clone(), clock.clone());
        let executor = SendExecutor::new(transport.clone(), refresher.clone());
        let workflow = DraftWorkflow::new(
            store.clone(),
            generator.clone(),
            executor,
            clock.clone(),
            settings,
        );

        let harness = Self {
            store,
            clock,
            transport,
            generator,
            exchange,
            refresher,
            workflow,
            user: user.id,
        };
        harness.login(chrono::Duration::hours(1)).await;
        harness
    }

    pub fn now(&self) -> chrono::DateTime<chrono::Utc> {
        self.clock.now()
    }

    /// Store a credential whose access token expires `valid_for` from now.
    pub async fn login(&self, valid_for: chrono::Duration) -> Credential {
        let token = Token::new("at-login", "Bearer")
            .with_refresh_token("1//refresh")
            .with_expires_at(self.clock.now() + valid_for);
        self.refresher.save(self.user, &token).await.unwrap()
    }

    pub async fn set_preference(&self, preference: &UserPreference) {
        let mut conn = self.store.acquire().await.unwrap();
        accounts::upsert_preference(&mut conn, self.user, preference, self.clock.now())
            .await
            .unwrap();
    }

    /// A `PENDING` reply draft.
    pub async fn pending_reply(&self) -> Draft {
        self.workflow
            .generate(GenerateRequest {
                user_id: self.user,
                source_message_id: Some("src-1".into()),
                thread_id: Some("thread-1".into()),
                email_content: "Are you free for lunch on Friday?".into(),
                tone: Some("friendly".into()),
            })
            .await
            .unwrap()
    }

    /// An `APPROVED` reply draft.
    pub async fn approved_reply(&self) -> Draft {
        let draft = self.pending_reply().await;
        self.workflow.approve(draft.id).await.unwrap()
    }

    /// An `APPROVED` draft with no source message.
    pub async fn approved_new_message(&self) -> Draft {
        let draft = self
            .workflow
            .generate(GenerateRequest {
                user_id: self.user,
                source_message_id: None,
                thread_id: None,
                email_content: "Summarise this week's updates.".into(),
                tone: None,
            })
            .await
            .unwrap();
        self.workflow.approve(draft.id).await.unwrap()
    }
}
