//! The chat session controller.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::backend::{ChatBackend, PromptRequest};
use crate::chat::catalog::WELCOME_MESSAGE;
use crate::chat::{Attachment, AttachmentSet, Message, extract_reply};
use crate::error::{Error, Result};

/// Transcript text appended when a submission fails for any reason.
pub const FALLBACK_REPLY: &str =
    "I could not reach the backend right now. Please try again in a moment.";

/// Error slot text when no response was obtained at all.
pub const TRANSPORT_ERROR: &str =
    "Unable to reach the backend. Check your connection and try again.";

/// Capabilities chosen when the session is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionOptions {
    /// Whether files may be staged and sent as multipart.
    pub attachments_enabled: bool,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            attachments_enabled: true,
        }
    }
}

/// How a submission settled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The backend answered; carries the text appended to the transcript.
    Replied(String),
    /// The call failed; carries the text placed in the error slot.
    Failed(String),
}

impl Outcome {
    #[must_use]
    pub fn is_replied(&self) -> bool {
        matches!(self, Self::Replied(_))
    }
}

/// One conversation with the backend.
///
/// Owns the transcript, the input buffer, the staged attachments and the
/// error slot. Cloning yields another handle to the same session.
///
/// At most one submission is in flight at a time. While one is pending,
/// further calls to [`submit`](Self::submit) fail with [`Error::InFlight`]
/// and change nothing.
#[derive(Debug, Clone)]
pub struct ChatSession {
    inner: Arc<SessionInner>,
}

#[derive(Debug)]
struct SessionInner {
    id: String,
    backend: Arc<dyn ChatBackend>,
    options: SessionOptions,
    state: Mutex<SessionState>,
}

#[derive(Debug)]
struct SessionState {
    messages: Vec<Message>,
    input: String,
    error: Option<String>,
    attachments: AttachmentSet,
    highlighted: Option<String>,
    loading: bool,
}

impl SessionState {
    fn fresh() -> Self {
        Self {
            messages: vec![Message::assistant(WELCOME_MESSAGE)],
            input: String::new(),
            error: None,
            attachments: AttachmentSet::new(),
            highlighted: None,
            loading: false,
        }
    }
}

/// Clears the loading flag when the submission ends, however it ends.
///
/// A submission dropped before it settled still gets its one assistant
/// message, so the transcript never ends on an unanswered prompt.
struct LoadingGuard<'a> {
    inner: &'a SessionInner,
    settled: bool,
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        let mut state = self.inner.lock();
        state.loading = false;
        if !self.settled {
            warn!(
                name: "chat.submit.abandoned",
                session_id = %self.inner.id,
                "Submission dropped before the backend answered"
            );
            state.messages.push(Message::assistant(FALLBACK_REPLY));
            state.error = Some(TRANSPORT_ERROR.to_string());
        }
    }
}

impl SessionInner {
    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl ChatSession {
    /// Create a session that starts with the welcome message.
    pub fn new(backend: Arc<dyn ChatBackend>, options: SessionOptions) -> Self {
        let id = Uuid::new_v4().to_string();
        info!(
            name: "chat.session.created",
            session_id = %id,
            endpoint = %backend.endpoint(),
            attachments_enabled = options.attachments_enabled,
            "Chat session created"
        );
        Self {
            inner: Arc::new(SessionInner {
                id,
                backend,
                options,
                state: Mutex::new(SessionState::fresh()),
            }),
        }
    }

    /// Get the session ID.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.inner.id
    }

    #[must_use]
    pub fn options(&self) -> SessionOptions {
        self.inner.options
    }

    /// The backend URL prompts go to.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        self.inner.backend.endpoint()
    }

    /// Submit `text` with the currently staged attachments.
    ///
    /// The user message is appended before the request starts, and exactly
    /// one assistant message is appended once it settles. Returns
    /// [`Error::EmptyPrompt`] or [`Error::InFlight`] without touching any
    /// state when the submission is rejected.
    pub async fn submit(&self, text: &str) -> Result<Outcome> {
        let request = self.begin(text)?;
        let mut loading = LoadingGuard {
            inner: &self.inner,
            settled: false,
        };

        info!(
            name: "chat.submit.started",
            session_id = %self.inner.id,
            prompt_len = request.prompt.len(),
            attachments = request.attachments.len(),
            "Submitting prompt"
        );

        let result = self.inner.backend.send(request).await;
        let outcome = self.settle(result);
        loading.settled = true;
        Ok(outcome)
    }

    /// Submit whatever is in the input buffer.
    pub async fn submit_input(&self) -> Result<Outcome> {
        let text = self.input();
        self.submit(&text).await
    }

    /// Highlight a suggestion and submit it as if it had been typed.
    pub async fn select_suggestion(&self, text: &str) -> Result<Outcome> {
        self.inner.lock().highlighted = Some(text.to_string());
        self.submit(text).await
    }

    /// Append files to the staged set. Returns how many were added.
    ///
    /// Fails with [`Error::InFlight`] while a submission is pending.
    pub fn stage_attachments(&self, files: Vec<Attachment>) -> Result<usize> {
        if !self.inner.options.attachments_enabled {
            return Err(Error::AttachmentsDisabled);
        }
        if files.is_empty() {
            return Ok(0);
        }

        let mut state = self.inner.lock();
        if state.loading {
            return Err(Error::InFlight);
        }
        let added = state.attachments.stage(files);
        info!(
            name: "chat.attachments.staged",
            session_id = %self.inner.id,
            added,
            staged = state.attachments.len(),
            "Attachments staged"
        );
        Ok(added)
    }

    /// Drop one staged file by position. Out-of-range indexes are ignored.
    pub fn remove_attachment(&self, index: usize) -> Option<Attachment> {
        let removed = self.inner.lock().attachments.remove(index);
        if let Some(file) = &removed {
            debug!(
                name: "chat.attachments.removed",
                session_id = %self.inner.id,
                index,
                file = %file.name(),
                "Attachment removed"
            );
        }
        removed
    }

    /// Start over with only the welcome message.
    pub fn reset(&self) {
        let mut state = self.inner.lock();
        let loading = state.loading;
        *state = SessionState::fresh();
        state.loading = loading;
        info!(name: "chat.session.reset", session_id = %self.inner.id, "Session reset");
    }

    pub fn set_input(&self, text: impl Into<String>) {
        self.inner.lock().input = text.into();
    }

    #[must_use]
    pub fn input(&self) -> String {
        self.inner.lock().input.clone()
    }

    /// Get all messages in display order.
    #[must_use]
    pub fn messages(&self) -> Vec<Message> {
        self.inner.lock().messages.clone()
    }

    #[must_use]
    pub fn last_message(&self) -> Option<Message> {
        self.inner.lock().messages.last().cloned()
    }

    /// Whether a submission is pending.
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.inner.lock().loading
    }

    /// Error text from the most recent submission, if it failed.
    #[must_use]
    pub fn error(&self) -> Option<String> {
        self.inner.lock().error.clone()
    }

    #[must_use]
    pub fn attachments(&self) -> AttachmentSet {
        self.inner.lock().attachments.clone()
    }

    #[must_use]
    pub fn highlighted_suggestion(&self) -> Option<String> {
        self.inner.lock().highlighted.clone()
    }

    /// Validate, record the user message and build the outbound request.
    fn begin(&self, text: &str) -> Result<PromptRequest> {
        let prompt = text.trim();
        let mut state = self.inner.lock();

        if prompt.is_empty() {
            return Err(Error::EmptyPrompt);
        }
        if state.loading {
            warn!(
                name: "chat.submit.rejected",
                session_id = %self.inner.id,
                "Submission already in flight"
            );
            return Err(Error::InFlight);
        }

        state.messages.push(Message::user(prompt));
        state.input.clear();
        state.error = None;
        state.loading = true;

        Ok(PromptRequest::new(prompt).with_attachments(state.attachments.as_slice().to_vec()))
    }

    fn settle(&self, result: Result<serde_json::Value>) -> Outcome {
        let mut state = self.inner.lock();
        match result {
            Ok(payload) => {
                let reply = extract_reply(&payload);
                state.messages.push(Message::assistant(reply.clone()));
                state.attachments.clear();
                info!(
                    name: "chat.submit.replied",
                    session_id = %self.inner.id,
                    reply_len = reply.len(),
                    "Backend replied"
                );
                Outcome::Replied(reply)
            }
            Err(err) => {
                let detail = match &err {
                    Error::Backend { detail, .. } => detail.clone(),
                    _ => TRANSPORT_ERROR.to_string(),
                };
                warn!(
                    name: "chat.submit.failed",
                    session_id = %self.inner.id,
                    error = %err,
                    "Submission failed"
                );
                state.messages.push(Message::assistant(FALLBACK_REPLY));
                state.error = Some(detail.clone());
                Outcome::Failed(detail)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::MessageRole;
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::VecDeque;
    use tokio::sync::Notify;

    #[derive(Debug)]
    enum Script {
        Reply(serde_json::Value),
        Status(u16, &'static str),
        BadBody,
    }

    #[derive(Debug, Default)]
    struct FakeBackend {
        script: Mutex<VecDeque<Script>>,
        requests: Mutex<Vec<PromptRequest>>,
        started: Notify,
        release: Option<Notify>,
    }

    impl FakeBackend {
        fn scripted(steps: impl IntoIterator<Item = Script>) -> Self {
            Self {
                script: Mutex::new(steps.into_iter().collect()),
                ..Self::default()
            }
        }

        fn gated(steps: impl IntoIterator<Item = Script>) -> Self {
            Self {
                release: Some(Notify::new()),
                ..Self::scripted(steps)
            }
        }

        fn requests(&self) -> Vec<PromptRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ChatBackend for FakeBackend {
        async fn send(&self, request: PromptRequest) -> Result<serde_json::Value> {
            self.requests.lock().unwrap().push(request);
            self.started.notify_one();
            if let Some(release) = &self.release {
                release.notified().await;
            }
            let step = self.script.lock().unwrap().pop_front();
            match step.expect("no scripted response left") {
                Script::Reply(payload) => Ok(payload),
                Script::Status(status, body) => Err(Error::Backend {
                    status,
                    detail: body.to_string(),
                }),
                Script::BadBody => {
                    Err(serde_json::from_str::<serde_json::Value>("<html>").unwrap_err().into())
                }
            }
        }

        fn endpoint(&self) -> &str {
            "http://fake.test/chat"
        }
    }

    fn session_with(backend: &Arc<FakeBackend>) -> ChatSession {
        ChatSession::new(
            Arc::clone(backend) as Arc<dyn ChatBackend>,
            SessionOptions::default(),
        )
    }

    fn file(name: &str) -> Attachment {
        Attachment::new(name, name.as_bytes().to_vec())
    }

    #[tokio::test]
    async fn test_new_session_has_welcome() {
        let backend = Arc::new(FakeBackend::default());
        let session = session_with(&backend);

        let messages = session.messages();
        assert_eq!(messages, vec![Message::assistant(WELCOME_MESSAGE)]);
        assert!(!session.is_loading());
        assert!(session.error().is_none());
    }

    #[tokio::test]
    async fn test_successful_reply() {
        let backend = Arc::new(FakeBackend::scripted([Script::Reply(json!({ "reply": "Hi!" }))]));
        let session = session_with(&backend);

        let outcome = session.submit("Hello").await.unwrap();
        assert_eq!(outcome, Outcome::Replied("Hi!".to_string()));

        let messages = session.messages();
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[1], Message::user("Hello"));
        assert_eq!(messages[2], Message::assistant("Hi!"));
        assert!(!session.is_loading());
        assert!(session.error().is_none());
    }

    #[tokio::test]
    async fn test_backend_error_surfaces_body() {
        let backend = Arc::new(FakeBackend::scripted([Script::Status(500, "server exploded")]));
        let session = session_with(&backend);

        let outcome = session.submit("Hello").await.unwrap();
        assert_eq!(outcome, Outcome::Failed("server exploded".to_string()));
        assert_eq!(session.last_message(), Some(Message::assistant(FALLBACK_REPLY)));
        assert_eq!(session.error().as_deref(), Some("server exploded"));
        assert!(!session.is_loading());
    }

    #[tokio::test]
    async fn test_undecodable_body_uses_generic_error() {
        let backend = Arc::new(FakeBackend::scripted([Script::BadBody]));
        let session = session_with(&backend);

        session.submit("Hello").await.unwrap();
        assert_eq!(session.last_message(), Some(Message::assistant(FALLBACK_REPLY)));
        assert_eq!(session.error().as_deref(), Some(TRANSPORT_ERROR));
    }

    #[tokio::test]
    async fn test_empty_prompt_is_rejected() {
        let backend = Arc::new(FakeBackend::default());
        let session = session_with(&backend);

        let err = session.submit("   \n\t ").await.unwrap_err();
        assert!(matches!(err, Error::EmptyPrompt));
        assert_eq!(session.messages().len(), 1);
        assert!(backend.requests().is_empty());
    }

    #[tokio::test]
    async fn test_prompt_is_trimmed_and_input_cleared() {
        let backend = Arc::new(FakeBackend::scripted([Script::Reply(json!({ "answer": "ok" }))]));
        let session = session_with(&backend);

        session.set_input("  Hello there \n");
        session.submit_input().await.unwrap();

        assert_eq!(session.messages()[1], Message::user("Hello there"));
        assert_eq!(backend.requests()[0].prompt, "Hello there");
        assert!(session.input().is_empty());
    }

    #[tokio::test]
    async fn test_single_flight() {
        let backend = Arc::new(FakeBackend::gated([Script::Reply(json!({ "reply": "first" }))]));
        let session = session_with(&backend);

        let pending = {
            let session = session.clone();
            tokio::spawn(async move { session.submit("one").await })
        };
        backend.started.notified().await;

        // User message is already in the transcript while the call is pending.
        assert!(session.is_loading());
        assert_eq!(session.last_message(), Some(Message::user("one")));

        let err = session.submit("two").await.unwrap_err();
        assert!(matches!(err, Error::InFlight));
        assert_eq!(session.messages().len(), 2);
        assert_eq!(backend.requests().len(), 1);

        if let Some(release) = &backend.release {
            release.notify_one();
        }
        let outcome = pending.await.unwrap().unwrap();
        assert_eq!(outcome, Outcome::Replied("first".to_string()));
        assert!(!session.is_loading());
        assert_eq!(session.messages().len(), 3);
    }

    #[tokio::test]
    async fn test_staging_closed_while_in_flight() {
        let backend = Arc::new(FakeBackend::gated([Script::Reply(json!({ "reply": "done" }))]));
        let session = session_with(&backend);

        let pending = {
            let session = session.clone();
            tokio::spawn(async move { session.submit("one").await })
        };
        backend.started.notified().await;

        let err = session.stage_attachments(vec![file("late.txt")]).unwrap_err();
        assert!(matches!(err, Error::InFlight));

        if let Some(release) = &backend.release {
            release.notify_one();
        }
        pending.await.unwrap().unwrap();

        // Once settled, the file can be staged and stays staged.
        assert_eq!(session.stage_attachments(vec![file("late.txt")]).unwrap(), 1);
        assert_eq!(session.attachments().len(), 1);
    }

    #[tokio::test]
    async fn test_dropped_submission_still_gets_a_reply() {
        let backend = Arc::new(FakeBackend::gated([Script::Reply(json!({ "reply": "late" }))]));
        let session = session_with(&backend);

        let timed_out =
            tokio::time::timeout(std::time::Duration::from_millis(20), session.submit("one"))
                .await
                .is_err();
        assert!(timed_out);

        let messages = session.messages();
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[1], Message::user("one"));
        assert_eq!(messages[2], Message::assistant(FALLBACK_REPLY));
        assert_eq!(session.error().as_deref(), Some(TRANSPORT_ERROR));
        assert!(!session.is_loading());
    }

    #[tokio::test]
    async fn test_exactly_one_assistant_message_per_submission() {
        let backend = Arc::new(FakeBackend::scripted([
            Script::Reply(json!({ "output": "a" })),
            Script::Status(502, ""),
            Script::BadBody,
            Script::Reply(json!({ "foo": "bar" })),
        ]));
        let session = session_with(&backend);

        for prompt in ["1", "2", "3", "4"] {
            let before = session.messages().len();
            session.submit(prompt).await.unwrap();
            let after = session.messages();
            assert_eq!(after.len(), before + 2);
            assert_eq!(after[before].role, MessageRole::User);
            assert_eq!(after[before + 1].role, MessageRole::Assistant);
        }
        assert_eq!(session.last_message(), Some(Message::assistant(r#"{"foo":"bar"}"#)));
    }

    #[tokio::test]
    async fn test_error_cleared_on_next_submission() {
        let backend = Arc::new(FakeBackend::scripted([
            Script::Status(500, "boom"),
            Script::Reply(json!({ "reply": "fine" })),
        ]));
        let session = session_with(&backend);

        session.submit("first").await.unwrap();
        assert!(session.error().is_some());

        session.submit("second").await.unwrap();
        assert!(session.error().is_none());
    }

    #[tokio::test]
    async fn test_attachments_sent_and_cleared_on_success() {
        let backend = Arc::new(FakeBackend::scripted([Script::Reply(json!({ "reply": "got it" }))]));
        let session = session_with(&backend);

        assert_eq!(session.stage_attachments(vec![file("a.txt")]).unwrap(), 1);
        assert_eq!(session.stage_attachments(vec![file("b.txt")]).unwrap(), 1);
        session.submit("read these").await.unwrap();

        let sent = &backend.requests()[0];
        assert!(sent.is_multipart());
        let names: Vec<_> = sent.attachments.iter().map(Attachment::name).collect();
        assert_eq!(names, ["a.txt", "b.txt"]);
        assert!(session.attachments().is_empty());
    }

    #[tokio::test]
    async fn test_attachments_kept_on_failure() {
        let backend = Arc::new(FakeBackend::scripted([Script::Status(500, "nope")]));
        let session = session_with(&backend);

        session.stage_attachments(vec![file("keep.pdf")]).unwrap();
        session.submit("try").await.unwrap();
        assert_eq!(session.attachments().len(), 1);
    }

    #[tokio::test]
    async fn test_remove_attachment() {
        let backend = Arc::new(FakeBackend::default());
        let session = session_with(&backend);

        session
            .stage_attachments(vec![file("one.txt"), file("two.txt")])
            .unwrap();
        assert_eq!(session.remove_attachment(0).unwrap().name(), "one.txt");
        assert!(session.remove_attachment(5).is_none());

        let staged = session.attachments();
        assert_eq!(staged.len(), 1);
        assert_eq!(staged.as_slice()[0].name(), "two.txt");
    }

    #[tokio::test]
    async fn test_attachments_disabled() {
        let backend = Arc::new(FakeBackend::scripted([Script::Reply(json!({ "reply": "x" }))]));
        let session = ChatSession::new(
            Arc::clone(&backend) as Arc<dyn ChatBackend>,
            SessionOptions {
                attachments_enabled: false,
            },
        );

        let err = session.stage_attachments(vec![file("a.txt")]).unwrap_err();
        assert!(matches!(err, Error::AttachmentsDisabled));

        session.submit("plain").await.unwrap();
        assert!(!backend.requests()[0].is_multipart());
    }

    #[tokio::test]
    async fn test_reset() {
        let backend = Arc::new(FakeBackend::scripted([Script::Status(500, "bad")]));
        let session = session_with(&backend);

        session.stage_attachments(vec![file("a.txt")]).unwrap();
        session.select_suggestion("What can you help me with?").await.unwrap();
        session.set_input("half typed");
        assert!(session.error().is_some());
        assert!(session.highlighted_suggestion().is_some());

        session.reset();

        assert_eq!(session.messages(), vec![Message::assistant(WELCOME_MESSAGE)]);
        assert!(session.input().is_empty());
        assert!(session.error().is_none());
        assert!(session.attachments().is_empty());
        assert!(session.highlighted_suggestion().is_none());
    }

    #[tokio::test]
    async fn test_select_suggestion_submits() {
        let backend = Arc::new(FakeBackend::scripted([Script::Reply(json!({ "message": "sure" }))]));
        let session = session_with(&backend);

        let outcome = session.select_suggestion("Draft a status update").await.unwrap();
        assert!(outcome.is_replied());
        assert_eq!(
            session.highlighted_suggestion().as_deref(),
            Some("Draft a status update")
        );
        assert_eq!(session.messages()[1], Message::user("Draft a status update"));
        assert_eq!(backend.requests()[0].prompt, "Draft a status update");
    }
}
