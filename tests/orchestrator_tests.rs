//! Integration tests for the submission flow
//!
//! Backends are scripted in-process; the network failure case goes through a
//! real `RemoteBackend` pointed at a port nobody listens on.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::Notify;

use orhen::ai::{
    ChatError, ChatResult, DemoSearch, Generate, GenerateRequest, RemoteBackend, Search,
};
use orhen::history::TurnRole;
use orhen::orchestrator::{Orchestrator, RejectReason, SubmitOutcome};
use orhen::storage::MemoryStorage;
use orhen::store::ConversationStore;
use orhen::types::{Attachment, InputMode, NewMessage, Role, SearchResult};

/// Replies with a fixed text and records every request.
struct Fixed {
    reply: String,
    seen: Mutex<Vec<GenerateRequest>>,
}

impl Fixed {
    fn new(reply: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: reply.to_string(),
            seen: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl Generate for Fixed {
    async fn generate(&self, request: &GenerateRequest) -> ChatResult<String> {
        self.seen.lock().push(request.clone());
        Ok(self.reply.clone())
    }
}

/// Call `n` waits on `gates[n]` and then answers `"reply n"`.
struct Gated {
    gates: Vec<Notify>,
    calls: AtomicUsize,
}

impl Gated {
    fn new(calls: usize) -> Arc<Self> {
        Arc::new(Self {
            gates: (0..calls).map(|_| Notify::new()).collect(),
            calls: AtomicUsize::new(0),
        })
    }

    async fn wait_for_calls(&self, count: usize) {
        while self.calls.load(Ordering::SeqCst) < count {
            tokio::task::yield_now().await;
        }
    }

    fn release(&self, call: usize) {
        self.gates[call].notify_one();
    }
}

#[async_trait]
impl Generate for Gated {
    async fn generate(&self, _request: &GenerateRequest) -> ChatResult<String> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        self.gates[call].notified().await;
        Ok(format!("reply {call}"))
    }
}

fn spawn_submit(
    orchestrator: &Arc<Orchestrator>,
    input: &'static str,
) -> tokio::task::JoinHandle<SubmitOutcome> {
    let orchestrator = orchestrator.clone();
    tokio::spawn(async move {
        orchestrator
            .submit(input, Vec::new(), InputMode::Normal)
            .await
    })
}

async fn wait_for_messages(orchestrator: &Orchestrator, count: usize) {
    while orchestrator.store().messages().len() < count {
        tokio::task::yield_now().await;
    }
}

struct BrokenSearch;

#[async_trait]
impl Search for BrokenSearch {
    async fn search(&self, _query: &str) -> ChatResult<Vec<SearchResult>> {
        Err(ChatError::service(503, "UNAVAILABLE", "search is down"))
    }
}

fn store() -> Arc<ConversationStore> {
    Arc::new(ConversationStore::hydrate(Arc::new(MemoryStorage::new()), &MemoryStorage::new()).unwrap())
}

fn error_messages(store: &ConversationStore) -> usize {
    store
        .messages()
        .iter()
        .filter(|m| m.role == Role::Assistant && m.content.starts_with("Error: "))
        .count()
}

mod guard_tests {
    use super::*;

    #[tokio::test]
    async fn test_blank_input_is_a_no_op() {
        let orchestrator = Orchestrator::new(store(), Fixed::new("hi"), Arc::new(DemoSearch));
        let outcome = orchestrator.submit("   \n", Vec::new(), InputMode::Normal).await;

        assert!(matches!(outcome, SubmitOutcome::Rejected(RejectReason::EmptyInput)));
        let snapshot = orchestrator.store().snapshot();
        assert!(snapshot.messages.is_empty());
        assert!(!snapshot.is_chat_mode);
        assert!(!snapshot.is_loading);
    }

    #[tokio::test]
    async fn test_submission_while_loading_is_a_no_op() {
        let backend = Gated::new(1);
        let orchestrator = Arc::new(Orchestrator::new(
            store(),
            backend.clone(),
            Arc::new(DemoSearch),
        ));

        let first = spawn_submit(&orchestrator, "first");
        wait_for_messages(&orchestrator, 1).await;
        assert!(orchestrator.store().is_loading());

        let second = orchestrator
            .submit("second", Vec::new(), InputMode::Normal)
            .await;
        assert!(matches!(second, SubmitOutcome::Rejected(RejectReason::InFlight)));
        assert_eq!(orchestrator.store().messages().len(), 1);

        backend.release(0);
        assert!(matches!(first.await.unwrap(), SubmitOutcome::Answered(_)));
        assert_eq!(orchestrator.store().messages().len(), 2);
        assert!(!orchestrator.store().is_loading());
    }

    #[tokio::test]
    async fn test_reply_after_clear_is_dropped() {
        let backend = Gated::new(2);
        let orchestrator = Arc::new(Orchestrator::new(
            store(),
            backend.clone(),
            Arc::new(DemoSearch),
        ));

        let first = spawn_submit(&orchestrator, "before clear");
        backend.wait_for_calls(1).await;
        orchestrator.store().clear_messages();

        let second = spawn_submit(&orchestrator, "after clear");
        backend.wait_for_calls(2).await;

        backend.release(0);
        assert!(matches!(first.await.unwrap(), SubmitOutcome::Superseded));
        let messages = orchestrator.store().messages();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].content, "after clear");
        assert!(orchestrator.store().is_loading());

        backend.release(1);
        let SubmitOutcome::Answered(reply) = second.await.unwrap() else {
            panic!("expected the newer submission to answer");
        };
        assert_eq!(reply.content, "reply 1");
        assert_eq!(orchestrator.store().messages().len(), 2);
        assert!(!orchestrator.store().is_loading());
    }
}

mod failure_tests {
    use super::*;

    #[tokio::test]
    async fn test_empty_reply_becomes_error_message() {
        let orchestrator = Orchestrator::new(store(), Fixed::new("  \n "), Arc::new(DemoSearch));
        let outcome = orchestrator.submit("hi", Vec::new(), InputMode::Normal).await;

        let SubmitOutcome::Failed { message, error } = outcome else {
            panic!("expected a failure");
        };
        assert!(matches!(error, ChatError::EmptyResponse));
        assert_eq!(message.content, "Error: Empty response from AI model");
        assert!(!orchestrator.store().is_loading());
    }

    #[tokio::test]
    async fn test_network_failure_records_one_error_and_keeps_draft() {
        // Port 9 (discard) is closed on test hosts.
        let backend = Arc::new(RemoteBackend::new("http://127.0.0.1:9"));
        let orchestrator = Orchestrator::new(store(), backend, Arc::new(DemoSearch));
        let image = Attachment {
            mime_type: "image/png".into(),
            url: "data:image/png;base64,AAAA".into(),
            name: "a.png".into(),
        };
        orchestrator.store().set_draft("hello");
        orchestrator.store().add_pending_attachment(image);

        let outcome = orchestrator.submit_draft(InputMode::Normal).await;
        assert!(matches!(outcome, SubmitOutcome::Failed { .. }));

        let snapshot = orchestrator.store().snapshot();
        assert_eq!(snapshot.messages.len(), 2);
        assert_eq!(snapshot.messages[0].role, Role::User);
        assert_eq!(error_messages(orchestrator.store()), 1);
        assert!(!snapshot.is_loading);
        assert_eq!(snapshot.draft, "hello");
        assert_eq!(snapshot.pending_attachments.len(), 1);
    }

    #[tokio::test]
    async fn test_search_failure_does_not_block_chat() {
        let backend = Fixed::new("answer");
        let orchestrator = Orchestrator::new(store(), backend.clone(), Arc::new(BrokenSearch));
        let outcome = orchestrator.submit("rust", Vec::new(), InputMode::Search).await;

        assert!(matches!(outcome, SubmitOutcome::Answered(_)));
        assert!(orchestrator.store().snapshot().search_results.is_empty());
        assert_eq!(backend.seen.lock()[0].mode, InputMode::Search);
    }
}

mod history_tests {
    use super::*;

    #[tokio::test]
    async fn test_search_results_are_stored() {
        let orchestrator = Orchestrator::new(store(), Fixed::new("answer"), Arc::new(DemoSearch));
        orchestrator.submit("rust", Vec::new(), InputMode::Search).await;

        let results = orchestrator.store().snapshot().search_results;
        assert_eq!(results.len(), 3);
        assert!(results[0].snippet.ends_with("rust"));
    }

    #[tokio::test]
    async fn test_history_skips_system_and_current_message() {
        let backend = Fixed::new("second answer");
        let orchestrator = Orchestrator::new(store(), backend.clone(), Arc::new(DemoSearch));
        orchestrator.store().add_message(NewMessage {
            role: Role::System,
            content: "be brief".into(),
            attachments: None,
        });
        orchestrator.store().add_message(NewMessage::user("first"));
        orchestrator.store().add_message(NewMessage::assistant("first answer"));

        orchestrator.submit("second", Vec::new(), InputMode::Normal).await;

        let seen = backend.seen.lock();
        let history = &seen[0].history;
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].role, TurnRole::User);
        assert_eq!(history[0].parts[0].as_text(), Some("first"));
        assert_eq!(history[1].role, TurnRole::Model);
        assert_eq!(seen[0].parts[0].as_text(), Some("second"));
    }

    #[tokio::test]
    async fn test_instructions_are_forwarded() {
        let backend = Fixed::new("ok");
        let orchestrator = Orchestrator::new(store(), backend.clone(), Arc::new(DemoSearch))
            .with_instructions(orhen::instructions::instructions_value());
        orchestrator.submit("hi", Vec::new(), InputMode::Normal).await;

        let seen = backend.seen.lock();
        let instructions = seen[0].instructions.as_ref().unwrap();
        assert!(instructions.get("systemInstructions").is_some());
    }
}
