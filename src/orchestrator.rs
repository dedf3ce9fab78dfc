//! Submission flow
//!
//! Turns user input into a generation call and folds the outcome back into
//! the conversation store. Failures never escape `submit`; they become an
//! assistant message prefixed with `Error: `.

use std::sync::Arc;
use tracing::{debug, warn};

use crate::ai::{ChatError, Generate, GenerateRequest, GenerationConfig, Search};
use crate::history::{format_history, turn_parts};
use crate::store::ConversationStore;
use crate::types::{Attachment, InputMode, Message, NewMessage};

/// Content stored when a submission carries attachments but no text.
pub const ATTACHMENTS_ONLY_CONTENT: &str = "Sent attachments";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RejectReason {
    EmptyInput,
    InFlight,
}

#[derive(Debug)]
pub enum SubmitOutcome {
    /// Nothing was appended.
    Rejected(RejectReason),
    /// The assistant replied; carries the appended message.
    Answered(Message),
    /// The failure was recorded as an assistant message.
    Failed { message: Message, error: ChatError },
    /// The conversation was cleared while this submission was in flight;
    /// its outcome was dropped.
    Superseded,
}

pub struct Orchestrator {
    store: Arc<ConversationStore>,
    backend: Arc<dyn Generate>,
    search: Arc<dyn Search>,
    instructions: Option<serde_json::Value>,
}

impl Orchestrator {
    pub fn new(
        store: Arc<ConversationStore>,
        backend: Arc<dyn Generate>,
        search: Arc<dyn Search>,
    ) -> Self {
        Self {
            store,
            backend,
            search,
            instructions: None,
        }
    }

    /// Attach an opaque instructions bundle to every request.
    pub fn with_instructions(mut self, instructions: serde_json::Value) -> Self {
        self.instructions = Some(instructions);
        self
    }

    pub fn store(&self) -> &Arc<ConversationStore> {
        &self.store
    }

    /// Submit whatever the composer currently holds.
    pub async fn submit_draft(&self, mode: InputMode) -> SubmitOutcome {
        let snapshot = self.store.snapshot();
        self.submit(&snapshot.draft, snapshot.pending_attachments, mode)
            .await
    }

    pub async fn submit(
        &self,
        input: &str,
        attachments: Vec<Attachment>,
        mode: InputMode,
    ) -> SubmitOutcome {
        if input.trim().is_empty() && attachments.is_empty() {
            return SubmitOutcome::Rejected(RejectReason::EmptyInput);
        }
        let Some(ticket) = self.store.try_begin_submission() else {
            return SubmitOutcome::Rejected(RejectReason::InFlight);
        };

        self.store.enter_chat_mode();

        if mode == InputMode::Search {
            match self.search.search(input).await {
                Ok(results) => {
                    debug!(results = results.len(), "search results stored");
                    self.store.set_search_results(results);
                }
                Err(err) => warn!("search failed, continuing with chat: {}", err),
            }
        }

        let content = if input.trim().is_empty() {
            ATTACHMENTS_ONLY_CONTENT
        } else {
            input
        };
        let Some(user_message) = self.store.add_message_for(
            ticket,
            NewMessage::user(content).with_attachments(attachments),
        ) else {
            return SubmitOutcome::Superseded;
        };

        let conversation = self.store.messages();
        let request = GenerateRequest {
            history: format_history(&conversation),
            parts: turn_parts(&user_message),
            config: GenerationConfig::default(),
            mode,
            instructions: self.instructions.clone(),
        };

        let result = self
            .backend
            .generate(&request)
            .await
            .and_then(|text| {
                let text = text.trim();
                if text.is_empty() {
                    Err(ChatError::EmptyResponse)
                } else {
                    Ok(text.to_string())
                }
            });

        match result {
            Ok(text) => {
                match self
                    .store
                    .complete_submission(ticket, NewMessage::assistant(text), true)
                {
                    Some(reply) => SubmitOutcome::Answered(reply),
                    None => SubmitOutcome::Superseded,
                }
            }
            Err(error) => {
                warn!(kind = ?error.kind(), "chat submission failed: {}", error);
                let failure = NewMessage::assistant(format!("Error: {error}"));
                match self.store.complete_submission(ticket, failure, false) {
                    Some(message) => SubmitOutcome::Failed { message, error },
                    None => SubmitOutcome::Superseded,
                }
            }
        }
    }
}
