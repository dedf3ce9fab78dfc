//! Conversation store
//!
//! Owns the ordered message list plus the transient UI state around it
//! (loading flag, input mode, search results, draft). Every mutation notifies
//! observers and persists `{messages, isChatMode}` to durable storage.
//!
//! Each submission holds a [`SubmissionTicket`]. Clearing the conversation
//! invalidates outstanding tickets, so a reply that arrives afterwards is
//! dropped instead of landing in the fresh conversation.

use parking_lot::{Mutex, ReentrantMutex};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::storage::{
    CHAT_STORAGE_KEY, KeyValueStorage, SESSION_MARKER_KEY, StorageError,
};
use crate::types::{Attachment, InputMode, Message, NewMessage, SearchResult, now_millis};

/// Read-only view of the store handed to observers.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ChatSnapshot {
    pub messages: Vec<Message>,
    pub is_loading: bool,
    pub is_chat_mode: bool,
    pub input_mode: InputMode,
    pub search_results: Vec<SearchResult>,
    pub draft: String,
    pub pending_attachments: Vec<Attachment>,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PersistedChat {
    messages: Vec<Message>,
    is_chat_mode: bool,
}

pub type SubscriptionId = u64;

/// Proof that the caller claimed the loading flag. Stale once the
/// conversation is cleared or another submission starts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SubmissionTicket(u64);

#[derive(Default)]
struct StoreState {
    chat: ChatSnapshot,
    epoch: u64,
}

type Observer = Arc<dyn Fn(&ChatSnapshot) + Send + Sync>;

#[derive(Default)]
struct Observers {
    next_id: SubscriptionId,
    entries: Vec<(SubscriptionId, Observer)>,
}

pub struct ConversationStore {
    state: Mutex<StoreState>,
    observers: Mutex<Observers>,
    /// Serializes mutations with their notifications.
    delivery: ReentrantMutex<()>,
    durable: Arc<dyn KeyValueStorage>,
}

impl ConversationStore {
    /// Load persisted state, honoring it only when the session marker is
    /// already present. A new session discards the durable log first.
    pub fn hydrate(
        durable: Arc<dyn KeyValueStorage>,
        session: &dyn KeyValueStorage,
    ) -> Result<Self, StorageError> {
        let mut state = StoreState::default();

        if session.get(SESSION_MARKER_KEY)?.is_none() {
            durable.remove(CHAT_STORAGE_KEY)?;
            session.set(SESSION_MARKER_KEY, "active")?;
            info!("new chat session, discarded persisted conversation");
        } else if let Some(raw) = durable.get(CHAT_STORAGE_KEY)? {
            match serde_json::from_str::<PersistedChat>(&raw) {
                Ok(persisted) => {
                    debug!(messages = persisted.messages.len(), "restored conversation");
                    state.chat.messages = persisted.messages;
                    state.chat.is_chat_mode = persisted.is_chat_mode;
                }
                Err(err) => warn!("ignoring unreadable persisted conversation: {}", err),
            }
        }

        Ok(Self {
            state: Mutex::new(state),
            observers: Mutex::new(Observers::default()),
            delivery: ReentrantMutex::new(()),
            durable,
        })
    }

    pub fn snapshot(&self) -> ChatSnapshot {
        self.state.lock().chat.clone()
    }

    pub fn messages(&self) -> Vec<Message> {
        self.state.lock().chat.messages.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.state.lock().chat.is_loading
    }

    pub fn is_chat_mode(&self) -> bool {
        self.state.lock().chat.is_chat_mode
    }

    pub fn input_mode(&self) -> InputMode {
        self.state.lock().chat.input_mode
    }

    pub fn subscribe(
        &self,
        observer: impl Fn(&ChatSnapshot) + Send + Sync + 'static,
    ) -> SubscriptionId {
        let mut observers = self.observers.lock();
        observers.next_id += 1;
        let id = observers.next_id;
        observers.entries.push((id, Arc::new(observer)));
        id
    }

    pub fn unsubscribe(&self, id: SubscriptionId) {
        self.observers.lock().entries.retain(|(entry, _)| *entry != id);
    }

    /// Append a message with a fresh id and timestamp. Content is trimmed.
    pub fn add_message(&self, message: NewMessage) -> Message {
        self.mutate(|state| append(state, message))
    }

    /// Append on behalf of a submission. `None` when the ticket went stale.
    pub fn add_message_for(
        &self,
        ticket: SubmissionTicket,
        message: NewMessage,
    ) -> Option<Message> {
        self.mutate_state(|state| {
            (state.epoch == ticket.0).then(|| append(&mut state.chat, message))
        })
    }

    /// Record the reply and release the loading flag in one step. On success
    /// the composer is reset too. A stale ticket changes nothing.
    pub fn complete_submission(
        &self,
        ticket: SubmissionTicket,
        reply: NewMessage,
        succeeded: bool,
    ) -> Option<Message> {
        let stored = self.mutate_state(|state| {
            if state.epoch != ticket.0 {
                return None;
            }
            let stored = append(&mut state.chat, reply);
            state.chat.is_loading = false;
            if succeeded {
                reset_composer(&mut state.chat);
            }
            Some(stored)
        });
        if stored.is_none() {
            debug!("discarding reply for a cleared conversation");
        }
        stored
    }

    pub fn set_loading(&self, loading: bool) {
        self.mutate(|state| state.is_loading = loading);
    }

    /// Claim the loading flag. `None` when a submission already holds it.
    pub fn try_begin_submission(&self) -> Option<SubmissionTicket> {
        let ticket = self.mutate_state(|state| {
            if state.chat.is_loading {
                return None;
            }
            state.chat.is_loading = true;
            state.epoch += 1;
            Some(SubmissionTicket(state.epoch))
        });
        if ticket.is_none() {
            debug!("submission rejected, another one is in flight");
        }
        ticket
    }

    pub fn set_chat_mode(&self, chat_mode: bool) {
        self.mutate(|state| state.is_chat_mode = chat_mode);
    }

    /// welcome → chat; no-op when already chatting.
    pub fn enter_chat_mode(&self) {
        if !self.is_chat_mode() {
            self.set_chat_mode(true);
        }
    }

    pub fn set_input_mode(&self, mode: InputMode) {
        self.mutate(|state| state.input_mode = mode);
    }

    pub fn set_search_results(&self, results: Vec<SearchResult>) {
        self.mutate(|state| state.search_results = results);
    }

    pub fn set_draft(&self, draft: impl Into<String>) {
        let draft = draft.into();
        self.mutate(|state| state.draft = draft);
    }

    pub fn add_pending_attachment(&self, attachment: Attachment) {
        self.mutate(|state| state.pending_attachments.push(attachment));
    }

    pub fn remove_pending_attachment(&self, index: usize) -> Option<Attachment> {
        self.mutate(|state| {
            (index < state.pending_attachments.len())
                .then(|| state.pending_attachments.remove(index))
        })
    }

    /// Reset after a successful submission.
    pub fn clear_composer(&self) {
        self.mutate(reset_composer);
    }

    /// Back to the welcome state. Outstanding submission tickets go stale.
    pub fn clear_messages(&self) {
        self.mutate_state(|state| {
            state.chat = ChatSnapshot::default();
            state.epoch += 1;
        });
        info!("conversation cleared");
    }

    /// Final persistence write; observers are dropped.
    pub fn shutdown(&self) {
        self.persist(&self.state.lock().chat);
        self.observers.lock().entries.clear();
    }

    fn mutate<R>(&self, apply: impl FnOnce(&mut ChatSnapshot) -> R) -> R {
        self.mutate_state(|state| apply(&mut state.chat))
    }

    /// Apply and persist under the state lock, then notify in mutation order.
    /// `delivery` is taken first so an observer may mutate the store again.
    fn mutate_state<R>(&self, apply: impl FnOnce(&mut StoreState) -> R) -> R {
        let _delivery = self.delivery.lock();
        let (result, snapshot) = {
            let mut state = self.state.lock();
            let result = apply(&mut state);
            self.persist(&state.chat);
            (result, state.chat.clone())
        };
        self.notify(&snapshot);
        result
    }

    fn persist(&self, snapshot: &ChatSnapshot) {
        let persisted = PersistedChat {
            messages: snapshot.messages.clone(),
            is_chat_mode: snapshot.is_chat_mode,
        };
        let written = serde_json::to_string(&persisted)
            .map_err(StorageError::from)
            .and_then(|raw| self.durable.set(CHAT_STORAGE_KEY, &raw));
        if let Err(err) = written {
            warn!("failed to persist conversation: {}", err);
        }
    }

    fn notify(&self, snapshot: &ChatSnapshot) {
        let observers: Vec<Observer> = self
            .observers
            .lock()
            .entries
            .iter()
            .map(|(_, observer)| observer.clone())
            .collect();
        for observer in observers {
            observer(snapshot);
        }
    }
}

fn append(chat: &mut ChatSnapshot, message: NewMessage) -> Message {
    let floor = chat.messages.last().map_or(i64::MIN, |m| m.timestamp);
    let stored = Message {
        id: Uuid::new_v4().simple().to_string(),
        role: message.role,
        content: message.content.trim().to_string(),
        timestamp: now_millis().max(floor),
        attachments: message.attachments,
    };
    chat.messages.push(stored.clone());
    debug!(id = %stored.id, role = stored.role.as_str(), "message added");
    stored
}

fn reset_composer(chat: &mut ChatSnapshot) {
    chat.draft.clear();
    chat.pending_attachments.clear();
    chat.input_mode = InputMode::Normal;
}
