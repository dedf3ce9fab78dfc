//! Application session lifecycle
//!
//! A `ChatSession` is created once per run and owns the store, the
//! orchestrator and the microphone. `reset` and `shutdown` are the only
//! teardown paths and both release the microphone.

use parking_lot::Mutex;
use std::sync::Arc;
use tracing::info;

use crate::capture::{AudioSource, CaptureError, CaptureSession};
use crate::orchestrator::{Orchestrator, SubmitOutcome};
use crate::store::ConversationStore;
use crate::types::{Attachment, InputMode};

pub struct ChatSession {
    orchestrator: Orchestrator,
    capture: Mutex<CaptureSession>,
}

impl ChatSession {
    pub fn new(orchestrator: Orchestrator) -> Self {
        info!(
            restored = orchestrator.store().messages().len(),
            "chat session started"
        );
        Self {
            orchestrator,
            capture: Mutex::new(CaptureSession::new()),
        }
    }

    pub fn store(&self) -> &Arc<ConversationStore> {
        self.orchestrator.store()
    }

    pub fn orchestrator(&self) -> &Orchestrator {
        &self.orchestrator
    }

    /// Submit the current draft and pending attachments in the active mode.
    pub async fn submit(&self) -> SubmitOutcome {
        let mode = self.store().input_mode();
        self.orchestrator.submit_draft(mode).await
    }

    pub fn start_recording(&self, source: &mut dyn AudioSource) -> Result<(), CaptureError> {
        self.capture.lock().start(source)?;
        self.store().set_input_mode(InputMode::Voice);
        Ok(())
    }

    pub fn push_audio(&self, chunk: &[u8]) {
        self.capture.lock().push_chunk(chunk);
    }

    /// Stop recording and queue the audio as a pending attachment.
    pub fn stop_recording(&self) -> Result<Attachment, CaptureError> {
        let recording = self.capture.lock().stop()?;
        self.store().add_pending_attachment(recording.clone());
        self.store().set_input_mode(InputMode::Normal);
        Ok(recording)
    }

    pub fn is_recording(&self) -> bool {
        self.capture.lock().is_recording()
    }

    /// Back to the welcome state with an empty conversation.
    pub fn reset(&self) {
        self.capture.lock().abort();
        self.store().clear_messages();
    }

    pub fn shutdown(self) {
        self.capture.lock().abort();
        self.store().shutdown();
        info!("chat session closed");
    }
}
