//! Microphone capture session
//!
//! `Idle → Recording → Finalizing → Idle`. Every exit path (explicit stop,
//! abort on reset, drop) goes through `release`, which stops the stream
//! exactly once.

use tracing::{debug, info};

use crate::attachments::attachment_from_bytes;
use crate::types::Attachment;

pub const RECORDING_NAME: &str = "recording.wav";
pub const RECORDING_MIME: &str = "audio/wav";

#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    #[error("Error accessing microphone: {0}")]
    Unavailable(String),

    #[error("Recording already in progress")]
    AlreadyRecording,

    #[error("No recording in progress")]
    NotRecording,
}

/// An open audio input. Dropping it must not be relied on for release.
pub trait AudioStream: Send {
    /// Stop every track and close the device.
    fn stop(&mut self);
}

/// Grants access to an audio input device.
pub trait AudioSource: Send {
    fn open(&mut self) -> Result<Box<dyn AudioStream>, CaptureError>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CaptureState {
    Idle,
    Recording,
    Finalizing,
}

pub struct CaptureSession {
    state: CaptureState,
    stream: Option<Box<dyn AudioStream>>,
    chunks: Vec<Vec<u8>>,
}

impl Default for CaptureSession {
    fn default() -> Self {
        Self::new()
    }
}

impl CaptureSession {
    pub fn new() -> Self {
        Self {
            state: CaptureState::Idle,
            stream: None,
            chunks: Vec::new(),
        }
    }

    pub fn state(&self) -> CaptureState {
        self.state
    }

    pub fn is_recording(&self) -> bool {
        self.state == CaptureState::Recording
    }

    pub fn start(&mut self, source: &mut dyn AudioSource) -> Result<(), CaptureError> {
        if self.state != CaptureState::Idle {
            return Err(CaptureError::AlreadyRecording);
        }
        self.stream = Some(source.open()?);
        self.chunks.clear();
        self.state = CaptureState::Recording;
        info!("recording started");
        Ok(())
    }

    /// Buffer audio delivered by the device. Ignored unless recording.
    pub fn push_chunk(&mut self, chunk: &[u8]) {
        if self.is_recording() {
            self.chunks.push(chunk.to_vec());
        }
    }

    /// Finish recording and hand back the audio as an attachment.
    pub fn stop(&mut self) -> Result<Attachment, CaptureError> {
        if self.state != CaptureState::Recording {
            return Err(CaptureError::NotRecording);
        }
        self.state = CaptureState::Finalizing;
        let audio: Vec<u8> = self.chunks.drain(..).flatten().collect();
        self.release();
        debug!(bytes = audio.len(), "recording finalized");
        Ok(attachment_from_bytes(RECORDING_NAME, RECORDING_MIME, &audio))
    }

    /// Discard any recording in progress.
    pub fn abort(&mut self) {
        if self.state != CaptureState::Idle {
            info!("recording aborted");
        }
        self.chunks.clear();
        self.release();
    }

    fn release(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            stream.stop();
        }
        self.state = CaptureState::Idle;
    }
}

impl Drop for CaptureSession {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Counts how many times streams it opened were stopped.
    #[derive(Clone, Default)]
    pub struct FakeMicrophone {
        pub stops: Arc<AtomicUsize>,
        pub deny: bool,
    }

    struct FakeStream {
        stops: Arc<AtomicUsize>,
    }

    impl AudioStream for FakeStream {
        fn stop(&mut self) {
            self.stops.fetch_add(1, Ordering::SeqCst);
        }
    }

    impl AudioSource for FakeMicrophone {
        fn open(&mut self) -> Result<Box<dyn AudioStream>, CaptureError> {
            if self.deny {
                return Err(CaptureError::Unavailable("permission denied".into()));
            }
            Ok(Box::new(FakeStream {
                stops: self.stops.clone(),
            }))
        }
    }

    impl FakeMicrophone {
        pub fn stop_count(&self) -> usize {
            self.stops.load(Ordering::SeqCst)
        }
    }
}
