//! Speech processing errors

use thiserror::Error;

/// Errors that can occur while driving a speech device
#[derive(Debug, Error)]
pub enum SpeechError {
    /// The device does not support the requested capability
    #[error("Speech capability not available: {0}")]
    NotAvailable(String),

    /// Recognition session failed
    #[error("Recognition failed: {0}")]
    RecognitionFailed(String),

    /// Microphone access was denied
    #[error("Microphone access denied")]
    PermissionDenied,

    /// Synthesis of an utterance failed
    #[error("Synthesis failed: {0}")]
    SynthesisFailed(String),

    /// The speech queue's worker has shut down
    #[error("Speech queue closed")]
    QueueClosed,

    /// Timeout while waiting on the device
    #[error("Speech device timeout after {0}ms")]
    Timeout(u64),
}
