//! Port definitions for speech devices
//!
//! Recognition and synthesis are modeled as device-side adapters: a
//! recognizer pushes [`RecognitionEvent`]s over a channel, a synthesizer
//! plays one utterance at a time and reports whether it finished.

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::SpeechError;
use crate::types::{RecognitionEvent, Utterance, VoiceInfo};

/// Port for speech recognition devices
#[async_trait]
pub trait SpeechRecognizer: Send + Sync {
    /// Open a recognition session.
    ///
    /// Events arrive on the channel handed to [`SpeechRecognizer::subscribe`]
    /// until `Ended` is delivered. Starting while a session is open is a
    /// device-dependent no-op.
    ///
    /// # Errors
    ///
    /// Returns `SpeechError` if the device refuses to open a session.
    async fn start(&self) -> Result<(), SpeechError>;

    /// Close the session gracefully, letting pending final results flush.
    async fn stop(&self) -> Result<(), SpeechError>;

    /// Tear the session down immediately, discarding pending results.
    async fn abort(&self) -> Result<(), SpeechError>;

    /// Take the event channel for this recognizer. Single consumer; calling
    /// twice returns `None`.
    fn subscribe(&self) -> Option<mpsc::Receiver<RecognitionEvent>>;
}

/// Port for speech synthesis devices
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Speak one utterance to completion.
    ///
    /// Resolves `Ok(true)` when the device finished the utterance and
    /// `Ok(false)` when it was cancelled mid-flight.
    ///
    /// # Errors
    ///
    /// Returns `SpeechError` if the device rejects the utterance outright.
    async fn speak(&self, utterance: Utterance) -> Result<bool, SpeechError>;

    /// Cut off the current utterance and drop anything the device buffered.
    fn cancel(&self);

    /// Pause the current utterance in place
    fn pause(&self);

    /// Resume a paused utterance
    fn resume(&self);

    /// Voices the device currently reports. May be empty right after startup;
    /// see [`crate::voices`] for bounded waiting.
    fn voices(&self) -> Vec<VoiceInfo>;

    /// Whether an utterance is playing right now
    fn is_speaking(&self) -> bool;
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};

    use parking_lot::Mutex;

    use super::*;

    /// Records spoken utterances; cancellation makes in-flight speech
    /// resolve `false`.
    pub struct ScriptedSynthesizer {
        pub spoken: Mutex<Vec<String>>,
        cancelled: AtomicBool,
        pub voices: Vec<VoiceInfo>,
    }

    impl ScriptedSynthesizer {
        pub fn new() -> Arc<Self> {
            Arc::new(Self {
                spoken: Mutex::new(Vec::new()),
                cancelled: AtomicBool::new(false),
                voices: Vec::new(),
            })
        }
    }

    #[async_trait]
    impl SpeechSynthesizer for ScriptedSynthesizer {
        async fn speak(&self, utterance: Utterance) -> Result<bool, SpeechError> {
            if self.cancelled.load(Ordering::SeqCst) {
                return Ok(false);
            }
            self.spoken.lock().push(utterance.text);
            tokio::task::yield_now().await;
            Ok(!self.cancelled.load(Ordering::SeqCst))
        }

        fn cancel(&self) {
            self.cancelled.store(true, Ordering::SeqCst);
        }

        fn pause(&self) {}

        fn resume(&self) {}

        fn voices(&self) -> Vec<VoiceInfo> {
            self.voices.clone()
        }

        fn is_speaking(&self) -> bool {
            false
        }
    }
}
