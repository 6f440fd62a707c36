//! Speech I/O abstractions for Parley
//!
//! Ports for speech recognition and synthesis devices, a serialized speech
//! queue that plays utterances one at a time, and voice selection helpers.

pub mod error;
pub mod ports;
pub mod queue;
pub mod types;
pub mod voices;

pub use error::SpeechError;
pub use ports::{SpeechRecognizer, SpeechSynthesizer};
pub use queue::{SpeechQueue, SpokenOutcome};
pub use types::{
    RecognitionEvent, SpeakOptions, TranscriptEvent, Utterance, VoiceGender, VoiceInfo,
};
pub use voices::pick_preferred_voice;
