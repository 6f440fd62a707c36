//! Application layer - conversation orchestration
//!
//! Classifies recognized speech into commands, echo, and real utterances,
//! captures the user's name, chunks streamed replies for speech, and runs
//! the turn controller that ties recognition, inference, and synthesis
//! together.

pub mod classify;
pub mod error;
pub mod name_capture;
pub mod ports;
pub mod services;

pub use classify::{VoiceCommand, is_interrupt_starter, is_short_ack, looks_like_echo, normalize, parse_voice_command};
pub use error::ApplicationError;
pub use name_capture::{extract_name, strip_name_intro};
pub use ports::{InferencePort, TokenStream};
pub use services::chunker::{SpeechChunker, speakable};
pub use services::turn_controller::{
    TurnController, TurnControllerConfig, TurnControllerHandle, TurnState,
};
