//! Application services

pub mod chunker;
pub mod turn_controller;

pub use chunker::SpeechChunker;
pub use turn_controller::{TurnController, TurnControllerConfig, TurnControllerHandle, TurnState};
