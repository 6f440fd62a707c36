//! Port definitions for the application layer

pub mod inference_port;

pub use inference_port::{InferencePort, TokenStream};
