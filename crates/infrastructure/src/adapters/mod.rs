//! Adapters binding external services to application ports

mod nvidia_inference;

pub use nvidia_inference::NvidiaInference;
