//! Infrastructure layer for Parley
//!
//! Configuration loading, tracing setup, and the adapter that puts the
//! NVIDIA client behind the application's inference port.

pub mod adapters;
pub mod config;
pub mod telemetry;

pub use adapters::NvidiaInference;
pub use config::{AppConfig, Environment, ServerConfig};
pub use telemetry::init_telemetry;
