//! Concierge Core Library
//!
//! This crate provides the foundational utilities for the concierge
//! pipeline:
//! - Error handling (`AppError`, `AppResult`)
//! - Logging infrastructure
//! - Configuration management

pub mod config;
pub mod error;
pub mod logging;

// Re-export commonly used types
pub use config::{AppConfig, EmbeddingSettings, PipelineConfig};
pub use error::{AppError, AppResult};
