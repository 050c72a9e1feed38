//! Prompt system for the concierge pipeline.
//!
//! This crate provides structured prompt management with:
//! - Built-in default definitions (answer synthesis)
//! - YAML-based workspace overrides
//! - Handlebars template rendering

pub mod builder;
pub mod defaults;
pub mod loader;
pub mod types;

// Re-export main types
pub use builder::build_prompt;
pub use loader::load_prompt;
pub use types::{
    BuiltPrompt, BuiltPromptMetadata, PromptBehavior, PromptDefinition, PromptOutputSpec,
};
