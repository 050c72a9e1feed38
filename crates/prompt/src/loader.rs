//! Prompt loader for YAML prompt definitions.
//!
//! Workspace files under `.concierge/prompts/<id>.yml` override the
//! built-in definitions; unknown ids with no file are an error.

use crate::defaults;
use crate::types::PromptDefinition;
use concierge_core::{AppError, AppResult};
use std::path::Path;

/// Load a prompt definition by ID from the workspace.
///
/// This function searches for a prompt file named `<id>.yml` in the
/// `.concierge/prompts/` directory and falls back to the built-in
/// definition with the same id.
///
/// # Arguments
/// * `workspace_path` - Root workspace directory containing `.concierge/`
/// * `prompt_id` - Prompt identifier (e.g., "ask.synthesize.default")
pub fn load_prompt(workspace_path: &Path, prompt_id: &str) -> AppResult<PromptDefinition> {
    let prompts_dir = workspace_path.join(".concierge/prompts");
    let prompt_file = prompts_dir.join(format!("{}.yml", prompt_id));

    tracing::debug!("Loading prompt from: {:?}", prompt_file);

    if !prompt_file.exists() {
        if let Some(builtin) = builtin_prompt(prompt_id) {
            tracing::debug!("Using built-in prompt: {}", prompt_id);
            return Ok(builtin);
        }

        return Err(AppError::Prompt(format!(
            "Prompt file not found: {:?}",
            prompt_file
        )));
    }

    let contents = std::fs::read_to_string(&prompt_file).map_err(|e| {
        AppError::Prompt(format!(
            "Failed to read prompt file {:?}: {}",
            prompt_file, e
        ))
    })?;

    let definition: PromptDefinition = serde_yaml::from_str(&contents).map_err(|e| {
        AppError::Prompt(format!(
            "Failed to parse prompt YAML {:?}: {}",
            prompt_file, e
        ))
    })?;

    // Validate required fields
    validate_prompt(&definition)?;

    tracing::info!("Loaded prompt: {} ({})", definition.id, definition.title);

    Ok(definition)
}

/// Look up a built-in prompt definition by id.
fn builtin_prompt(prompt_id: &str) -> Option<PromptDefinition> {
    if prompt_id == defaults::SYNTHESIZE_PROMPT_ID {
        Some(defaults::synthesize_default())
    } else {
        None
    }
}

/// Validate a prompt definition.
fn validate_prompt(def: &PromptDefinition) -> AppResult<()> {
    if def.id.is_empty() {
        return Err(AppError::Prompt("Prompt ID cannot be empty".to_string()));
    }

    if def.title.is_empty() {
        return Err(AppError::Prompt("Prompt title cannot be empty".to_string()));
    }

    if def.api_version.is_empty() {
        return Err(AppError::Prompt(
            "Prompt apiVersion cannot be empty".to_string(),
        ));
    }

    if def.template.is_empty() {
        return Err(AppError::Prompt(
            "Prompt template cannot be empty".to_string(),
        ));
    }

    // Validate API version format (simple check)
    if !def.api_version.contains('.') {
        return Err(AppError::Prompt(format!(
            "Invalid apiVersion format: {}. Expected format: 'x.y'",
            def.api_version
        )));
    }

    Ok(())
}
