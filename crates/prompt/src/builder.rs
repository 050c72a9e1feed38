//! Prompt builder for rendering templates with query and context.

use crate::types::{BuiltPrompt, PromptDefinition};
use concierge_core::{AppError, AppResult};
use handlebars::Handlebars;
use std::collections::HashMap;

/// Build a prompt from a definition and input variables.
///
/// This function:
/// 1. Renders the user template using Handlebars with provided variables
/// 2. Renders the system template, if the definition has one
/// 3. Returns a `BuiltPrompt` ready for LLM execution
///
/// # Arguments
/// * `definition` - Prompt definition (built-in or loaded from YAML)
/// * `variables` - Template variables (e.g., "query", "context")
///
/// # Example
/// ```no_run
/// use concierge_prompt::{build_prompt, defaults};
/// use std::collections::HashMap;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let def = defaults::synthesize_default();
/// let mut vars = HashMap::new();
/// vars.insert("query".to_string(), "What does Hans need?".to_string());
/// vars.insert("context".to_string(), "Message 1 ...".to_string());
///
/// let built = build_prompt(&def, vars)?;
/// println!("User prompt: {}", built.user);
/// # Ok(())
/// # }
/// ```
pub fn build_prompt(
    definition: &PromptDefinition,
    variables: HashMap<String, String>,
) -> AppResult<BuiltPrompt> {
    tracing::debug!("Building prompt: {}", definition.id);

    let user = render_template(&definition.template, &variables)?;

    // System templates rarely carry variables, but render them the same way
    // so an override file may interpolate if it wants to.
    let system = match definition.system {
        Some(ref template) => Some(render_template(template, &variables)?),
        None => None,
    };

    Ok(BuiltPrompt::new(
        system,
        user,
        definition.id.clone(),
        variables,
    ))
}

/// Render a Handlebars template with variables.
fn render_template(template: &str, variables: &HashMap<String, String>) -> AppResult<String> {
    let mut handlebars = Handlebars::new();

    // Disable HTML escaping for plain text
    handlebars.register_escape_fn(handlebars::no_escape);

    // Register template
    handlebars
        .register_template_string("prompt", template)
        .map_err(|e| AppError::Prompt(format!("Failed to register template: {}", e)))?;

    // Render
    let rendered = handlebars
        .render("prompt", &variables)
        .map_err(|e| AppError::Prompt(format!("Failed to render template: {}", e)))?;

    Ok(rendered)
}
