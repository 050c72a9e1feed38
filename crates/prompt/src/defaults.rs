//! Built-in prompt definitions.
//!
//! The pipeline ships with a default synthesis prompt so a workspace works
//! out of the box; a file under `.concierge/prompts/` with the same id
//! overrides it.

use crate::types::{PromptBehavior, PromptDefinition, PromptOutputSpec};

/// Id of the built-in answer synthesis prompt.
pub const SYNTHESIZE_PROMPT_ID: &str = "ask.synthesize.default";

const SYNTHESIZE_SYSTEM: &str = "\
You are a concierge assistant answering questions about member-submitted messages.\n\
Answer only from the messages provided below. Each message includes the member's \
name and the date it was sent.\n\
\n\
Respond ONLY in valid JSON as:\n\
{\"answer\": \"...\", \"sources\": [1, 3]}\n\
where \"sources\" lists the numbers of the messages your answer relies on.\n\
\n\
If the messages do not contain the information needed to answer the question, \
respond with:\n\
{\"answer\": \"Insufficient information: the available messages do not answer this question.\", \"sources\": []}\n\
\n\
When mentioning dates, use the format shown in the messages. Never invent details \
that are not present in the messages.";

const SYNTHESIZE_TEMPLATE: &str = "\
Question:\n\
{{query}}\n\
\n\
Member messages:\n\
{{context}}";

/// The built-in answer synthesis prompt.
pub fn synthesize_default() -> PromptDefinition {
    PromptDefinition {
        id: SYNTHESIZE_PROMPT_ID.to_string(),
        title: "Answer synthesis over retrieved member messages".to_string(),
        api_version: "1.0".to_string(),
        behavior: PromptBehavior {
            tone: "professional".to_string(),
            style: "concise".to_string(),
        },
        system: Some(SYNTHESIZE_SYSTEM.to_string()),
        template: SYNTHESIZE_TEMPLATE.to_string(),
        output: PromptOutputSpec {
            format: "json".to_string(),
        },
    }
}
