//! Answer synthesis.
//!
//! Turns the retrieved candidates into a grounded natural-language answer
//! with exactly one LLM call per query. The deterministic stages have
//! already resolved member disambiguation and noise filtering, so the
//! synthesizer never needs a "which member is this about" round-trip; it
//! is also unreachable without a `RetrievedSet`, which only the retriever
//! can construct.

use crate::types::{AnswerResult, RetrievedSet};
use concierge_core::{AppError, AppResult};
use concierge_llm::{LlmClient, LlmRequest};
use concierge_prompt::{build_prompt, PromptDefinition};
use serde::Deserialize;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Duration;

/// Tuning for the synthesis LLM call.
#[derive(Debug, Clone)]
pub struct SynthesizerOptions {
    /// Model identifier passed to the provider
    pub model: String,

    /// Sampling temperature (low for factual answers)
    pub temperature: f32,

    /// Token budget for the answer
    pub max_tokens: u32,

    /// Deadline for the LLM call
    pub timeout: Duration,
}

/// The synthesizer's expected reply shape.
#[derive(Debug, Deserialize)]
struct SynthesisReply {
    answer: String,
    #[serde(default)]
    sources: Vec<usize>,
}

/// Answer synthesizer over an LLM client.
pub struct AnswerSynthesizer {
    client: Arc<dyn LlmClient>,
    definition: PromptDefinition,
    options: SynthesizerOptions,
}

impl AnswerSynthesizer {
    /// Create a synthesizer from a client, a prompt definition, and options.
    pub fn new(
        client: Arc<dyn LlmClient>,
        definition: PromptDefinition,
        options: SynthesizerOptions,
    ) -> Self {
        Self {
            client,
            definition,
            options,
        }
    }

    /// Synthesize an answer for the query from the retrieved candidates.
    ///
    /// An empty candidate set short-circuits to an ungrounded
    /// "insufficient information" result without invoking the LLM.
    pub async fn synthesize(
        &self,
        query: &str,
        retrieved: &RetrievedSet,
    ) -> AppResult<AnswerResult> {
        if retrieved.is_empty() {
            tracing::info!("No candidates to synthesize from; skipping LLM call");
            return Ok(AnswerResult::insufficient_information());
        }

        let context = build_context(retrieved);

        let mut variables = HashMap::new();
        variables.insert("query".to_string(), query.to_string());
        variables.insert("context".to_string(), context);

        let built = build_prompt(&self.definition, variables)?;

        let mut request = LlmRequest::new(built.user, &self.options.model)
            .with_temperature(self.options.temperature)
            .with_max_tokens(self.options.max_tokens);

        if let Some(system) = built.system {
            request = request.with_system(system);
        }

        tracing::info!(
            provider = self.client.provider_name(),
            model = %self.options.model,
            candidates = retrieved.len(),
            "Synthesizing answer"
        );

        let response = tokio::time::timeout(self.options.timeout, self.client.complete(&request))
            .await
            .map_err(|_| {
                AppError::Upstream(format!(
                    "LLM call timed out after {}s",
                    self.options.timeout.as_secs()
                ))
            })??;

        let reply = parse_reply(&response.content)?;
        Ok(resolve_reply(reply, retrieved))
    }
}

/// Format the retrieved candidates into the prompt context, one block per
/// message with the member name and a human-readable date.
fn build_context(retrieved: &RetrievedSet) -> String {
    retrieved
        .candidates()
        .iter()
        .map(|candidate| {
            format!(
                "Message {} ({}, {}):\n{}",
                candidate.rank,
                candidate.record.record.user_name,
                candidate.record.record.timestamp.format("%B %d, %Y"),
                candidate.record.clean_text
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Parse the model's JSON reply, tolerating a markdown code fence around it.
fn parse_reply(content: &str) -> AppResult<SynthesisReply> {
    let stripped = strip_code_fence(content.trim());

    serde_json::from_str(stripped).map_err(|e| {
        AppError::Upstream(format!("Synthesizer returned malformed output: {}", e))
    })
}

/// Remove a surrounding markdown code fence, if present.
fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };

    // Drop the fence's language tag line and the closing fence.
    let body = rest.split_once('\n').map(|(_, b)| b).unwrap_or(rest);
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

/// Map cited ranks back to record ids and decide groundedness.
fn resolve_reply(reply: SynthesisReply, retrieved: &RetrievedSet) -> AnswerResult {
    let mut used_record_ids = BTreeSet::new();

    for rank in reply.sources {
        match retrieved.by_rank(rank) {
            Some(candidate) => {
                used_record_ids.insert(candidate.record.record.id.clone());
            }
            None => {
                tracing::warn!(rank, "Synthesizer cited an out-of-range message; ignoring");
            }
        }
    }

    let grounded = !used_record_ids.is_empty();

    if !grounded {
        tracing::info!("Synthesizer cited no sources; answer is ungrounded");
    }

    AnswerResult {
        answer_text: reply.answer,
        grounded,
        used_record_ids,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::support::{retrieved_set_of, ScriptedLlm};
    use concierge_prompt::defaults;

    fn options() -> SynthesizerOptions {
        SynthesizerOptions {
            model: "llama3.2".to_string(),
            temperature: 0.2,
            max_tokens: 512,
            timeout: Duration::from_secs(5),
        }
    }

    fn synthesizer(client: Arc<ScriptedLlm>) -> AnswerSynthesizer {
        AnswerSynthesizer::new(client, defaults::synthesize_default(), options())
    }

    #[tokio::test]
    async fn test_empty_set_short_circuits_without_llm_call() {
        let client = Arc::new(ScriptedLlm::with_reply("{}"));
        let synth = synthesizer(client.clone());

        let result = synth
            .synthesize("What does Hans need?", &RetrievedSet::empty())
            .await
            .unwrap();

        assert!(!result.grounded);
        assert!(result.used_record_ids.is_empty());
        assert!(result.answer_text.contains("Insufficient information"));
        assert_eq!(client.call_count(), 0);
    }

    #[tokio::test]
    async fn test_exactly_one_llm_call() {
        let client = Arc::new(ScriptedLlm::with_reply(
            r#"{"answer": "Hans needs a first-class booking.", "sources": [1]}"#,
        ));
        let synth = synthesizer(client.clone());

        let set = retrieved_set_of(&[("m-1", "book the first class for two on November 10")]);
        let result = synth.synthesize("What does Hans need?", &set).await.unwrap();

        assert_eq!(client.call_count(), 1);
        assert!(result.grounded);
        assert!(result.used_record_ids.contains("m-1"));
    }

    #[tokio::test]
    async fn test_fenced_json_reply_is_accepted() {
        let client = Arc::new(ScriptedLlm::with_reply(
            "```json\n{\"answer\": \"A table for four.\", \"sources\": [1]}\n```",
        ));
        let synth = synthesizer(client);

        let set = retrieved_set_of(&[("m-1", "reserve a table for four")]);
        let result = synth.synthesize("What did he ask for?", &set).await.unwrap();

        assert!(result.grounded);
        assert_eq!(result.answer_text, "A table for four.");
    }

    #[tokio::test]
    async fn test_malformed_reply_is_retryable_upstream_error() {
        let client = Arc::new(ScriptedLlm::with_reply("the model rambled instead of JSON"));
        let synth = synthesizer(client);

        let set = retrieved_set_of(&[("m-1", "book a flight")]);
        let err = synth.synthesize("What?", &set).await.unwrap_err();

        assert!(matches!(err, AppError::Upstream(_)));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_llm_error_propagates_as_upstream() {
        let client = Arc::new(ScriptedLlm::with_error("connection refused"));
        let synth = synthesizer(client);

        let set = retrieved_set_of(&[("m-1", "book a flight")]);
        let err = synth.synthesize("What?", &set).await.unwrap_err();

        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_timeout_is_upstream_error() {
        let client = Arc::new(ScriptedLlm::with_delay(
            r#"{"answer": "too late", "sources": []}"#,
            Duration::from_millis(200),
        ));
        let mut opts = options();
        opts.timeout = Duration::from_millis(20);
        let synth =
            AnswerSynthesizer::new(client, defaults::synthesize_default(), opts);

        let set = retrieved_set_of(&[("m-1", "book a flight")]);
        let err = synth.synthesize("What?", &set).await.unwrap_err();

        assert!(matches!(err, AppError::Upstream(_)));
        assert!(err.to_string().contains("timed out"));
    }

    #[tokio::test]
    async fn test_out_of_range_citation_dropped() {
        let client = Arc::new(ScriptedLlm::with_reply(
            r#"{"answer": "Something.", "sources": [1, 7]}"#,
        ));
        let synth = synthesizer(client);

        let set = retrieved_set_of(&[("m-1", "book a flight")]);
        let result = synth.synthesize("What?", &set).await.unwrap();

        assert!(result.grounded);
        assert_eq!(result.used_record_ids.len(), 1);
        assert!(result.used_record_ids.contains("m-1"));
    }

    #[tokio::test]
    async fn test_no_citations_means_ungrounded() {
        let client = Arc::new(ScriptedLlm::with_reply(
            r#"{"answer": "Insufficient information: nothing relevant.", "sources": []}"#,
        ));
        let synth = synthesizer(client);

        let set = retrieved_set_of(&[("m-1", "book a flight")]);
        let result = synth.synthesize("What?", &set).await.unwrap();

        assert!(!result.grounded);
        assert!(result.used_record_ids.is_empty());
    }

    #[test]
    fn test_strip_code_fence_variants() {
        assert_eq!(strip_code_fence("{\"a\": 1}"), "{\"a\": 1}");
        assert_eq!(strip_code_fence("```json\n{\"a\": 1}\n```"), "{\"a\": 1}");
        assert_eq!(strip_code_fence("```\n{\"a\": 1}\n```"), "{\"a\": 1}");
    }

    #[test]
    fn test_build_context_includes_names_and_dates() {
        let set = retrieved_set_of(&[("m-1", "book the first class for two on November 10")]);
        let context = build_context(&set);

        assert!(context.contains("Message 1"));
        assert!(context.contains("Hans Müller"));
        assert!(context.contains("November 01, 2025"));
        assert!(context.contains("book the first class"));
    }
}
