//! Shared fixtures for pipeline tests.

use crate::types::{MessageRecord, NormalizedRecord, RetrievedCandidate, RetrievedSet};
use chrono::{TimeZone, Utc};
use concierge_core::{AppError, AppResult};
use concierge_llm::{LlmClient, LlmRequest, LlmResponse, LlmUsage};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// A scripted LLM client with a call counter.
///
/// Returns a fixed reply (or error) on every `complete` call, optionally
/// after a delay, and counts invocations so tests can assert the
/// one-call-per-request invariant.
pub struct ScriptedLlm {
    reply: Result<String, String>,
    delay: Option<Duration>,
    calls: AtomicUsize,
}

impl ScriptedLlm {
    /// Reply with the given content on every call.
    pub fn with_reply(content: impl Into<String>) -> Self {
        Self {
            reply: Ok(content.into()),
            delay: None,
            calls: AtomicUsize::new(0),
        }
    }

    /// Fail every call with an upstream error.
    pub fn with_error(message: impl Into<String>) -> Self {
        Self {
            reply: Err(message.into()),
            delay: None,
            calls: AtomicUsize::new(0),
        }
    }

    /// Reply with the given content after a delay.
    pub fn with_delay(content: impl Into<String>, delay: Duration) -> Self {
        Self {
            reply: Ok(content.into()),
            delay: Some(delay),
            calls: AtomicUsize::new(0),
        }
    }

    /// Number of `complete` calls made so far.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl LlmClient for ScriptedLlm {
    fn provider_name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        match &self.reply {
            Ok(content) => Ok(LlmResponse {
                content: content.clone(),
                model: request.model.clone(),
                usage: LlmUsage::new(100, 50),
            }),
            Err(message) => Err(AppError::Upstream(message.clone())),
        }
    }
}

/// Build a message record with fixture defaults.
pub fn message_record(
    id: &str,
    user_id: &str,
    user_name: &str,
    message: &str,
    day: u32,
) -> MessageRecord {
    MessageRecord {
        id: id.to_string(),
        user_id: user_id.to_string(),
        user_name: user_name.to_string(),
        timestamp: Utc.with_ymd_and_hms(2025, 11, day, 9, 0, 0).unwrap(),
        message: message.to_string(),
    }
}

/// Build a retrieved set from (id, text) pairs, ranks in order.
pub fn retrieved_set_of(entries: &[(&str, &str)]) -> RetrievedSet {
    let candidates = entries
        .iter()
        .enumerate()
        .map(|(i, (id, text))| RetrievedCandidate {
            record: NormalizedRecord {
                record: message_record(id, "u-1", "Hans Müller", text, 1),
                clean_text: text.to_string(),
                is_low_information: false,
                quality_score: 0.9,
            },
            similarity_score: 0.9 - (i as f32) * 0.05,
            rank: i + 1,
        })
        .collect();

    RetrievedSet::new(candidates)
}
