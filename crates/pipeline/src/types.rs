//! Pipeline type definitions.
//!
//! The data model flows strictly forward: a raw `MessageRecord` becomes a
//! `NormalizedRecord`, survives the deterministic filters, is wrapped in a
//! `RetrievedCandidate` by the retriever, and contributes to the final
//! `AnswerResult`, the only entity returned across the system boundary.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A raw member-submitted message from the ingestion feed.
///
/// Owned by the external ingestion collaborator; the pipeline only reads it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageRecord {
    /// Unique, stable record identifier
    pub id: String,

    /// Unique member identifier
    pub user_id: String,

    /// Member display name (may contain non-ASCII)
    pub user_name: String,

    /// When the message was submitted (UTC)
    pub timestamp: DateTime<Utc>,

    /// Raw message text, possibly empty or fragmentary
    pub message: String,
}

/// A message record after normalization.
///
/// Created fresh per query evaluation pass and never persisted.
#[derive(Debug, Clone)]
pub struct NormalizedRecord {
    /// The underlying raw record
    pub record: MessageRecord,

    /// Whitespace- and punctuation-normalized text
    pub clean_text: String,

    /// True for fragments and pure acknowledgements
    pub is_low_information: bool,

    /// Heuristic quality score in 0.0-1.0
    pub quality_score: f32,
}

impl NormalizedRecord {
    /// Record id shorthand.
    pub fn id(&self) -> &str {
        &self.record.id
    }

    /// Member id shorthand.
    pub fn user_id(&self) -> &str {
        &self.record.user_id
    }
}

/// How a member identity was matched in a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchKind {
    /// Case-insensitive verbatim hit of a corpus name in the query
    Exact,
    /// Edit-distance similarity hit above the configured floor
    Fuzzy,
    /// Name-shaped token with no corpus counterpart; logged, never emitted
    /// as a match
    Pattern,
}

/// A candidate member identity for a query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NameMatch {
    /// Matched member id
    pub user_id: String,

    /// Matched member display name
    pub user_name: String,

    /// How the match was made
    pub match_kind: MatchKind,

    /// Match confidence in 0.0-1.0 (1.0 for exact)
    pub confidence: f32,

    /// Length of the matched span, for specificity tie-breaking
    pub matched_span: usize,
}

/// One retrieval result: a normalized record with its similarity score.
#[derive(Debug, Clone)]
pub struct RetrievedCandidate {
    /// The retrieved record
    pub record: NormalizedRecord,

    /// Cosine similarity between query and record text
    pub similarity_score: f32,

    /// 1-based rank in the retrieval ordering
    pub rank: usize,
}

/// The ordered retrieval output for one query.
///
/// Only the retriever can construct this type, which makes the answer
/// synthesizer unreachable without a pre-filtered candidate set. The
/// one-LLM-call-per-request invariant is structural, not a convention.
#[derive(Debug, Clone, Default)]
pub struct RetrievedSet {
    candidates: Vec<RetrievedCandidate>,
}

impl RetrievedSet {
    /// Construct a set from ranked candidates. Crate-private on purpose.
    pub(crate) fn new(candidates: Vec<RetrievedCandidate>) -> Self {
        Self { candidates }
    }

    /// An empty retrieval result: a valid terminal state, not an error.
    pub(crate) fn empty() -> Self {
        Self::default()
    }

    /// The ranked candidates, best first.
    pub fn candidates(&self) -> &[RetrievedCandidate] {
        &self.candidates
    }

    /// Candidate with the given 1-based rank, if any.
    pub fn by_rank(&self, rank: usize) -> Option<&RetrievedCandidate> {
        self.candidates.get(rank.checked_sub(1)?)
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }
}

/// The answer returned across the system boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerResult {
    /// Natural-language answer text
    pub answer_text: String,

    /// True only if the answer cites at least one retrieved record
    pub grounded: bool,

    /// Ids of the records the answer actually referenced
    pub used_record_ids: BTreeSet<String>,
}

impl AnswerResult {
    /// An ungrounded "insufficient information" result.
    pub fn insufficient_information() -> Self {
        Self {
            answer_text:
                "Insufficient information: the available messages do not answer this question."
                    .to_string(),
            grounded: false,
            used_record_ids: BTreeSet::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_record() -> MessageRecord {
        MessageRecord {
            id: "m-1".to_string(),
            user_id: "u-1".to_string(),
            user_name: "Hans Müller".to_string(),
            timestamp: Utc.with_ymd_and_hms(2025, 11, 1, 9, 30, 0).unwrap(),
            message: "book the first class for two".to_string(),
        }
    }

    #[test]
    fn test_message_record_json_roundtrip() {
        let record = sample_record();
        let json = serde_json::to_string(&record).unwrap();
        let parsed: MessageRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.id, "m-1");
        assert_eq!(parsed.user_name, "Hans Müller");
        assert_eq!(parsed.timestamp, record.timestamp);
    }

    #[test]
    fn test_retrieved_set_by_rank() {
        let record = NormalizedRecord {
            record: sample_record(),
            clean_text: "book the first class for two".to_string(),
            is_low_information: false,
            quality_score: 0.9,
        };
        let set = RetrievedSet::new(vec![RetrievedCandidate {
            record,
            similarity_score: 0.8,
            rank: 1,
        }]);

        assert_eq!(set.len(), 1);
        assert!(set.by_rank(1).is_some());
        assert!(set.by_rank(0).is_none());
        assert!(set.by_rank(2).is_none());
    }

    #[test]
    fn test_insufficient_information_is_ungrounded() {
        let result = AnswerResult::insufficient_information();
        assert!(!result.grounded);
        assert!(result.used_record_ids.is_empty());
        assert!(result.answer_text.contains("Insufficient information"));
    }

    #[test]
    fn test_match_kind_serialization() {
        assert_eq!(serde_json::to_string(&MatchKind::Exact).unwrap(), "\"exact\"");
        assert_eq!(serde_json::to_string(&MatchKind::Fuzzy).unwrap(), "\"fuzzy\"");
    }
}
