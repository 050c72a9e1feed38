//! Member-message ask pipeline.
//!
//! Answers free-text questions about a corpus of member-submitted messages
//! by combining deterministic filtering with a single hosted-LLM call:
//!
//! 1. **Normalizer** cleans each record and flags low-information content.
//! 2. **Name classifier** resolves which member a query is about with
//!    exact, fuzzy, and pattern matching, never an LLM round-trip.
//! 3. **Relevance filter** drops acknowledgements and fragments.
//! 4. **Retriever** ranks survivors by embedding cosine similarity.
//! 5. **Answer synthesizer** makes the one LLM call and reports whether
//!    the answer is grounded in retrieved records.
//!
//! The `AskOrchestrator` sequences these stages per request over an
//! immutable corpus snapshot.

pub mod ask;
pub mod embedding;
pub mod names;
pub mod normalize;
pub mod relevance;
pub mod retrieve;
pub mod snapshot;
pub mod synth;
pub mod types;

#[cfg(test)]
mod tests;

// Re-export commonly used types
pub use ask::{AskOrchestrator, AskStage};
pub use embedding::{create_provider, EmbeddingProvider};
pub use names::NameIndex;
pub use normalize::Normalizer;
pub use retrieve::Retriever;
pub use snapshot::{CorpusFeed, CorpusSnapshot, SnapshotStore};
pub use synth::{AnswerSynthesizer, SynthesizerOptions};
pub use types::{
    AnswerResult, MatchKind, MessageRecord, NameMatch, NormalizedRecord, RetrievedCandidate,
    RetrievedSet,
};
