//! Ask orchestration.
//!
//! Sequences the pipeline stages for one request and enforces the
//! deterministic-filter-first contract: normalization, name
//! classification, and relevance filtering always run locally before
//! retrieval and the single synthesis call. Stages are strictly
//! sequential because each narrows the candidate set the next one
//! consumes.

use crate::normalize::Normalizer;
use crate::relevance::filter_relevant;
use crate::retrieve::Retriever;
use crate::snapshot::{CorpusSnapshot, SnapshotStore};
use crate::synth::AnswerSynthesizer;
use crate::types::{AnswerResult, NameMatch, NormalizedRecord};
use concierge_core::{AppError, AppResult, PipelineConfig};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::Instrument;

/// Per-request pipeline stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AskStage {
    Received,
    Normalized,
    NameFiltered,
    RelevanceFiltered,
    Retrieved,
    Synthesized,
    Done,
    Failed,
}

impl std::fmt::Display for AskStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            AskStage::Received => "RECEIVED",
            AskStage::Normalized => "NORMALIZED",
            AskStage::NameFiltered => "NAME_FILTERED",
            AskStage::RelevanceFiltered => "RELEVANCE_FILTERED",
            AskStage::Retrieved => "RETRIEVED",
            AskStage::Synthesized => "SYNTHESIZED",
            AskStage::Done => "DONE",
            AskStage::Failed => "FAILED",
        };
        f.write_str(name)
    }
}

/// Tracks the stage of one in-flight request.
struct StageTracker {
    stage: AskStage,
}

impl StageTracker {
    fn new() -> Self {
        tracing::debug!(stage = %AskStage::Received, "Stage transition");
        Self {
            stage: AskStage::Received,
        }
    }

    fn advance(&mut self, next: AskStage) {
        tracing::debug!(from = %self.stage, to = %next, "Stage transition");
        self.stage = next;
    }

    fn fail(&mut self) -> AskStage {
        let from = self.stage;
        self.stage = AskStage::Failed;
        tracing::debug!(from = %from, to = %AskStage::Failed, "Stage transition");
        from
    }
}

/// The ask orchestrator.
///
/// One instance serves many concurrent requests: it holds only shared
/// read-only state (the snapshot store and stage components), so `ask`
/// calls are independently schedulable across tasks.
pub struct AskOrchestrator {
    store: Arc<SnapshotStore>,
    normalizer: Normalizer,
    retriever: Retriever,
    synthesizer: AnswerSynthesizer,
    config: PipelineConfig,
}

impl AskOrchestrator {
    /// Assemble the orchestrator from its stages.
    pub fn new(
        store: Arc<SnapshotStore>,
        retriever: Retriever,
        synthesizer: AnswerSynthesizer,
        config: PipelineConfig,
    ) -> Self {
        Self {
            normalizer: Normalizer::new(config.min_tokens),
            store,
            retriever,
            synthesizer,
            config,
        }
    }

    /// Answer a free-text question about the member corpus.
    ///
    /// Returns a structured error on failure, never a partial
    /// `AnswerResult`. An empty candidate set is not a failure: it
    /// surfaces as an ungrounded answer.
    pub async fn ask(&self, query: &str) -> AppResult<AnswerResult> {
        let request_id = uuid::Uuid::new_v4();
        let span = tracing::info_span!("ask", %request_id);

        async {
            let mut tracker = StageTracker::new();

            match self.run(query, &mut tracker).await {
                Ok(answer) => {
                    tracker.advance(AskStage::Done);
                    Ok(answer)
                }
                Err(e) => {
                    let failed_at = tracker.fail();
                    tracing::error!(stage = %failed_at, error = %e, "Ask request failed");
                    Err(e)
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn run(&self, query: &str, tracker: &mut StageTracker) -> AppResult<AnswerResult> {
        let query = query.trim();
        if query.is_empty() {
            return Err(AppError::Validation(
                "Please provide a question about a member's messages.".to_string(),
            ));
        }

        let snapshot = self.store.current();
        tracing::debug!(
            version = snapshot.version(),
            records = snapshot.records().len(),
            "Using corpus snapshot"
        );

        // Stage 1: normalize every record fresh for this pass.
        let normalized: Vec<NormalizedRecord> = snapshot
            .records()
            .iter()
            .map(|r| self.normalizer.normalize(r))
            .collect();
        tracker.advance(AskStage::Normalized);

        // Stage 2: deterministic name classification over the query.
        let matches = snapshot
            .name_index()
            .classify(query, self.config.fuzzy_floor);

        verify_matches(&matches, &snapshot)?;

        let candidates = restrict_to_matches(normalized, &matches);
        tracker.advance(AskStage::NameFiltered);

        // Stage 3: drop noise before retrieval.
        let relevant = filter_relevant(candidates, self.config.quality_cutoff);
        tracker.advance(AskStage::RelevanceFiltered);

        // Stage 4: semantic retrieval over what survived.
        let retrieved = self.retriever.retrieve(query, relevant).await?;

        for candidate in retrieved.candidates() {
            if !snapshot.contains_record(candidate.record.id()) {
                return Err(AppError::Consistency(format!(
                    "Retrieved candidate references unknown record '{}'",
                    candidate.record.id()
                )));
            }
        }
        tracker.advance(AskStage::Retrieved);

        // Stage 5: the single LLM call (or its short-circuit).
        let answer = self.synthesizer.synthesize(query, &retrieved).await?;
        tracker.advance(AskStage::Synthesized);

        Ok(answer)
    }
}

/// Reject matches that reference members missing from the snapshot.
fn verify_matches(matches: &[NameMatch], snapshot: &CorpusSnapshot) -> AppResult<()> {
    for m in matches {
        if !snapshot.contains_user(&m.user_id) {
            return Err(AppError::Consistency(format!(
                "Name match references unknown member '{}'",
                m.user_id
            )));
        }
    }
    Ok(())
}

/// Restrict records to matched members; with no match, the whole corpus
/// stays eligible and the relevance filter alone narrows it.
fn restrict_to_matches(
    records: Vec<NormalizedRecord>,
    matches: &[NameMatch],
) -> Vec<NormalizedRecord> {
    if matches.is_empty() {
        tracing::debug!("No name match; keeping full corpus as candidate set");
        return records;
    }

    let matched_ids: HashSet<&str> = matches.iter().map(|m| m.user_id.as_str()).collect();
    let kept: Vec<NormalizedRecord> = records
        .into_iter()
        .filter(|r| matched_ids.contains(r.user_id()))
        .collect();

    tracing::debug!(
        members = matched_ids.len(),
        records = kept.len(),
        "Restricted candidates to matched members"
    );

    kept
}
