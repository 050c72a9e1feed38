//! Ask command handler.
//!
//! Plays the role of the external caller of the `ask` boundary: loads a
//! corpus feed, assembles the pipeline, runs one question through it, and
//! prints the answer.

use clap::Args;
use concierge_core::{config::AppConfig, AppResult};
use concierge_llm::create_client;
use concierge_pipeline::{
    create_provider, AnswerSynthesizer, AskOrchestrator, CorpusFeed, Retriever, SnapshotStore,
    SynthesizerOptions,
};
use concierge_prompt::{defaults, load_prompt};
use std::path::PathBuf;
use std::sync::Arc;

/// Ask a question about the member message corpus
#[derive(Args, Debug)]
pub struct AskCommand {
    /// The question to ask
    pub question: Option<String>,

    /// Read the question from a file
    #[arg(short, long)]
    pub file: Option<PathBuf>,

    /// Path to the corpus feed JSON file
    #[arg(long, env = "CONCIERGE_CORPUS")]
    pub corpus: PathBuf,

    /// Number of candidates to retrieve (overrides config)
    #[arg(long)]
    pub top_k: Option<usize>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl AskCommand {
    /// Execute the ask command.
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing ask command");
        tracing::debug!("Ask command options: {:?}", self);

        // 1. Get the question text
        let question = self
            .get_question()
            .ok_or_else(|| concierge_core::AppError::Validation("No question provided".to_string()))?;

        // 2. Validate provider configuration before doing any work
        let mut config = config.clone();
        if let Some(top_k) = self.top_k {
            config.pipeline.top_k = top_k;
        }
        config.validate()?;

        // 3. Load the corpus feed into a snapshot store
        tracing::info!("Loading corpus feed from {:?}", self.corpus);
        let feed = CorpusFeed::from_json_file(&self.corpus)?;
        let store = Arc::new(SnapshotStore::with_feed(feed));

        // 4. Assemble the pipeline stages
        let embedding_provider = create_provider(&config.embedding)?;
        let retriever = Retriever::new(embedding_provider, config.pipeline.top_k);

        let api_key = config.resolve_api_key(&config.provider);
        let llm_client = create_client(
            &config.provider,
            config.endpoint.as_deref(),
            api_key.as_deref(),
        )
        .map_err(concierge_core::AppError::Config)?;

        let definition = load_prompt(&config.workspace, defaults::SYNTHESIZE_PROMPT_ID)?;
        let synthesizer = AnswerSynthesizer::new(
            llm_client,
            definition,
            SynthesizerOptions {
                model: config.model.clone(),
                temperature: config.pipeline.temperature,
                max_tokens: config.pipeline.max_answer_tokens,
                timeout: config.pipeline.llm_timeout(),
            },
        );

        let orchestrator =
            AskOrchestrator::new(store, retriever, synthesizer, config.pipeline.clone());

        // 5. Run the question through the pipeline
        let result = orchestrator.ask(&question).await?;

        // 6. Print the outcome
        if self.json {
            let output = serde_json::json!({
                "answer": result.answer_text,
                "grounded": result.grounded,
                "usedRecordIds": result.used_record_ids,
                "provider": config.provider,
                "model": config.model,
            });

            let json = serde_json::to_string_pretty(&output)
                .map_err(|e| concierge_core::AppError::Serialization(e.to_string()))?;
            println!("{}", json);
        } else {
            println!("{}", result.answer_text);

            if result.grounded {
                tracing::info!(
                    "Answer grounded in {} record(s)",
                    result.used_record_ids.len()
                );
            } else {
                tracing::warn!("Answer is not grounded in any retrieved record");
            }
        }

        Ok(())
    }

    /// Get the question text from the positional argument or a file.
    fn get_question(&self) -> Option<String> {
        self.question.clone().or_else(|| {
            self.file.as_ref().and_then(|path| {
                std::fs::read_to_string(path)
                    .map_err(|e| tracing::error!("Failed to read question file: {}", e))
                    .ok()
            })
        })
    }
}
