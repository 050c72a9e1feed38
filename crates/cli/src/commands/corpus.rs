//! Corpus command handler.
//!
//! Read-only inspection of a corpus feed file: record and member counts,
//! low-information share, and the member roster.

use clap::{Args, Subcommand};
use concierge_core::{config::AppConfig, AppResult};
use concierge_pipeline::{CorpusFeed, CorpusSnapshot, Normalizer};
use std::collections::BTreeSet;
use std::path::PathBuf;

/// Inspect a corpus feed file
#[derive(Args, Debug)]
pub struct CorpusCommand {
    #[command(subcommand)]
    command: CorpusSubcommand,
}

#[derive(Subcommand, Debug)]
enum CorpusSubcommand {
    /// Show corpus statistics
    Stats {
        /// Path to the corpus feed JSON file
        #[arg(long, env = "CONCIERGE_CORPUS")]
        corpus: PathBuf,
    },

    /// List the members present in the corpus
    Members {
        /// Path to the corpus feed JSON file
        #[arg(long, env = "CONCIERGE_CORPUS")]
        corpus: PathBuf,
    },
}

impl CorpusCommand {
    /// Execute the corpus command.
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        match &self.command {
            CorpusSubcommand::Stats { corpus } => self.stats(config, corpus),
            CorpusSubcommand::Members { corpus } => self.members(corpus),
        }
    }

    fn stats(&self, config: &AppConfig, corpus: &PathBuf) -> AppResult<()> {
        let feed = CorpusFeed::from_json_file(corpus)?;
        let snapshot = CorpusSnapshot::build(feed, 1);

        let normalizer = Normalizer::new(config.pipeline.min_tokens);
        let normalized: Vec<_> = snapshot
            .records()
            .iter()
            .map(|r| normalizer.normalize(r))
            .collect();

        let low_information = normalized.iter().filter(|r| r.is_low_information).count();
        let actionable = normalized
            .iter()
            .filter(|r| !r.is_low_information && r.quality_score >= config.pipeline.quality_cutoff)
            .count();

        let oldest = snapshot.records().iter().map(|r| r.timestamp).min();
        let newest = snapshot.records().iter().map(|r| r.timestamp).max();

        println!("Records:          {}", snapshot.records().len());
        println!("Members:          {}", snapshot.member_count());
        println!("Low-information:  {}", low_information);
        println!("Actionable:       {}", actionable);

        if let (Some(oldest), Some(newest)) = (oldest, newest) {
            println!(
                "Time range:       {} - {}",
                oldest.format("%Y-%m-%d"),
                newest.format("%Y-%m-%d")
            );
        }

        Ok(())
    }

    fn members(&self, corpus: &PathBuf) -> AppResult<()> {
        let feed = CorpusFeed::from_json_file(corpus)?;

        let mut members: BTreeSet<String> = BTreeSet::new();
        for record in &feed.items {
            if !record.user_name.trim().is_empty() {
                members.insert(record.user_name.clone());
            }
        }

        for name in &members {
            println!("{}", name);
        }

        tracing::info!("{} member(s) in corpus", members.len());

        Ok(())
    }
}
