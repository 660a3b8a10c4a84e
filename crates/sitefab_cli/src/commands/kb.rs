//! Knowledge base commands - Inspect verified fixes.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use serde_json::json;
use tracing::info;

use sitefab_core::FactoryConfig;
use sitefab_kb::{fingerprint, Fingerprint, JsonlKnowledgeStore, KnowledgeStore};

#[derive(Args)]
pub struct KbArgs {
    #[command(subcommand)]
    pub command: KbCommand,
}

#[derive(Subcommand)]
pub enum KbCommand {
    /// Show entry counts per error category
    Stats {
        /// Knowledge base file (overrides configuration)
        #[arg(long)]
        path: Option<PathBuf>,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Find recorded fixes for an error log
    Search {
        /// File containing the error log
        log: PathBuf,

        /// Number of similar incidents to show
        #[arg(short, default_value_t = 3)]
        k: usize,

        /// Knowledge base file (overrides configuration)
        #[arg(long)]
        path: Option<PathBuf>,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
}

fn open_store(path: Option<PathBuf>, config_path: Option<&Path>) -> Result<JsonlKnowledgeStore> {
    let path = match path {
        Some(path) => path,
        None => FactoryConfig::load(config_path)?.kb_path,
    };
    info!("Using knowledge base {:?}", path);
    Ok(JsonlKnowledgeStore::new(path))
}

pub async fn execute(args: KbArgs, config_path: Option<&Path>) -> Result<()> {
    match args.command {
        KbCommand::Stats { path, json } => stats(open_store(path, config_path)?, json).await,
        KbCommand::Search { log, k, path, json } => {
            search(open_store(path, config_path)?, &log, k, json).await
        }
    }
}

async fn stats(store: JsonlKnowledgeStore, as_json: bool) -> Result<()> {
    let stats = store
        .stats()
        .await
        .context("Failed to read knowledge base")?;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
        return Ok(());
    }

    println!("📚 {}", store.path().display());
    println!("   Entries: {}", stats.entries);
    println!("   Distinct signatures: {}", stats.distinct_signatures);
    for (category, count) in &stats.by_category {
        println!("     {:<16} {}", category, count);
    }
    Ok(())
}

async fn search(store: JsonlKnowledgeStore, log_path: &Path, k: usize, as_json: bool) -> Result<()> {
    let log = std::fs::read_to_string(log_path)
        .with_context(|| format!("Failed to read log {:?}", log_path))?;
    let signature = fingerprint(&log);

    let known = store
        .lookup_exact(&signature)
        .await
        .context("Failed to read knowledge base")?;
    let occurrences = store.occurrences(&signature).await?;
    let similar = store.lookup_similar(&log, k).await?;

    if as_json {
        let output = json!({
            "signature": signature,
            "occurrences": occurrences,
            "known_solution": known,
            "similar": similar,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!("🔎 {}", signature);
    if let Some(summary) = Fingerprint::summary(&log) {
        println!("   {}", summary);
    }

    match known {
        Some(entry) => {
            println!("   ✅ Known fix ({} on record)", occurrences);
            println!("      File: {}", entry.fix.file);
            println!("      Root cause: {}", entry.root_cause);
            println!("      Recorded: {} (attempt {})", entry.timestamp, entry.attempt);
        }
        None => println!("   No fix recorded for this signature"),
    }

    if !similar.is_empty() {
        println!("   Similar incidents:");
        for scored in &similar {
            println!(
                "     {:.2}  {}  {}",
                scored.score, scored.entry.signature, scored.entry.root_cause
            );
        }
    }
    Ok(())
}
