//! Generate command - Build a website from a checklist.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use sitefab_core::{FactoryConfig, GenerationReport, PipelineController};
use sitefab_kb::MemoryKnowledgeStore;
use sitefab_spec::ChecklistReader;

use super::Failure;

#[derive(Args)]
pub struct GenerateArgs {
    /// Checklist file (JSON or YAML)
    #[arg(short, long)]
    pub checklist: PathBuf,

    /// Directory under which the site folder is created
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Scaffold project copied into the site before generation
    #[arg(long)]
    pub scaffold: Option<PathBuf>,

    /// Use an in-memory knowledge base for this run
    #[arg(long)]
    pub no_kb: bool,

    /// Print the final report as JSON
    #[arg(long)]
    pub json: bool,
}

pub async fn execute(args: GenerateArgs, config_path: Option<&Path>, quiet: bool) -> Result<()> {
    let checklist = ChecklistReader::read(&args.checklist)
        .with_context(|| format!("Failed to read checklist {:?}", args.checklist))?;

    let mut config = FactoryConfig::load(config_path).context("Failed to load configuration")?;
    if let Some(output) = args.output {
        config = config.with_output_root(output);
    }
    if let Some(scaffold) = args.scaffold {
        config = config.with_scaffold_dir(scaffold);
    }

    let mut controller = PipelineController::from_config(config)?;
    if args.no_kb {
        info!("Knowledge base disabled for this run");
        controller = controller.with_knowledge_store(Arc::new(MemoryKnowledgeStore::new()));
    }

    let cancel = CancellationToken::new();
    let interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling generation");
            interrupt.cancel();
        }
    });

    let progress = if quiet {
        None
    } else {
        let mut receiver = controller.subscribe();
        Some(tokio::spawn(async move {
            let mut last = None;
            while receiver.changed().await.is_ok() {
                let phase = receiver.borrow_and_update().phase;
                if last != Some(phase) {
                    eprintln!("▶ {}", phase);
                    last = Some(phase);
                }
            }
        }))
    };

    println!("🏗️  Generating website from {}", args.checklist.display());
    let report = controller.run(&checklist, cancel).await;
    if let Some(progress) = progress {
        progress.abort();
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }

    if !report.is_success() {
        return Err(Failure::GenerationFailed(report.message).into());
    }
    Ok(())
}

fn print_report(report: &GenerationReport) {
    println!();
    if report.is_success() {
        println!("✅ {}", report.message);
    } else {
        println!("❌ {}", report.message);
    }
    if let Some(path) = &report.output_path {
        println!("   Output: {}", path.display());
    }
    println!(
        "   Components: {}  Pages: {}  Recovery attempts: {}",
        report.components_generated, report.pages_generated, report.total_attempts
    );
    println!(
        "   Tests passed: {}",
        if report.tests_passed { "yes" } else { "no" }
    );

    for unit in &report.failed_units {
        println!("   ⚠️  {} is failing", unit.id);
        print_failure(&unit.last_log, &unit.root_causes);
    }

    if let Some(unresolved) = &report.unresolved {
        println!("   ❌ Unresolved failure in {}", unresolved.scope);
        print_failure(&unresolved.last_log, &unresolved.root_causes);
    }
}

fn print_failure(last_log: &str, root_causes: &[String]) {
    for (attempt, cause) in root_causes.iter().enumerate() {
        println!("      attempt {}: {}", attempt + 1, cause);
    }
    for line in last_log.lines().take(12) {
        println!("      | {}", line);
    }
}
