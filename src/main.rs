//! MTS Triage Eval CLI
//!
//! Queries models on triage cases and reports their accuracy against the
//! Manchester Triage System.

use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use mts_triage_eval::{
    export_report, journal, missing_models, CaseTable, CliBackend, EvalConfig, EvaluationStore,
    JournalWriter, LogProgress, ModelBackend, QueryPlan, ReportBuilder, RunnerConfig,
    TriageRunner,
};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "mts-triage-eval")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Query models on a case table and write reports
    Evaluate {
        /// Evaluation configuration (YAML)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Case table (CSV)
        #[arg(long)]
        cases: PathBuf,

        /// Models to query (overrides config; "all" for every installed model)
        #[arg(long, value_delimiter = ',')]
        models: Vec<String>,

        /// Prompt ids to use (default: all configured)
        #[arg(long, value_delimiter = ',')]
        prompts: Vec<u32>,

        /// Trials per case (overrides config)
        #[arg(long)]
        validation: Option<usize>,

        /// First case row to use
        #[arg(long, default_value = "0")]
        offset: usize,

        /// Number of case rows to use
        #[arg(long)]
        limit: Option<usize>,

        /// Output directory for reports (default: results/<timestamp>)
        #[arg(long)]
        output: Option<PathBuf>,

        /// Trial journal (default: <output>/journal.jsonl)
        #[arg(long)]
        journal: Option<PathBuf>,

        /// Continue from an existing journal
        #[arg(long)]
        resume: bool,

        /// Keep raw model output in the journal
        #[arg(long)]
        keep_raw: bool,
    },

    /// Rebuild reports from trial journals
    Report {
        /// Journal files (glob pattern)
        #[arg(long)]
        journals: String,

        /// Case table (CSV) holding the ground truth
        #[arg(long)]
        cases: PathBuf,

        /// Evaluation configuration (YAML) for statistical settings
        #[arg(long)]
        config: Option<PathBuf>,

        /// Output directory for reports
        #[arg(long)]
        output: PathBuf,

        /// Report only cases with every trial recorded
        #[arg(long)]
        partial: bool,
    },

    /// Show case table statistics
    Cases {
        /// Case table (CSV)
        #[arg(long)]
        path: PathBuf,
    },

    /// Check the model backend and the configured models
    CheckBackend {
        /// Evaluation configuration (YAML)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Models to check (overrides config)
        #[arg(long, value_delimiter = ',')]
        models: Vec<String>,
    },
}

fn main() {
    let cli = Cli::parse();

    // Initialize tracing
    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    if let Err(e) = run(cli.command) {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

fn run(command: Commands) -> Result<()> {
    match command {
        Commands::Evaluate {
            config,
            cases,
            models,
            prompts,
            validation,
            offset,
            limit,
            output,
            journal: journal_arg,
            resume,
            keep_raw,
        } => {
            let mut config = load_config(config.as_deref())?;
            if !models.is_empty() {
                config.models = models;
            }
            if let Some(validation) = validation {
                config.evaluation.validation = validation;
            }
            let backend = CliBackend::new(config.backend.clone());
            config.expand_models(&backend.list_models())?;
            config.validate().context("invalid evaluation configuration")?;
            let prompt_set = config.select_prompts(&prompts)?;

            let table = CaseTable::load(&cases)
                .with_context(|| format!("failed to load case table {}", cases.display()))?
                .window(offset, limit);
            if table.is_empty() {
                bail!("no cases selected from {}", cases.display());
            }
            let truth = table.ground_truth()?;

            let output = output.unwrap_or_else(default_output_dir);
            std::fs::create_dir_all(&output)
                .with_context(|| format!("failed to create {}", output.display()))?;
            let journal_path = journal_arg.unwrap_or_else(|| output.join("journal.jsonl"));

            check_models(&backend, &config.models)?;

            let mut store = if journal_path.exists() {
                if !resume {
                    bail!(
                        "journal {} already exists; pass --resume to continue it",
                        journal_path.display()
                    );
                }
                journal::load_store(&journal_path)?
            } else {
                EvaluationStore::new()
            };

            tracing::info!(
                cases = table.len(),
                models = ?config.models,
                prompts = prompt_set.len(),
                validation = config.evaluation.validation,
                output = %output.display(),
                "Starting evaluation"
            );

            let plan = QueryPlan {
                models: &config.models,
                prompts: &prompt_set,
                cases: &table,
                rules: config.answering_rules(),
            };
            let runner = TriageRunner::new(
                &backend,
                RunnerConfig {
                    validation: config.evaluation.validation,
                    max_retries: config.backend.max_retries,
                    keep_raw,
                },
            );
            let summary = {
                let mut writer = JournalWriter::open(&journal_path)?;
                runner
                    .run(&plan, &mut store, Some(&mut writer), &mut LogProgress)
                    .with_context(|| {
                        format!(
                            "evaluation stopped; rerun with --resume --journal {}",
                            journal_path.display()
                        )
                    })?
            };
            println!(
                "Queried {} trials ({} resumed, {} unparseable)",
                summary.queried, summary.skipped, summary.failed
            );

            let partial = summary.cancelled || store.runs().iter().any(|r| !r.is_complete());
            let mut builder = ReportBuilder::new("MTS Triage Evaluation")
                .with_stat_config(config.stat_config())
                .partial(partial);
            builder.add_runs(store.runs());
            let report = builder.build(&truth);
            export_report(&report, &output)?;
            println!("{}", report.to_text());
            println!("Reports written to {}", output.display());
        }
        Commands::Report {
            journals,
            cases,
            config,
            output,
            partial,
        } => {
            tracing::info!(journals = %journals, output = %output.display(), "Generating report");
            let config = load_config(config.as_deref())?;
            let truth = CaseTable::load(&cases)
                .with_context(|| format!("failed to load case table {}", cases.display()))?
                .ground_truth()?;

            let store = load_journals(&journals)?;
            if store.is_empty() {
                bail!("no trials found in journals matching {journals}");
            }

            let mut builder = ReportBuilder::new("MTS Triage Evaluation")
                .with_stat_config(config.stat_config())
                .partial(partial);
            builder.add_runs(store.runs());
            let report = builder.build(&truth);
            export_report(&report, &output)?;
            println!("{}", report.to_text());
        }
        Commands::Cases { path } => {
            let table = CaseTable::load(&path)
                .with_context(|| format!("failed to load case table {}", path.display()))?;
            let stats = table.stats();
            println!("Case table: {}", path.display());
            println!("  Cases:             {}", stats.total_cases);
            println!("  Attribute columns: {}", stats.attribute_columns);
            println!("  By severity:");
            for (label, count) in &stats.by_severity {
                println!("    {label:<10} {count}");
            }
            table
                .ground_truth()
                .context("case table has invalid ground truth")?;
        }
        Commands::CheckBackend { config, models } => {
            let mut config = load_config(config.as_deref())?;
            if !models.is_empty() {
                config.models = models;
            }
            let backend = CliBackend::new(config.backend.clone());
            backend.ensure_available()?;
            println!("Backend {}: available", backend.name());

            let installed = backend.list_models();
            println!("Installed models:");
            for model in &installed {
                println!("  {model}");
            }
            if !config.wants_all_models() {
                check_models(&backend, &config.models)?;
                println!("All {} configured models are installed", config.models.len());
            }
        }
    }

    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<EvalConfig> {
    path.map_or_else(
        || Ok(EvalConfig::default()),
        |path| {
            EvalConfig::load(path)
                .with_context(|| format!("failed to load config {}", path.display()))
        },
    )
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("results").join(Utc::now().format("%Y%m%d_%H%M%S").to_string())
}

/// Fail if the backend lists its models and some requested ones are absent
fn check_models(backend: &CliBackend, models: &[String]) -> Result<()> {
    let installed = backend.list_models();
    if installed.is_empty() {
        tracing::debug!("backend does not list models, skipping model check");
        return Ok(());
    }
    let missing = missing_models(models, &installed);
    if !missing.is_empty() {
        bail!("models not installed: {}", missing.join(", "));
    }
    Ok(())
}

/// Replay every journal matching a glob, in path order, into one store
fn load_journals(pattern: &str) -> Result<EvaluationStore> {
    let mut paths: Vec<PathBuf> = glob::glob(pattern)
        .with_context(|| format!("invalid glob pattern {pattern}"))?
        .filter_map(std::result::Result::ok)
        .collect();
    paths.sort();

    let mut store = EvaluationStore::new();
    for path in &paths {
        let records = journal::read_journal(path)?;
        journal::replay(&records, &mut store)
            .with_context(|| format!("failed to replay {}", path.display()))?;
        tracing::info!(journal = %path.display(), trials = records.len(), "journal loaded");
    }
    Ok(store)
}
