//! # MTS Triage Eval
//!
//! Benchmarking harness for language-model triage against the Manchester
//! Triage System (MTS).
//!
//! Each model is asked to classify every patient case N times per prompt. The
//! repeated answers are reduced to a majority verdict and scored against the
//! ground truth, separating under-triage (a patient-safety failure) from
//! over-triage (a resource-efficiency failure).
//!
//! ## Architecture
//!
//! ```text
//! Case table (CSV) ──► Prompt composition
//!        ↓                    ↓
//! Ground truth         Model backend (ollama CLI) ──► Journal (JSONL)
//!        ↓                    ↓
//!        │            Response record store
//!        │             ↙               ↘
//!        │     Majority vote       Raw trials
//!        ↓             ↘               ↙
//!        └──────────► Metrics (accuracy, macro F1, under/over-triage)
//!                             ↓
//!                  Report (wide tables, summary, McNemar comparisons)
//! ```

pub mod backend;
pub mod cases;
pub mod config;
pub mod export;
pub mod journal;
pub mod metrics;
pub mod prompt;
pub mod records;
pub mod report;
pub mod response;
pub mod runner;
pub mod severity;
pub mod significance;
pub mod vote;

pub use backend::{missing_models, BackendError, CliBackend, ModelBackend};
pub use cases::{CaseRecord, CaseTable, CaseTableError, CaseTableStats};
pub use config::{
    BackendConfig, ConfigError, EvalConfig, EvaluationSettings, PromptSpec, ALL_MODELS,
};
pub use export::{export_report, ExportError};
pub use journal::{load_store, JournalError, JournalRecord, JournalWriter};
pub use metrics::{
    agreement_score, bootstrap_ci, classification_metrics, mode_metrics, raw_trial_metrics,
    score_model, score_prompt, ClassificationMetrics, OutcomeCounts, PromptScore, ScoringError,
    StatConfig,
};
pub use prompt::{compose, prompt_key, DEFAULT_ANSWERING_RULES};
pub use records::{
    CaseTrials, EvaluationStore, GroundTruth, ModelRun, PromptResponses, RecordError, Trial,
    TruthEntry,
};
pub use report::{FullReport, ModelSection, ReportBuilder, SummaryRow, WideTable};
pub use response::parse_response;
pub use runner::{
    CancelToken, LogProgress, ProgressEvent, ProgressListener, QueryPlan, RunSummary,
    RunnerConfig, RunnerError, TriageRunner,
};
pub use severity::{ConfusionOutcome, Prediction, SeverityLevel, UnknownSeverity};
pub use significance::{compare_models, mcnemar, ContingencyTable, McNemarResult, ModelComparison};
pub use vote::{majority_vote, MajorityVerdict};
