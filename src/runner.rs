//! Query execution engine.
//!
//! Drives the evaluation loop: for every model, prompt, case and trial it
//! composes the query, asks the backend, parses the answer and records it in
//! the store and journal. Trials already present in the store are skipped, so
//! a store replayed from a journal resumes where the previous run stopped.

use crate::backend::{BackendError, ModelBackend};
use crate::cases::CaseTable;
use crate::config::PromptSpec;
use crate::journal::{JournalError, JournalRecord, JournalWriter};
use crate::prompt::{compose, prompt_key};
use crate::records::{EvaluationStore, RecordError, Trial};
use crate::response::parse_response;
use chrono::Utc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;

/// Errors that stop an evaluation run
#[derive(Error, Debug)]
pub enum RunnerError {
    #[error("Backend unavailable: {0}")]
    BackendUnavailable(#[source] BackendError),

    #[error("Record store rejected a trial: {0}")]
    Record(#[from] RecordError),

    #[error("Journal error: {0}")]
    Journal(#[from] JournalError),
}

/// Runner configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunnerConfig {
    /// Trials per (model, prompt, case)
    pub validation: usize,
    /// Extra attempts after a failed query
    pub max_retries: usize,
    /// Keep raw model output in the journal
    pub keep_raw: bool,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            validation: 1,
            max_retries: 2,
            keep_raw: false,
        }
    }
}

/// What to query
#[derive(Debug, Clone, Copy)]
pub struct QueryPlan<'a> {
    /// Models in query order
    pub models: &'a [String],
    /// Prompts in query order
    pub prompts: &'a [PromptSpec],
    /// Cases in query order
    pub cases: &'a CaseTable,
    /// Answering rules appended to each prompt
    pub rules: &'a str,
}

impl QueryPlan<'_> {
    /// Total trials in the plan
    #[must_use]
    pub fn total_trials(&self, validation: usize) -> usize {
        self.models.len() * self.prompts.len() * self.cases.len() * validation
    }
}

/// One completed trial
#[derive(Debug, Clone, Copy)]
pub struct ProgressEvent<'a> {
    /// Trials done so far, including resumed ones
    pub completed: usize,
    /// Trials in the whole plan
    pub total: usize,
    /// Model queried
    pub model: &'a str,
    /// Prompt identifier
    pub prompt: &'a str,
    /// Case identifier
    pub case_id: &'a str,
    /// 1-based trial position
    pub trial: usize,
}

impl ProgressEvent<'_> {
    /// Completed fraction in `[0, 1]`
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            1.0
        } else {
            self.completed as f64 / self.total as f64
        }
    }
}

/// Receives progress as trials complete
pub trait ProgressListener {
    /// Called after each new trial is recorded
    fn on_trial(&mut self, event: &ProgressEvent<'_>);
}

impl<F: FnMut(&ProgressEvent<'_>)> ProgressListener for F {
    fn on_trial(&mut self, event: &ProgressEvent<'_>) {
        self(event);
    }
}

/// Listener that logs progress through `tracing`
#[derive(Debug, Clone, Copy, Default)]
pub struct LogProgress;

impl ProgressListener for LogProgress {
    fn on_trial(&mut self, event: &ProgressEvent<'_>) {
        tracing::info!(
            completed = event.completed,
            total = event.total,
            model = event.model,
            prompt = event.prompt,
            case = event.case_id,
            trial = event.trial,
            "trial recorded ({:.1}%)",
            event.fraction() * 100.0
        );
    }
}

/// Shared flag that stops a run before its next query
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// Create an unset token
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation was requested
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Outcome of a run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Trials queried in this run
    pub queried: usize,
    /// Trials already present and skipped
    pub skipped: usize,
    /// Trials whose output could not be parsed
    pub failed: usize,
    /// Whether the run stopped on cancellation
    pub cancelled: bool,
}

/// Runs the query loop against a backend
pub struct TriageRunner<'b, B: ModelBackend + ?Sized> {
    backend: &'b B,
    config: RunnerConfig,
    cancel: CancelToken,
}

impl<'b, B: ModelBackend + ?Sized> TriageRunner<'b, B> {
    /// Create a runner over a backend
    #[must_use]
    pub fn new(backend: &'b B, config: RunnerConfig) -> Self {
        Self {
            backend,
            config,
            cancel: CancelToken::new(),
        }
    }

    /// Use an externally controlled cancellation token
    #[must_use]
    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Get current configuration
    #[must_use]
    pub const fn config(&self) -> &RunnerConfig {
        &self.config
    }

    /// Run every trial of the plan that the store does not already hold
    ///
    /// # Errors
    ///
    /// Returns `RunnerError::BackendUnavailable` if the backend cannot be
    /// reached or a query still fails after its retries, or an error from the
    /// store or journal. Nothing is recorded for the failed trial, so a
    /// resumed run queries it again.
    pub fn run(
        &self,
        plan: &QueryPlan<'_>,
        store: &mut EvaluationStore,
        mut journal: Option<&mut JournalWriter>,
        listener: &mut dyn ProgressListener,
    ) -> Result<RunSummary, RunnerError> {
        let validation = self.config.validation;
        let total = plan.total_trials(validation);
        let mut summary = RunSummary::default();

        self.backend
            .ensure_available()
            .map_err(RunnerError::BackendUnavailable)?;

        tracing::info!(
            backend = self.backend.name(),
            models = plan.models.len(),
            prompts = plan.prompts.len(),
            cases = plan.cases.len(),
            validation,
            total,
            "starting evaluation"
        );

        for model in plan.models {
            store.run_mut(model, validation)?;
            tracing::info!(model = %model, "querying model");

            for spec in plan.prompts {
                let prompt_id = prompt_key(spec.id);
                tracing::debug!(model = %model, prompt = %prompt_id, "querying prompt");

                for case in plan.cases.iter() {
                    let done = store.trial_count(model, &prompt_id, &case.id).min(validation);
                    summary.skipped += done;
                    if done == validation {
                        continue;
                    }
                    let query = compose(spec, case, plan.rules);

                    for trial in done + 1..=validation {
                        if self.cancel.is_cancelled() {
                            tracing::warn!(
                                completed = summary.queried + summary.skipped,
                                total,
                                "evaluation cancelled"
                            );
                            summary.cancelled = true;
                            return Ok(summary);
                        }

                        let raw = self.query_with_retries(model, &query)?;
                        let parsed = parse_response(&raw);
                        if parsed == Trial::failed() {
                            summary.failed += 1;
                        }
                        let position =
                            store.record(model, validation, &prompt_id, &case.id, parsed.clone())?;

                        if let Some(writer) = journal.as_deref_mut() {
                            writer.append(&JournalRecord {
                                model: model.clone(),
                                validation,
                                prompt: prompt_id.clone(),
                                case_id: case.id.clone(),
                                trial: position,
                                answer: parsed.answer,
                                explanation: parsed.explanation,
                                raw: self.config.keep_raw.then_some(raw),
                                recorded_at: Utc::now(),
                            })?;
                        }

                        summary.queried += 1;
                        listener.on_trial(&ProgressEvent {
                            completed: summary.queried + summary.skipped,
                            total,
                            model,
                            prompt: &prompt_id,
                            case_id: &case.id,
                            trial,
                        });
                    }
                }
            }
        }

        tracing::info!(
            queried = summary.queried,
            skipped = summary.skipped,
            failed = summary.failed,
            "evaluation finished"
        );
        Ok(summary)
    }

    /// Query once, retrying transient failures
    ///
    /// The last error is surfaced once every attempt has failed.
    fn query_with_retries(&self, model: &str, query: &str) -> Result<String, RunnerError> {
        let attempts = self.config.max_retries + 1;
        let mut attempt = 1;
        loop {
            match self.backend.query(model, query) {
                Ok(raw) => return Ok(raw),
                Err(e) if e.is_fatal() || attempt >= attempts => {
                    tracing::error!(
                        model,
                        attempt,
                        attempts,
                        error = %e,
                        "query failed, giving up"
                    );
                    return Err(RunnerError::BackendUnavailable(e));
                }
                Err(e) => {
                    tracing::warn!(model, attempt, attempts, error = %e, "query failed, retrying");
                    attempt += 1;
                }
            }
        }
    }
}
