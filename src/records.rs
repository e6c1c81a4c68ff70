//! Response record store.
//!
//! Holds raw trial results as an explicit `model -> prompt -> case -> trials`
//! structure. Runs are append-only so that results can be fed in one trial at
//! a time and partial reports regenerated at any point; reporting validates the
//! shape of a run before it reads it.

use crate::severity::{
    Prediction, SeverityLevel, UnknownSeverity, FAILED_ANSWER, FAILED_EXPLANATION,
};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use thiserror::Error;

/// Errors raised by the record store
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RecordError {
    #[error("validation count must be at least 1, got {0}")]
    InvalidValidation(usize),

    #[error("model {model}: case {case_id} already has {validation} trials for prompt {prompt}")]
    TrialOverflow {
        model: String,
        prompt: String,
        case_id: String,
        validation: usize,
    },

    #[error("model {model}: prompt {prompt} case set differs (missing: {missing:?}, extra: {extra:?})")]
    InconsistentCases {
        model: String,
        prompt: String,
        missing: Vec<String>,
        extra: Vec<String>,
    },

    #[error("model {model}: case {case_id} of prompt {prompt} has {found} trials, expected {expected}")]
    IncompleteTrials {
        model: String,
        prompt: String,
        case_id: String,
        expected: usize,
        found: usize,
    },

    #[error("model {model} was recorded with {existing} trials per case, not {requested}")]
    ValidationMismatch {
        model: String,
        existing: usize,
        requested: usize,
    },

    #[error("model {0} has no recorded responses")]
    EmptyRun(String),

    #[error("duplicate case ID: {0}")]
    DuplicateCase(String),

    #[error("case {case_id}: {source}")]
    UnknownLabel {
        case_id: String,
        #[source]
        source: UnknownSeverity,
    },
}

/// One model invocation result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trial {
    /// Severity label as answered (or the failure sentinel)
    pub answer: String,
    /// Free-text justification
    pub explanation: String,
}

impl Trial {
    /// Create a trial from an answer and explanation
    #[must_use]
    pub fn new(answer: impl Into<String>, explanation: impl Into<String>) -> Self {
        Self {
            answer: answer.into(),
            explanation: explanation.into(),
        }
    }

    /// The sentinel trial recorded when model output could not be parsed
    #[must_use]
    pub fn failed() -> Self {
        Self::new(FAILED_ANSWER, FAILED_EXPLANATION)
    }

    /// Interpret the answer against the severity scale
    #[must_use]
    pub fn prediction(&self) -> Prediction {
        Prediction::from_answer(&self.answer)
    }
}

/// Ordered trials for one (model, prompt, case) triple
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaseTrials {
    case_id: String,
    trials: Vec<Trial>,
}

impl CaseTrials {
    /// Create an empty trial sequence
    #[must_use]
    pub fn new(case_id: impl Into<String>) -> Self {
        Self {
            case_id: case_id.into(),
            trials: Vec::new(),
        }
    }

    /// Create a trial sequence from trials in generation order
    #[must_use]
    pub fn from_trials(case_id: impl Into<String>, trials: Vec<Trial>) -> Self {
        Self {
            case_id: case_id.into(),
            trials,
        }
    }

    /// Case identifier
    #[must_use]
    pub fn case_id(&self) -> &str {
        &self.case_id
    }

    /// Trials in generation order (trial 1 first)
    #[must_use]
    pub fn trials(&self) -> &[Trial] {
        &self.trials
    }

    /// Number of trials recorded
    #[must_use]
    pub fn len(&self) -> usize {
        self.trials.len()
    }

    /// Whether no trial has been recorded yet
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.trials.is_empty()
    }

    /// Predictions in generation order
    #[must_use]
    pub fn predictions(&self) -> Vec<Prediction> {
        self.trials.iter().map(Trial::prediction).collect()
    }
}

/// All case trials recorded for one prompt, in first-seen case order
#[derive(Debug, Clone, Default)]
pub struct PromptResponses {
    prompt_id: String,
    cases: Vec<CaseTrials>,
    index: HashMap<String, usize>,
}

impl PromptResponses {
    fn new(prompt_id: &str) -> Self {
        Self {
            prompt_id: prompt_id.to_string(),
            ..Self::default()
        }
    }

    /// Prompt identifier
    #[must_use]
    pub fn prompt_id(&self) -> &str {
        &self.prompt_id
    }

    /// Case trials in first-seen order
    #[must_use]
    pub fn cases(&self) -> &[CaseTrials] {
        &self.cases
    }

    /// Look up the trials of a case
    #[must_use]
    pub fn get(&self, case_id: &str) -> Option<&CaseTrials> {
        self.index.get(case_id).map(|&i| &self.cases[i])
    }

    /// Case identifiers in first-seen order
    pub fn case_ids(&self) -> impl Iterator<Item = &str> {
        self.cases.iter().map(CaseTrials::case_id)
    }

    /// Number of cases
    #[must_use]
    pub fn len(&self) -> usize {
        self.cases.len()
    }

    /// Whether no case has been recorded
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cases.is_empty()
    }

    fn entry(&mut self, case_id: &str) -> &mut CaseTrials {
        let idx = match self.index.get(case_id) {
            Some(&idx) => idx,
            None => {
                self.cases.push(CaseTrials::new(case_id));
                self.index.insert(case_id.to_string(), self.cases.len() - 1);
                self.cases.len() - 1
            }
        };
        &mut self.cases[idx]
    }

    fn insert(&mut self, trials: CaseTrials) {
        self.index.insert(trials.case_id.clone(), self.cases.len());
        self.cases.push(trials);
    }
}

/// All trials of one model across prompts and cases
#[derive(Debug, Clone)]
pub struct ModelRun {
    model: String,
    validation: usize,
    prompts: Vec<PromptResponses>,
}

impl ModelRun {
    /// Create an empty run expecting `validation` trials per case
    ///
    /// # Errors
    ///
    /// Returns `RecordError::InvalidValidation` if `validation` is zero.
    pub fn new(model: impl Into<String>, validation: usize) -> Result<Self, RecordError> {
        if validation == 0 {
            return Err(RecordError::InvalidValidation(validation));
        }
        Ok(Self {
            model: model.into(),
            validation,
            prompts: Vec::new(),
        })
    }

    /// Model identifier
    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Trials expected per case
    #[must_use]
    pub const fn validation(&self) -> usize {
        self.validation
    }

    /// Number of prompts with at least one recorded trial
    #[must_use]
    pub fn prompts_used(&self) -> usize {
        self.prompts.len()
    }

    /// Number of cases of the first prompt
    #[must_use]
    pub fn case_count(&self) -> usize {
        self.prompts.first().map_or(0, PromptResponses::len)
    }

    /// Per-prompt responses in first-seen order
    #[must_use]
    pub fn prompts(&self) -> &[PromptResponses] {
        &self.prompts
    }

    /// Look up the responses of a prompt
    #[must_use]
    pub fn prompt(&self, prompt_id: &str) -> Option<&PromptResponses> {
        self.prompts.iter().find(|p| p.prompt_id == prompt_id)
    }

    /// Trials already recorded for a (prompt, case) pair
    #[must_use]
    pub fn trial_count(&self, prompt_id: &str, case_id: &str) -> usize {
        self.prompt(prompt_id)
            .and_then(|p| p.get(case_id))
            .map_or(0, CaseTrials::len)
    }

    /// Append the next trial for a (prompt, case) pair
    ///
    /// Returns the 1-based position of the recorded trial.
    ///
    /// # Errors
    ///
    /// Returns `RecordError::TrialOverflow` if the case already holds
    /// `validation` trials.
    pub fn record(
        &mut self,
        prompt_id: &str,
        case_id: &str,
        trial: Trial,
    ) -> Result<usize, RecordError> {
        let validation = self.validation;
        let pos = match self.prompts.iter().position(|p| p.prompt_id == prompt_id) {
            Some(pos) => pos,
            None => {
                self.prompts.push(PromptResponses::new(prompt_id));
                self.prompts.len() - 1
            }
        };
        let case = self.prompts[pos].entry(case_id);
        if case.trials.len() >= validation {
            return Err(RecordError::TrialOverflow {
                model: self.model.clone(),
                prompt: prompt_id.to_string(),
                case_id: case_id.to_string(),
                validation,
            });
        }
        case.trials.push(trial);
        Ok(case.trials.len())
    }

    /// Check that every prompt covers the same case set and every case holds
    /// exactly `validation` trials
    ///
    /// # Errors
    ///
    /// Returns the first shape violation found.
    pub fn validate(&self) -> Result<(), RecordError> {
        let Some(first) = self.prompts.first() else {
            return Err(RecordError::EmptyRun(self.model.clone()));
        };
        let reference: HashSet<&str> = first.case_ids().collect();

        for prompt in &self.prompts {
            let ids: HashSet<&str> = prompt.case_ids().collect();
            if ids != reference {
                let mut missing: Vec<String> =
                    reference.difference(&ids).map(ToString::to_string).collect();
                let mut extra: Vec<String> =
                    ids.difference(&reference).map(ToString::to_string).collect();
                missing.sort();
                extra.sort();
                return Err(RecordError::InconsistentCases {
                    model: self.model.clone(),
                    prompt: prompt.prompt_id.clone(),
                    missing,
                    extra,
                });
            }
            if let Some(case) = prompt.cases.iter().find(|c| c.len() != self.validation) {
                return Err(RecordError::IncompleteTrials {
                    model: self.model.clone(),
                    prompt: prompt.prompt_id.clone(),
                    case_id: case.case_id.clone(),
                    expected: self.validation,
                    found: case.len(),
                });
            }
        }
        Ok(())
    }

    /// Whether the run passes [`ModelRun::validate`]
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.validate().is_ok()
    }

    /// A new run holding only the cases that are complete for every prompt
    ///
    /// Used to regenerate reports while an evaluation is still in progress.
    #[must_use]
    pub fn completed_view(&self) -> Self {
        let complete: Vec<&str> = self.prompts.first().map_or_else(Vec::new, |first| {
            first
                .case_ids()
                .filter(|id| {
                    self.prompts.iter().all(|p| {
                        p.get(id).is_some_and(|c| c.len() == self.validation)
                    })
                })
                .collect()
        });

        let prompts = if complete.is_empty() {
            Vec::new()
        } else {
            self.prompts
                .iter()
                .map(|p| {
                    let mut view = PromptResponses::new(&p.prompt_id);
                    for id in &complete {
                        if let Some(case) = p.get(id) {
                            view.insert(case.clone());
                        }
                    }
                    view
                })
                .collect()
        };

        Self {
            model: self.model.clone(),
            validation: self.validation,
            prompts,
        }
    }
}

/// Runs of every evaluated model, in first-seen order
#[derive(Debug, Clone, Default)]
pub struct EvaluationStore {
    runs: Vec<ModelRun>,
}

impl EvaluationStore {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All model runs
    #[must_use]
    pub fn runs(&self) -> &[ModelRun] {
        &self.runs
    }

    /// Look up a model run
    #[must_use]
    pub fn get(&self, model: &str) -> Option<&ModelRun> {
        self.runs.iter().find(|r| r.model == model)
    }

    /// Whether nothing has been recorded
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }

    /// Trials already recorded for a (model, prompt, case) triple
    #[must_use]
    pub fn trial_count(&self, model: &str, prompt_id: &str, case_id: &str) -> usize {
        self.get(model)
            .map_or(0, |run| run.trial_count(prompt_id, case_id))
    }

    /// Get or create the run of a model
    ///
    /// # Errors
    ///
    /// Returns `RecordError::ValidationMismatch` if the model was recorded
    /// with a different trial count, or `InvalidValidation` for zero.
    pub fn run_mut(
        &mut self,
        model: &str,
        validation: usize,
    ) -> Result<&mut ModelRun, RecordError> {
        let pos = match self.runs.iter().position(|r| r.model == model) {
            Some(pos) => {
                let existing = self.runs[pos].validation;
                if existing != validation {
                    return Err(RecordError::ValidationMismatch {
                        model: model.to_string(),
                        existing,
                        requested: validation,
                    });
                }
                pos
            }
            None => {
                self.runs.push(ModelRun::new(model, validation)?);
                self.runs.len() - 1
            }
        };
        Ok(&mut self.runs[pos])
    }

    /// Append a trial for a (model, prompt, case) triple
    ///
    /// # Errors
    ///
    /// Propagates errors from [`EvaluationStore::run_mut`] and [`ModelRun::record`].
    pub fn record(
        &mut self,
        model: &str,
        validation: usize,
        prompt_id: &str,
        case_id: &str,
        trial: Trial,
    ) -> Result<usize, RecordError> {
        self.run_mut(model, validation)?.record(prompt_id, case_id, trial)
    }
}

/// Correct severity of one case
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TruthEntry {
    /// Case identifier
    pub case_id: String,
    /// Correct severity
    pub severity: SeverityLevel,
    /// Free-text justification of the classification
    pub justification: String,
}

/// Read-only mapping from case ID to correct severity
#[derive(Debug, Clone, Default)]
pub struct GroundTruth {
    entries: Vec<TruthEntry>,
    index: HashMap<String, usize>,
}

impl GroundTruth {
    /// Build ground truth from entries
    ///
    /// # Errors
    ///
    /// Returns `RecordError::DuplicateCase` if a case ID appears twice.
    pub fn from_entries(
        entries: impl IntoIterator<Item = TruthEntry>,
    ) -> Result<Self, RecordError> {
        let mut truth = Self::default();
        for entry in entries {
            if truth.index.contains_key(&entry.case_id) {
                return Err(RecordError::DuplicateCase(entry.case_id));
            }
            truth.index.insert(entry.case_id.clone(), truth.entries.len());
            truth.entries.push(entry);
        }
        Ok(truth)
    }

    /// Build ground truth from `(case_id, label)` pairs
    ///
    /// # Errors
    ///
    /// Returns `RecordError::UnknownLabel` for a label outside the severity
    /// scale, or `DuplicateCase`.
    pub fn from_labels<I, K, L>(labels: I) -> Result<Self, RecordError>
    where
        I: IntoIterator<Item = (K, L)>,
        K: Into<String>,
        L: AsRef<str>,
    {
        let entries = labels
            .into_iter()
            .map(|(case_id, label)| {
                let case_id = case_id.into();
                match label.as_ref().parse::<SeverityLevel>() {
                    Ok(severity) => Ok(TruthEntry {
                        case_id,
                        severity,
                        justification: String::new(),
                    }),
                    Err(source) => Err(RecordError::UnknownLabel { case_id, source }),
                }
            })
            .collect::<Result<Vec<_>, _>>()?;
        Self::from_entries(entries)
    }

    /// Look up a case
    #[must_use]
    pub fn get(&self, case_id: &str) -> Option<&TruthEntry> {
        self.index.get(case_id).map(|&i| &self.entries[i])
    }

    /// Correct severity of a case
    #[must_use]
    pub fn severity(&self, case_id: &str) -> Option<SeverityLevel> {
        self.get(case_id).map(|e| e.severity)
    }

    /// Whether a case is present
    #[must_use]
    pub fn contains(&self, case_id: &str) -> bool {
        self.index.contains_key(case_id)
    }

    /// Entries in load order
    #[must_use]
    pub fn entries(&self) -> &[TruthEntry] {
        &self.entries
    }

    /// Number of cases
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether there are no cases
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// A new ground truth holding only the given cases that are present
    #[must_use]
    pub fn restrict<'a>(&self, case_ids: impl IntoIterator<Item = &'a str>) -> Self {
        let keep: HashSet<&str> = case_ids.into_iter().collect();
        let entries = self
            .entries
            .iter()
            .filter(|e| keep.contains(e.case_id.as_str()))
            .cloned();
        // Subset of unique IDs cannot produce duplicates
        Self::from_entries(entries).unwrap_or_default()
    }
}
