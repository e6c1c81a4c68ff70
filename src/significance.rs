//! Paired significance testing between models.
//!
//! Two models answering the same cases under the same prompt are compared with
//! McNemar's test on their majority verdicts. The exact binomial form is used
//! when discordant pairs are few, otherwise the chi-square approximation with
//! continuity correction. A table without discordant pairs has no test
//! statistic and yields `None`.

use crate::metrics::StatConfig;
use crate::records::{GroundTruth, ModelRun};
use crate::vote::prompt_verdicts;
use serde::{Deserialize, Serialize};
use statrs::distribution::{Binomial, ChiSquared, ContinuousCDF, DiscreteCDF};
use std::collections::HashMap;

/// Paired 2x2 contingency table of per-case correctness
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContingencyTable {
    /// Both models correct
    pub both_correct: u64,
    /// Only the first model correct
    pub first_only: u64,
    /// Only the second model correct
    pub second_only: u64,
    /// Both models wrong
    pub both_wrong: u64,
}

impl ContingencyTable {
    /// Build from paired correctness flags
    #[must_use]
    pub fn from_pairs(pairs: impl IntoIterator<Item = (bool, bool)>) -> Self {
        let mut table = Self::default();
        for pair in pairs {
            match pair {
                (true, true) => table.both_correct += 1,
                (true, false) => table.first_only += 1,
                (false, true) => table.second_only += 1,
                (false, false) => table.both_wrong += 1,
            }
        }
        table
    }

    /// Number of discordant pairs
    #[must_use]
    pub const fn discordant(&self) -> u64 {
        self.first_only + self.second_only
    }

    /// Number of paired cases
    #[must_use]
    pub const fn total(&self) -> u64 {
        self.both_correct + self.first_only + self.second_only + self.both_wrong
    }
}

/// Which form of McNemar's test produced a p-value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum McNemarMethod {
    /// Two-sided exact binomial test on the discordant pairs
    Exact,
    /// Chi-square (1 df) with continuity correction
    Asymptotic,
}

/// Result of McNemar's test
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct McNemarResult {
    /// Test statistic (min discordant count for exact, chi-square otherwise)
    pub statistic: f64,
    /// Two-sided p-value
    pub p_value: f64,
    /// Test form used
    pub method: McNemarMethod,
}

/// McNemar's test for marginal homogeneity
///
/// Returns `None` when the table has no discordant pairs.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn mcnemar(table: &ContingencyTable, exact_threshold: u64) -> Option<McNemarResult> {
    let b = table.first_only;
    let c = table.second_only;
    let n = b + c;
    if n == 0 {
        return None;
    }

    if n < exact_threshold {
        let k = b.min(c);
        let binomial = Binomial::new(0.5, n).ok()?;
        let p_value = (2.0 * binomial.cdf(k)).min(1.0);
        return p_value.is_finite().then_some(McNemarResult {
            statistic: k as f64,
            p_value,
            method: McNemarMethod::Exact,
        });
    }

    let diff = (b as f64 - c as f64).abs() - 1.0;
    let statistic = diff.max(0.0).powi(2) / n as f64;
    let chi2 = ChiSquared::new(1.0).ok()?;
    let p_value = chi2.sf(statistic);
    p_value.is_finite().then_some(McNemarResult {
        statistic,
        p_value,
        method: McNemarMethod::Asymptotic,
    })
}

/// Apply Bonferroni correction for multiple comparisons
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn bonferroni_correction(alpha: f64, num_comparisons: usize) -> f64 {
    if num_comparisons == 0 {
        return alpha;
    }
    alpha / num_comparisons as f64
}

/// McNemar comparison of two models under one prompt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelComparison {
    /// Prompt identifier
    pub prompt: String,
    /// First model
    pub model_a: String,
    /// Second model
    pub model_b: String,
    /// Paired correctness table
    pub table: ContingencyTable,
    /// Test result; `None` when not computable
    pub test: Option<McNemarResult>,
    /// Significance threshold after correction
    pub alpha: f64,
}

impl ModelComparison {
    /// Whether the p-value falls below the corrected threshold
    #[must_use]
    pub fn is_significant(&self) -> bool {
        self.test.as_ref().is_some_and(|t| t.p_value < self.alpha)
    }
}

/// Paired correctness of two models' majority verdicts for one prompt
///
/// Returns `None` unless both models answered the prompt for exactly the same
/// cases and every case has ground truth.
#[must_use]
pub fn paired_table(
    first: &ModelRun,
    second: &ModelRun,
    prompt_id: &str,
    truth: &GroundTruth,
) -> Option<ContingencyTable> {
    let a = prompt_verdicts(first.prompt(prompt_id)?);
    let b = prompt_verdicts(second.prompt(prompt_id)?);
    if a.len() != b.len() {
        return None;
    }

    let b_by_case: HashMap<&str, bool> = b
        .iter()
        .map(|v| (v.case_id(), truth.severity(v.case_id()) == v.verdict.level()))
        .collect();

    let mut pairs = Vec::with_capacity(a.len());
    for verdict in &a {
        let severity = truth.severity(verdict.case_id())?;
        let second_correct = *b_by_case.get(verdict.case_id())?;
        pairs.push((verdict.verdict.level() == Some(severity), second_correct));
    }
    Some(ContingencyTable::from_pairs(pairs))
}

/// Compare every pair of models on every prompt they share
///
/// Runs with missing trials are left out. Pairs without a shared prompt, or
/// whose case sets differ, are skipped. The significance threshold is
/// Bonferroni-corrected over the comparisons made.
#[must_use]
pub fn compare_models(
    runs: &[ModelRun],
    truth: &GroundTruth,
    config: &StatConfig,
) -> Vec<ModelComparison> {
    let runs: Vec<&ModelRun> = runs
        .iter()
        .filter(|run| match run.validate() {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(model = %run.model(), error = %e, "incomplete run, not compared");
                false
            }
        })
        .collect();
    let mut comparisons = Vec::new();

    for (i, first) in runs.iter().enumerate() {
        for second in &runs[i + 1..] {
            for prompt in first.prompts() {
                let prompt_id = prompt.prompt_id();
                if second.prompt(prompt_id).is_none() {
                    continue;
                }
                let Some(table) = paired_table(first, second, prompt_id, truth) else {
                    tracing::warn!(
                        prompt = %prompt_id,
                        model_a = %first.model(),
                        model_b = %second.model(),
                        "case sets differ, skipping comparison"
                    );
                    continue;
                };
                let test = mcnemar(&table, config.exact_threshold);
                if test.is_none() {
                    tracing::debug!(
                        prompt = %prompt_id,
                        model_a = %first.model(),
                        model_b = %second.model(),
                        "no discordant pairs, test not computable"
                    );
                }
                comparisons.push(ModelComparison {
                    prompt: prompt_id.to_string(),
                    model_a: first.model().to_string(),
                    model_b: second.model().to_string(),
                    table,
                    test,
                    alpha: config.alpha,
                });
            }
        }
    }

    let corrected = bonferroni_correction(config.alpha, comparisons.len());
    for comparison in &mut comparisons {
        comparison.alpha = corrected;
    }
    comparisons
}
