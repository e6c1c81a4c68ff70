//! Classification metrics and triage error rates.
//!
//! Every metric is computed twice per prompt:
//! - raw-trial: each trial is one prediction against the case's true severity
//! - mode: one prediction per case, the majority verdict
//!
//! Under/over-triage rates are normalized by the number of *directional*
//! misses. Unparseable predictions count toward the accuracy denominator but
//! are neither a miss numerator nor part of the miss denominator.
//!
//! Accuracy confidence intervals use a seeded percentile bootstrap.

use crate::records::{GroundTruth, ModelRun, PromptResponses, RecordError};
use crate::severity::{ConfusionOutcome, Prediction, SeverityLevel};
use crate::vote::{majority_vote, MajorityVerdict};
use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

/// Errors that abort the scoring of one report
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScoringError {
    #[error("prediction and ground-truth case sets differ (no truth for: {missing_truth:?}, no prediction for: {missing_predictions:?})")]
    DataShape {
        missing_truth: Vec<String>,
        missing_predictions: Vec<String>,
    },

    #[error(transparent)]
    Records(#[from] RecordError),
}

/// Statistical configuration for evaluation
#[derive(Debug, Clone)]
pub struct StatConfig {
    /// Number of bootstrap resamples
    pub bootstrap_n: usize,
    /// Confidence level (e.g., 0.95)
    pub confidence: f64,
    /// Significance threshold
    pub alpha: f64,
    /// Random seed for reproducibility
    pub seed: u64,
    /// Discordant-pair count below which McNemar uses the exact binomial test
    pub exact_threshold: u64,
}

impl Default for StatConfig {
    fn default() -> Self {
        Self {
            bootstrap_n: 10_000,
            confidence: 0.95,
            alpha: 0.05,
            seed: 42,
            exact_threshold: 25,
        }
    }
}

/// Counts of each confusion outcome
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutcomeCounts {
    /// All predictions
    pub total: usize,
    /// Predictions equal to the true severity
    pub correct: usize,
    /// Predictions less urgent than the true severity
    pub under_triage: usize,
    /// Predictions more urgent than the true severity
    pub over_triage: usize,
    /// Sentinel or unmapped predictions
    pub unparseable: usize,
}

impl OutcomeCounts {
    /// Tally one outcome
    pub fn record(&mut self, outcome: ConfusionOutcome) {
        self.total += 1;
        match outcome {
            ConfusionOutcome::Correct => self.correct += 1,
            ConfusionOutcome::UnderTriage => self.under_triage += 1,
            ConfusionOutcome::OverTriage => self.over_triage += 1,
            ConfusionOutcome::Unparseable => self.unparseable += 1,
        }
    }

    /// Directional misses (under + over); unparseable predictions excluded
    #[must_use]
    pub const fn misses(&self) -> usize {
        self.under_triage + self.over_triage
    }
}

/// Scalar metrics for one set of predictions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationMetrics {
    /// correct / total
    pub accuracy: f64,
    /// Macro-averaged precision
    pub precision: f64,
    /// Macro-averaged recall
    pub recall: f64,
    /// Macro-averaged F1
    pub f1: f64,
    /// under-triage / directional misses, 0 without misses
    pub under_triage_rate: f64,
    /// over-triage / directional misses, 0 without misses
    pub over_triage_rate: f64,
    /// unparseable / total
    pub unparseable_rate: f64,
    /// Raw outcome counts
    pub counts: OutcomeCounts,
}

/// Compute metrics over `(true severity, prediction)` pairs
///
/// The macro label set is every distinct prediction plus every true level.
/// A class with an empty denominator scores 0 rather than failing.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn classification_metrics(pairs: &[(SeverityLevel, Prediction)]) -> ClassificationMetrics {
    let mut counts = OutcomeCounts::default();
    for (truth, predicted) in pairs {
        counts.record(ConfusionOutcome::classify(predicted, *truth));
    }

    let mut labels: Vec<Prediction> = Vec::new();
    let mut seen: HashSet<Prediction> = HashSet::new();
    for (truth, predicted) in pairs {
        for label in [Prediction::Level(*truth), predicted.clone()] {
            if seen.insert(label.clone()) {
                labels.push(label);
            }
        }
    }

    let mut precision_sum = 0.0;
    let mut recall_sum = 0.0;
    let mut f1_sum = 0.0;
    for label in &labels {
        let mut true_positive = 0_usize;
        let mut predicted_count = 0_usize;
        let mut actual_count = 0_usize;
        for (truth, predicted) in pairs {
            let is_predicted = predicted == label;
            let is_actual = label.level() == Some(*truth);
            predicted_count += usize::from(is_predicted);
            actual_count += usize::from(is_actual);
            true_positive += usize::from(is_predicted && is_actual);
        }
        let precision = ratio(true_positive, predicted_count);
        let recall = ratio(true_positive, actual_count);
        let f1 = if precision + recall > 0.0 {
            2.0 * precision * recall / (precision + recall)
        } else {
            0.0
        };
        precision_sum += precision;
        recall_sum += recall;
        f1_sum += f1;
    }
    let n_labels = labels.len().max(1) as f64;

    ClassificationMetrics {
        accuracy: ratio(counts.correct, counts.total),
        precision: precision_sum / n_labels,
        recall: recall_sum / n_labels,
        f1: f1_sum / n_labels,
        under_triage_rate: ratio(counts.under_triage, counts.misses()),
        over_triage_rate: ratio(counts.over_triage, counts.misses()),
        unparseable_rate: ratio(counts.unparseable, counts.total),
        counts,
    }
}

/// Fail unless the prediction case set equals the ground-truth case set
///
/// # Errors
///
/// Returns `ScoringError::DataShape` naming the offending case IDs.
pub fn check_alignment<'a>(
    case_ids: impl IntoIterator<Item = &'a str>,
    truth: &GroundTruth,
) -> Result<(), ScoringError> {
    let predicted: HashSet<&str> = case_ids.into_iter().collect();

    let mut missing_truth: Vec<String> = predicted
        .iter()
        .filter(|id| !truth.contains(id))
        .map(ToString::to_string)
        .collect();
    let mut missing_predictions: Vec<String> = truth
        .entries()
        .iter()
        .filter(|e| !predicted.contains(e.case_id.as_str()))
        .map(|e| e.case_id.clone())
        .collect();

    if missing_truth.is_empty() && missing_predictions.is_empty() {
        return Ok(());
    }
    missing_truth.sort();
    missing_predictions.sort();
    Err(ScoringError::DataShape {
        missing_truth,
        missing_predictions,
    })
}

/// Metrics counting every trial as one prediction
///
/// # Errors
///
/// Returns `ScoringError::DataShape` if case sets differ.
pub fn raw_trial_metrics(
    responses: &PromptResponses,
    truth: &GroundTruth,
) -> Result<ClassificationMetrics, ScoringError> {
    check_alignment(responses.case_ids(), truth)?;
    let pairs: Vec<(SeverityLevel, Prediction)> = responses
        .cases()
        .iter()
        .filter_map(|case| truth.severity(case.case_id()).map(|sev| (sev, case)))
        .flat_map(|(sev, case)| case.predictions().into_iter().map(move |p| (sev, p)))
        .collect();
    Ok(classification_metrics(&pairs))
}

/// Metrics counting each case's majority verdict as one prediction
///
/// # Errors
///
/// Returns `ScoringError::DataShape` if case sets differ.
pub fn mode_metrics(
    responses: &PromptResponses,
    truth: &GroundTruth,
) -> Result<ClassificationMetrics, ScoringError> {
    let verdicts: Vec<MajorityVerdict<'_>> =
        responses.cases().iter().filter_map(majority_vote).collect();
    verdict_metrics(&verdicts, truth)
}

/// Metrics over already-reduced majority verdicts
///
/// # Errors
///
/// Returns `ScoringError::DataShape` if case sets differ.
pub fn verdict_metrics(
    verdicts: &[MajorityVerdict<'_>],
    truth: &GroundTruth,
) -> Result<ClassificationMetrics, ScoringError> {
    check_alignment(verdicts.iter().map(MajorityVerdict::case_id), truth)?;
    let pairs: Vec<(SeverityLevel, Prediction)> = verdicts
        .iter()
        .filter_map(|v| truth.severity(v.case_id()).map(|sev| (sev, v.verdict.clone())))
        .collect();
    Ok(classification_metrics(&pairs))
}

/// Fraction of the C(n, 2) trial pairs that agree exactly
///
/// A single trial is trivially self-consistent (1.0).
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn pairwise_agreement(predictions: &[Prediction]) -> f64 {
    let n = predictions.len();
    if n < 2 {
        return if n == 1 { 1.0 } else { 0.0 };
    }
    let mut agreeing = 0_usize;
    for (i, a) in predictions.iter().enumerate() {
        agreeing += predictions[i + 1..].iter().filter(|b| *b == a).count();
    }
    agreeing as f64 / (n * (n - 1) / 2) as f64
}

/// Mean pairwise agreement across the cases of a prompt
#[must_use]
pub fn agreement_score(responses: &PromptResponses) -> f64 {
    let per_case: Vec<f64> = responses
        .cases()
        .iter()
        .map(|case| pairwise_agreement(&case.predictions()))
        .collect();
    compute_mean(&per_case)
}

/// All scalar results for one (model, prompt) pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptScore {
    /// Model identifier
    pub model: String,
    /// Prompt identifier
    pub prompt: String,
    /// Metrics over majority verdicts
    pub mode: ClassificationMetrics,
    /// Metrics over every trial
    pub raw: ClassificationMetrics,
    /// Mean inter-trial agreement
    pub agreement: f64,
    /// Bootstrap CI of majority-verdict accuracy (lower, upper)
    pub accuracy_ci: (f64, f64),
}

/// Score one prompt of a model
///
/// # Errors
///
/// Returns `ScoringError::DataShape` if case sets differ.
pub fn score_prompt(
    model: &str,
    responses: &PromptResponses,
    truth: &GroundTruth,
    config: &StatConfig,
) -> Result<PromptScore, ScoringError> {
    let verdicts: Vec<MajorityVerdict<'_>> =
        responses.cases().iter().filter_map(majority_vote).collect();
    let mode = verdict_metrics(&verdicts, truth)?;
    let raw = raw_trial_metrics(responses, truth)?;

    let correctness: Vec<f64> = verdicts
        .iter()
        .map(|v| {
            let correct = truth.severity(v.case_id()) == v.verdict.level();
            if correct { 1.0 } else { 0.0 }
        })
        .collect();

    Ok(PromptScore {
        model: model.to_string(),
        prompt: responses.prompt_id().to_string(),
        mode,
        raw,
        agreement: agreement_score(responses),
        accuracy_ci: bootstrap_ci(&correctness, config),
    })
}

/// Score every prompt of a complete model run
///
/// # Errors
///
/// Returns `ScoringError::Records` if the run is incomplete or inconsistent,
/// or `DataShape` if its cases differ from the ground truth.
pub fn score_model(
    run: &ModelRun,
    truth: &GroundTruth,
    config: &StatConfig,
) -> Result<Vec<PromptScore>, ScoringError> {
    run.validate()?;
    run.prompts()
        .iter()
        .map(|prompt| score_prompt(run.model(), prompt, truth, config))
        .collect()
}

#[allow(clippy::cast_precision_loss)]
fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

/// Compute mean of samples
#[allow(clippy::cast_precision_loss)]
pub(crate) fn compute_mean(samples: &[f64]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    samples.iter().sum::<f64>() / samples.len() as f64
}

/// Bootstrap confidence interval (proper resampling)
///
/// Uses the percentile method with `n` resamples.
#[must_use]
#[allow(
    clippy::cast_precision_loss,
    clippy::cast_sign_loss,
    clippy::cast_possible_truncation
)]
pub fn bootstrap_ci(samples: &[f64], config: &StatConfig) -> (f64, f64) {
    if samples.len() < 2 || config.bootstrap_n == 0 {
        let mean = compute_mean(samples);
        return (mean, mean);
    }

    let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
    let mut bootstrap_means = Vec::with_capacity(config.bootstrap_n);

    // Resample with replacement
    for _ in 0..config.bootstrap_n {
        let resample_sum: f64 = (0..samples.len())
            .map(|_| {
                let idx = rng.next_u64() as usize % samples.len();
                samples[idx]
            })
            .sum();
        bootstrap_means.push(resample_sum / samples.len() as f64);
    }

    bootstrap_means.sort_by(f64::total_cmp);

    let alpha = 1.0 - config.confidence;
    let lower_idx = (config.bootstrap_n as f64 * (alpha / 2.0)).floor() as usize;
    let upper_idx = (config.bootstrap_n as f64 * (1.0 - alpha / 2.0)).ceil() as usize;

    let lower = bootstrap_means.get(lower_idx).copied().unwrap_or(0.0);
    let upper = bootstrap_means
        .get(upper_idx.min(bootstrap_means.len() - 1))
        .copied()
        .unwrap_or(0.0);

    (lower, upper)
}

#[cfg(test)]
#[allow(clippy::float_cmp, clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::records::Trial;
    use crate::severity::SeverityLevel::{Amarelo, Azul, Laranja, Verde, Vermelho};

    fn level(l: SeverityLevel) -> Prediction {
        Prediction::Level(l)
    }

    fn run_with(cases: &[(&str, &[&str])], validation: usize) -> ModelRun {
        let mut run = ModelRun::new("model", validation).unwrap();
        for (case, answers) in cases {
            for answer in *answers {
                run.record("p1", case, Trial::new(*answer, "")).unwrap();
            }
        }
        run
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    // =========================================================================
    // classification_metrics
    // =========================================================================

    #[test]
    fn test_perfect_predictions() {
        let pairs = vec![
            (Vermelho, level(Vermelho)),
            (Verde, level(Verde)),
            (Amarelo, level(Amarelo)),
        ];
        let m = classification_metrics(&pairs);
        assert_eq!(m.accuracy, 1.0);
        assert_eq!(m.precision, 1.0);
        assert_eq!(m.recall, 1.0);
        assert_eq!(m.f1, 1.0);
        assert_eq!(m.under_triage_rate, 0.0);
        assert_eq!(m.over_triage_rate, 0.0);
        assert_eq!(m.counts.misses(), 0);
    }

    #[test]
    fn test_macro_metrics_known_values() {
        // truth: A A B ; pred: A B B
        let pairs = vec![
            (Azul, level(Azul)),
            (Azul, level(Verde)),
            (Verde, level(Verde)),
        ];
        let m = classification_metrics(&pairs);
        // Azul: P=1, R=0.5, F1=2/3 ; Verde: P=0.5, R=1, F1=2/3
        assert!(close(m.precision, 0.75));
        assert!(close(m.recall, 0.75));
        assert!(close(m.f1, 2.0 / 3.0));
        assert!(close(m.accuracy, 2.0 / 3.0));
        assert_eq!(m.counts.over_triage, 1);
        assert_eq!(m.over_triage_rate, 1.0);
    }

    #[test]
    fn test_prediction_only_class_scores_zero() {
        // Laranja appears only as a prediction: precision 0, recall 0
        let pairs = vec![(Verde, level(Laranja)), (Verde, level(Verde))];
        let m = classification_metrics(&pairs);
        // Verde: P=1, R=0.5, F1=2/3 ; Laranja: 0,0,0
        assert!(close(m.precision, 0.5));
        assert!(close(m.recall, 0.25));
        assert!(close(m.f1, 1.0 / 3.0));
    }

    #[test]
    fn test_under_over_partition_misses() {
        let pairs = vec![
            (Amarelo, level(Verde)),
            (Amarelo, level(Azul)),
            (Amarelo, level(Vermelho)),
            (Amarelo, level(Amarelo)),
        ];
        let m = classification_metrics(&pairs);
        assert!(close(m.under_triage_rate, 2.0 / 3.0));
        assert!(close(m.over_triage_rate, 1.0 / 3.0));
        assert!(close(m.under_triage_rate + m.over_triage_rate, 1.0));
    }

    #[test]
    fn test_unparseable_excluded_from_miss_rates() {
        let pairs = vec![
            (Amarelo, Prediction::Failed),
            (Amarelo, level(Verde)),
            (Verde, level(Verde)),
            (Azul, Prediction::Unrecognized("Roxo".into())),
        ];
        let m = classification_metrics(&pairs);
        assert_eq!(m.counts.total, 4);
        assert_eq!(m.counts.correct, 1);
        assert_eq!(m.counts.unparseable, 2);
        assert_eq!(m.counts.misses(), 1);
        assert_eq!(m.accuracy, 0.25);
        assert_eq!(m.under_triage_rate, 1.0);
        assert_eq!(m.over_triage_rate, 0.0);
        assert_eq!(m.unparseable_rate, 0.5);
    }

    #[test]
    fn test_only_unparseable_has_zero_rates() {
        let pairs = vec![(Amarelo, Prediction::Failed), (Verde, Prediction::Failed)];
        let m = classification_metrics(&pairs);
        assert_eq!(m.accuracy, 0.0);
        assert_eq!(m.under_triage_rate, 0.0);
        assert_eq!(m.over_triage_rate, 0.0);
        assert_eq!(m.f1, 0.0);
    }

    #[test]
    fn test_empty_pairs() {
        let m = classification_metrics(&[]);
        assert_eq!(m.accuracy, 0.0);
        assert_eq!(m.f1, 0.0);
        assert_eq!(m.counts.total, 0);
    }

    #[test]
    fn test_metrics_bounded_and_idempotent() {
        let all = [Azul, Verde, Amarelo, Laranja, Vermelho];
        let mut pairs = Vec::new();
        for (i, t) in all.iter().enumerate() {
            for (j, p) in all.iter().enumerate() {
                if (i * 7 + j * 3) % 4 != 0 {
                    pairs.push((*t, level(*p)));
                }
            }
        }
        pairs.push((Verde, Prediction::Failed));
        let first = classification_metrics(&pairs);
        let second = classification_metrics(&pairs);
        assert_eq!(first, second);
        for value in [first.accuracy, first.precision, first.recall, first.f1] {
            assert!((0.0..=1.0).contains(&value));
        }
    }

    // =========================================================================
    // Alignment
    // =========================================================================

    #[test]
    fn test_alignment_mismatch_names_keys() {
        let truth = GroundTruth::from_labels([("1", "Verde"), ("2", "Azul")]).unwrap();
        let err = check_alignment(["1", "3"], &truth).unwrap_err();
        assert_eq!(
            err,
            ScoringError::DataShape {
                missing_truth: vec!["3".into()],
                missing_predictions: vec!["2".into()],
            }
        );
    }

    #[test]
    fn test_mode_metrics_rejects_mismatch() {
        let run = run_with(&[("1", &["Verde"]), ("2", &["Azul"])], 1);
        let truth = GroundTruth::from_labels([("1", "Verde")]).unwrap();
        let prompt = &run.prompts()[0];
        assert!(matches!(
            mode_metrics(prompt, &truth),
            Err(ScoringError::DataShape { .. })
        ));
        assert!(raw_trial_metrics(prompt, &truth).is_err());
    }

    // =========================================================================
    // Raw vs mode
    // =========================================================================

    #[test]
    fn test_raw_and_mode_scenario() {
        let run = run_with(
            &[
                ("1", &["Vermelho", "Vermelho", "Laranja"]),
                ("2", &["Verde", "Verde", "Verde"]),
                ("3", &["Amarelo", "Vermelho", "Amarelo"]),
            ],
            3,
        );
        let truth = GroundTruth::from_labels([("1", "Vermelho"), ("2", "Verde"), ("3", "Amarelo")])
            .unwrap();
        let prompt = &run.prompts()[0];

        let mode = mode_metrics(prompt, &truth).unwrap();
        assert_eq!(mode.accuracy, 1.0);
        assert_eq!(mode.under_triage_rate, 0.0);
        assert_eq!(mode.over_triage_rate, 0.0);

        let raw = raw_trial_metrics(prompt, &truth).unwrap();
        assert_eq!(raw.counts.total, 9);
        assert!(close(raw.accuracy, 7.0 / 9.0));
        // Laranja for Vermelho is under-triage, Vermelho for Amarelo is over-triage
        assert_eq!(raw.counts.under_triage, 1);
        assert_eq!(raw.counts.over_triage, 1);
        assert!(close(raw.under_triage_rate, 0.5));
        assert!(close(raw.over_triage_rate, 0.5));
    }

    // =========================================================================
    // Agreement
    // =========================================================================

    #[test]
    fn test_pairwise_agreement() {
        let a = level(Azul);
        let b = level(Verde);
        assert_eq!(pairwise_agreement(&[a.clone(), a.clone(), a.clone()]), 1.0);
        assert!(close(pairwise_agreement(&[a.clone(), a.clone(), b.clone()]), 1.0 / 3.0));
        assert_eq!(pairwise_agreement(&[a.clone(), b.clone()]), 0.0);
        assert!(close(
            pairwise_agreement(&[a.clone(), a.clone(), b.clone(), b]),
            2.0 / 6.0
        ));
        assert_eq!(pairwise_agreement(&[a]), 1.0);
        assert_eq!(pairwise_agreement(&[]), 0.0);
    }

    #[test]
    fn test_agreement_score_mean_over_cases() {
        let run = run_with(
            &[
                ("1", &["Vermelho", "Vermelho", "Laranja"]),
                ("2", &["Verde", "Verde", "Verde"]),
            ],
            3,
        );
        let score = agreement_score(&run.prompts()[0]);
        assert!(close(score, (1.0 / 3.0 + 1.0) / 2.0));
    }

    // =========================================================================
    // score_model
    // =========================================================================

    #[test]
    fn test_score_model_requires_complete_run() {
        let mut run = run_with(&[("1", &["Verde", "Verde"])], 2);
        run.record("p1", "2", Trial::new("Verde", "")).unwrap();
        let truth = GroundTruth::from_labels([("1", "Verde"), ("2", "Verde")]).unwrap();
        let err = score_model(&run, &truth, &StatConfig::default()).unwrap_err();
        assert!(matches!(err, ScoringError::Records(RecordError::IncompleteTrials { .. })));
    }

    #[test]
    fn test_score_prompt_ci_contains_accuracy() {
        let run = run_with(
            &[
                ("1", &["Verde"]),
                ("2", &["Azul"]),
                ("3", &["Amarelo"]),
                ("4", &["Verde"]),
            ],
            1,
        );
        let truth = GroundTruth::from_labels([
            ("1", "Verde"),
            ("2", "Verde"),
            ("3", "Amarelo"),
            ("4", "Verde"),
        ])
        .unwrap();
        let scores = score_model(&run, &truth, &StatConfig::default()).unwrap();
        assert_eq!(scores.len(), 1);
        let score = &scores[0];
        assert_eq!(score.mode.accuracy, 0.75);
        assert!(score.accuracy_ci.0 <= 0.75 && 0.75 <= score.accuracy_ci.1);
        assert_eq!(score.agreement, 1.0);
    }

    // =========================================================================
    // Bootstrap
    // =========================================================================

    #[test]
    fn test_bootstrap_ci_reproducible() {
        let samples: Vec<f64> = (0..100).map(|i| f64::from(i % 2)).collect();
        let config = StatConfig::default();
        assert_eq!(bootstrap_ci(&samples, &config), bootstrap_ci(&samples, &config));
    }

    #[test]
    fn test_bootstrap_ci_single_sample() {
        let (lower, upper) = bootstrap_ci(&[1.0], &StatConfig::default());
        assert_eq!(lower, 1.0);
        assert_eq!(upper, 1.0);
    }

    #[test]
    fn test_stat_config_default() {
        let config = StatConfig::default();
        assert_eq!(config.bootstrap_n, 10_000);
        assert!((config.confidence - 0.95).abs() < f64::EPSILON);
        assert!((config.alpha - 0.05).abs() < f64::EPSILON);
        assert_eq!(config.seed, 42);
        assert_eq!(config.exact_threshold, 25);
    }
}
