//! Majority-vote reduction of repeated trials.
//!
//! The verdict of a (model, prompt, case) triple is the most frequent
//! prediction across its trials. Ties go to the value that appears earliest in
//! trial order, so trial 1 wins a full tie.

use crate::records::{CaseTrials, PromptResponses, Trial};
use crate::severity::Prediction;
use std::collections::HashMap;

/// Majority verdict of a case, keeping the trials it was reduced from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MajorityVerdict<'a> {
    /// Most frequent prediction
    pub verdict: Prediction,
    /// Number of trials agreeing with the verdict
    pub support: usize,
    /// The full trial sequence
    pub trials: &'a CaseTrials,
}

impl MajorityVerdict<'_> {
    /// Case identifier
    #[must_use]
    pub fn case_id(&self) -> &str {
        self.trials.case_id()
    }

    /// Fraction of trials agreeing with the verdict
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn support_ratio(&self) -> f64 {
        if self.trials.is_empty() {
            return 0.0;
        }
        self.support as f64 / self.trials.len() as f64
    }

    /// Explanation of the first trial whose answer matches the verdict
    #[must_use]
    pub fn explanation(&self) -> Option<&str> {
        self.trials
            .trials()
            .iter()
            .find(|t| t.prediction() == self.verdict)
            .map(|t: &Trial| t.explanation.as_str())
    }
}

/// Statistical mode of a sequence, first-encountered value winning ties
///
/// Returns `None` for an empty sequence.
#[must_use]
pub fn mode<T: Eq + std::hash::Hash + Clone>(values: &[T]) -> Option<(T, usize)> {
    let mut counts: HashMap<&T, usize> = HashMap::new();
    for value in values {
        *counts.entry(value).or_insert(0) += 1;
    }

    let mut best: Option<(&T, usize)> = None;
    for value in values {
        let count = counts[value];
        // Strictly greater keeps the earliest value on ties
        if best.is_none_or(|(_, best_count)| count > best_count) {
            best = Some((value, count));
        }
    }
    best.map(|(value, count)| (value.clone(), count))
}

/// Reduce a trial sequence to its majority verdict
///
/// Returns `None` when no trial has been recorded.
#[must_use]
pub fn majority_vote(trials: &CaseTrials) -> Option<MajorityVerdict<'_>> {
    let predictions = trials.predictions();
    mode(&predictions).map(|(verdict, support)| MajorityVerdict {
        verdict,
        support,
        trials,
    })
}

/// Majority verdicts of every case of a prompt, in case order
#[must_use]
pub fn prompt_verdicts(responses: &PromptResponses) -> Vec<MajorityVerdict<'_>> {
    responses.cases().iter().filter_map(majority_vote).collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::severity::SeverityLevel;

    fn trials(answers: &[&str]) -> CaseTrials {
        CaseTrials::from_trials(
            "case",
            answers
                .iter()
                .enumerate()
                .map(|(i, a)| Trial::new(*a, format!("explanation {}", i + 1)))
                .collect(),
        )
    }

    #[test]
    fn test_mode_tie_first_wins() {
        assert_eq!(mode(&["A", "B"]), Some(("A", 1)));
        assert_eq!(mode(&["B", "A"]), Some(("B", 1)));
        assert_eq!(mode(&["C", "A", "B", "A", "B"]), Some(("A", 2)));
    }

    #[test]
    fn test_mode_empty() {
        assert_eq!(mode::<&str>(&[]), None);
    }

    #[test]
    fn test_single_trial_is_its_own_verdict() {
        let case = trials(&["Laranja"]);
        let verdict = majority_vote(&case).unwrap();
        assert_eq!(verdict.verdict, Prediction::Level(SeverityLevel::Laranja));
        assert_eq!(verdict.support, 1);
    }

    #[test]
    fn test_majority_wins() {
        let case = trials(&["Vermelho", "Vermelho", "Laranja"]);
        let verdict = majority_vote(&case).unwrap();
        assert_eq!(verdict.verdict, Prediction::Level(SeverityLevel::Vermelho));
        assert_eq!(verdict.support, 2);
        assert!((verdict.support_ratio() - 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_two_way_tie_takes_trial_one() {
        let case = trials(&["Verde", "Amarelo"]);
        let verdict = majority_vote(&case).unwrap();
        assert_eq!(verdict.verdict, Prediction::Level(SeverityLevel::Verde));

        let case = trials(&["Amarelo", "Verde"]);
        assert_eq!(
            majority_vote(&case).unwrap().verdict,
            Prediction::Level(SeverityLevel::Amarelo)
        );
    }

    #[test]
    fn test_three_way_tie_takes_trial_one() {
        let case = trials(&["Azul", "Failed JSON", "Vermelho"]);
        assert_eq!(
            majority_vote(&case).unwrap().verdict,
            Prediction::Level(SeverityLevel::Azul)
        );
    }

    #[test]
    fn test_case_insensitive_answers_vote_together() {
        let case = trials(&["Azul", "vermelho", "RED"]);
        assert_eq!(
            majority_vote(&case).unwrap().verdict,
            Prediction::Level(SeverityLevel::Vermelho)
        );
    }

    #[test]
    fn test_failed_can_win() {
        let case = trials(&["Failed JSON", "Verde", "Failed JSON"]);
        assert_eq!(majority_vote(&case).unwrap().verdict, Prediction::Failed);
    }

    #[test]
    fn test_verdict_is_one_of_inputs() {
        let sets: [&[&str]; 4] = [
            &["Azul"],
            &["Verde", "Azul", "Azul", "Verde"],
            &["Laranja", "x", "y"],
            &["Amarelo", "Amarelo", "Failed JSON"],
        ];
        for answers in sets {
            let case = trials(answers);
            let verdict = majority_vote(&case).unwrap();
            assert!(case.predictions().contains(&verdict.verdict));
            assert_eq!(verdict.trials.len(), answers.len());
        }
    }

    #[test]
    fn test_explanation_of_first_matching_trial() {
        let case = trials(&["Verde", "Amarelo", "Amarelo"]);
        let verdict = majority_vote(&case).unwrap();
        assert_eq!(verdict.explanation(), Some("explanation 2"));
    }

    #[test]
    fn test_empty_case_has_no_verdict() {
        assert!(majority_vote(&CaseTrials::new("empty")).is_none());
    }
}
