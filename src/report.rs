//! Report generation module for evaluation results.
//!
//! Generates reports showing:
//! - Per-model wide tables of raw trial answers and majority verdicts
//! - Per-prompt metric summaries with a per-model total row
//! - Paired McNemar comparisons between models

use crate::metrics::{score_prompt, StatConfig};
use crate::records::{GroundTruth, ModelRun};
use crate::significance::{compare_models, McNemarMethod, ModelComparison};
use crate::vote::majority_vote;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Write as FmtWrite;
use tabled::{Table, Tabled};

/// Ground-truth cell of a case missing from the ground truth
pub const UNGRADABLE: &str = "ungradable";

/// Header of the ground-truth column
pub const TRUTH_COLUMN: &str = "Ground Truth";

/// Header of the justification column
pub const JUSTIFICATION_COLUMN: &str = "Justification";

/// Label of the per-model total row
pub const TOTAL_PROMPT: &str = "Total";

/// Header of the raw trial column of a prompt
#[must_use]
pub fn trial_column(prompt: &str, trial: usize) -> String {
    format!("{prompt} ({trial}x)")
}

/// Header of the majority verdict column of a prompt
#[must_use]
pub fn mode_column(prompt: &str) -> String {
    format!("{prompt} (mode)")
}

/// A table of string cells keyed by case ID in the first column
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WideTable {
    /// Column headers, `ID` first
    pub headers: Vec<String>,
    /// Rows in case order
    pub rows: Vec<Vec<String>>,
}

impl WideTable {
    /// Index of a column by header
    #[must_use]
    pub fn column(&self, header: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == header)
    }

    /// Cell of a case in a column
    #[must_use]
    pub fn cell(&self, case_id: &str, header: &str) -> Option<&str> {
        let col = self.column(header)?;
        self.rows
            .iter()
            .find(|row| row.first().is_some_and(|id| id == case_id))
            .and_then(|row| row.get(col))
            .map(String::as_str)
    }
}

/// Raw trial answers: `ID` then N trial columns per prompt
#[must_use]
pub fn raw_table(run: &ModelRun) -> WideTable {
    let mut headers = vec![crate::cases::ID_COLUMN.to_string()];
    for prompt in run.prompts() {
        headers.extend((1..=run.validation()).map(|t| trial_column(prompt.prompt_id(), t)));
    }

    let rows = case_order(run)
        .into_iter()
        .map(|case_id| {
            let mut row = vec![case_id.to_string()];
            for prompt in run.prompts() {
                row.extend(trial_cells(run, prompt.get(case_id)));
            }
            row
        })
        .collect();

    WideTable { headers, rows }
}

/// Results table: per prompt N trial columns and a mode column, then the
/// ground truth and its justification
///
/// Ground truth is left-joined on case ID; cases without truth show
/// [`UNGRADABLE`].
#[must_use]
pub fn wide_table(run: &ModelRun, truth: &GroundTruth) -> WideTable {
    let mut headers = vec![crate::cases::ID_COLUMN.to_string()];
    for prompt in run.prompts() {
        headers.extend((1..=run.validation()).map(|t| trial_column(prompt.prompt_id(), t)));
        headers.push(mode_column(prompt.prompt_id()));
    }
    headers.push(TRUTH_COLUMN.to_string());
    headers.push(JUSTIFICATION_COLUMN.to_string());

    let rows = case_order(run)
        .into_iter()
        .map(|case_id| {
            let mut row = vec![case_id.to_string()];
            for prompt in run.prompts() {
                let trials = prompt.get(case_id);
                row.extend(trial_cells(run, trials));
                row.push(
                    trials
                        .and_then(majority_vote)
                        .map(|v| v.verdict.to_string())
                        .unwrap_or_default(),
                );
            }
            match truth.get(case_id) {
                Some(entry) => {
                    row.push(entry.severity.label().to_string());
                    row.push(entry.justification.clone());
                }
                None => {
                    row.push(UNGRADABLE.to_string());
                    row.push(String::new());
                }
            }
            row
        })
        .collect();

    WideTable { headers, rows }
}

fn case_order(run: &ModelRun) -> Vec<&str> {
    let mut order: Vec<&str> = Vec::new();
    for prompt in run.prompts() {
        for id in prompt.case_ids() {
            if !order.contains(&id) {
                order.push(id);
            }
        }
    }
    order
}

fn trial_cells(run: &ModelRun, trials: Option<&crate::records::CaseTrials>) -> Vec<String> {
    (0..run.validation())
        .map(|i| {
            trials
                .and_then(|c| c.trials().get(i))
                .map(|t| t.answer.clone())
                .unwrap_or_default()
        })
        .collect()
}

/// Scalar results of one (model, prompt) pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryRow {
    /// Model identifier
    pub model: String,
    /// Prompt identifier, or [`TOTAL_PROMPT`]
    pub prompt: String,
    /// Majority-verdict accuracy
    pub accuracy: f64,
    /// Majority-verdict macro precision
    pub precision: f64,
    /// Majority-verdict macro recall
    pub recall: f64,
    /// Majority-verdict macro F1
    pub f1: f64,
    /// Share of majority misses that under-triage
    pub under_triage_rate: f64,
    /// Share of majority misses that over-triage
    pub over_triage_rate: f64,
    /// Share of majority verdicts that are unparseable
    pub unparseable_rate: f64,
    /// Mean pairwise inter-trial agreement
    pub agreement: f64,
    /// Per-trial accuracy
    pub raw_accuracy: f64,
    /// Per-trial macro precision
    pub raw_precision: f64,
    /// Per-trial macro recall
    pub raw_recall: f64,
    /// Per-trial macro F1
    pub raw_f1: f64,
    /// Share of trial misses that under-triage
    pub raw_under_triage_rate: f64,
    /// Share of trial misses that over-triage
    pub raw_over_triage_rate: f64,
    /// Lower bound of the accuracy CI
    pub ci_lower: f64,
    /// Upper bound of the accuracy CI
    pub ci_upper: f64,
}

impl SummaryRow {
    fn values(&self) -> [f64; 16] {
        [
            self.accuracy,
            self.precision,
            self.recall,
            self.f1,
            self.under_triage_rate,
            self.over_triage_rate,
            self.unparseable_rate,
            self.agreement,
            self.raw_accuracy,
            self.raw_precision,
            self.raw_recall,
            self.raw_f1,
            self.raw_under_triage_rate,
            self.raw_over_triage_rate,
            self.ci_lower,
            self.ci_upper,
        ]
    }

    fn from_values(model: &str, prompt: &str, v: [f64; 16]) -> Self {
        Self {
            model: model.to_string(),
            prompt: prompt.to_string(),
            accuracy: v[0],
            precision: v[1],
            recall: v[2],
            f1: v[3],
            under_triage_rate: v[4],
            over_triage_rate: v[5],
            unparseable_rate: v[6],
            agreement: v[7],
            raw_accuracy: v[8],
            raw_precision: v[9],
            raw_recall: v[10],
            raw_f1: v[11],
            raw_under_triage_rate: v[12],
            raw_over_triage_rate: v[13],
            ci_lower: v[14],
            ci_upper: v[15],
        }
    }

    /// Row averaging every numeric column of `rows`
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn total(model: &str, rows: &[Self]) -> Self {
        let mut sums = [0.0; 16];
        for row in rows {
            for (sum, value) in sums.iter_mut().zip(row.values()) {
                *sum += value;
            }
        }
        if !rows.is_empty() {
            for sum in &mut sums {
                *sum /= rows.len() as f64;
            }
        }
        Self::from_values(model, TOTAL_PROMPT, sums)
    }

    /// Copy with every numeric column rounded to `decimals` places
    #[must_use]
    pub fn rounded(&self, decimals: i32) -> Self {
        Self::from_values(&self.model, &self.prompt, self.values().map(|v| round_to(v, decimals)))
    }

    /// Whether this is a per-model total row
    #[must_use]
    pub fn is_total(&self) -> bool {
        self.prompt == TOTAL_PROMPT
    }
}

/// Round half away from zero to `decimals` places
#[must_use]
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10_f64.powi(decimals);
    (value * factor).round() / factor
}

/// Report section of one model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSection {
    /// Model identifier
    pub model: String,
    /// Trials per case
    pub validation: usize,
    /// Cases reported
    pub cases: usize,
    /// Raw trial answers
    pub raw: WideTable,
    /// Trial answers, verdicts and truth
    pub results: WideTable,
    /// Per-prompt rows then the total row; empty when scoring failed
    pub summary: Vec<SummaryRow>,
    /// Why the summary could not be built
    pub error: Option<String>,
}

/// Report metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportMetadata {
    /// Report title
    pub title: String,
    /// Report generation timestamp
    pub generated_at: DateTime<Utc>,
    /// Framework version
    pub framework_version: String,
    /// Statistical configuration used
    pub stat_config: StatConfigSummary,
    /// Whether only completed cases of unfinished runs were reported
    pub partial: bool,
}

/// Statistical configuration summary
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatConfigSummary {
    /// Bootstrap resamples
    pub bootstrap_n: usize,
    /// Confidence level
    pub confidence: f64,
    /// Significance threshold before correction
    pub alpha: f64,
    /// Discordant pairs below which the exact test is used
    pub exact_threshold: u64,
}

impl From<&StatConfig> for StatConfigSummary {
    fn from(config: &StatConfig) -> Self {
        Self {
            bootstrap_n: config.bootstrap_n,
            confidence: config.confidence,
            alpha: config.alpha,
            exact_threshold: config.exact_threshold,
        }
    }
}

/// Full evaluation report with all analysis
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FullReport {
    /// Report metadata
    pub metadata: ReportMetadata,
    /// Per-model sections
    pub models: Vec<ModelSection>,
    /// Pairwise model comparisons
    pub comparisons: Vec<ModelComparison>,
}

/// Report builder for constructing full reports
pub struct ReportBuilder {
    title: String,
    stat_config: StatConfig,
    partial: bool,
    runs: Vec<ModelRun>,
}

impl ReportBuilder {
    /// Create a new report builder
    #[must_use]
    pub fn new(title: &str) -> Self {
        Self {
            title: title.to_string(),
            stat_config: StatConfig::default(),
            partial: false,
            runs: Vec::new(),
        }
    }

    /// Set statistical configuration
    #[must_use]
    pub fn with_stat_config(mut self, config: StatConfig) -> Self {
        self.stat_config = config;
        self
    }

    /// Report only the completed cases of each run
    #[must_use]
    pub const fn partial(mut self, partial: bool) -> Self {
        self.partial = partial;
        self
    }

    /// Add a model run
    pub fn add_run(&mut self, run: ModelRun) {
        self.runs.push(run);
    }

    /// Add every run of a store
    pub fn add_runs<'a>(&mut self, runs: impl IntoIterator<Item = &'a ModelRun>) {
        self.runs.extend(runs.into_iter().cloned());
    }

    /// Build the full report
    ///
    /// Truth is restricted to each run's cases, so a run over a window of the
    /// case table is scored against that window. A model whose run cannot be
    /// scored keeps its tables, records the error and is left out of the
    /// comparisons.
    #[must_use]
    pub fn build(mut self, truth: &GroundTruth) -> FullReport {
        let runs: Vec<ModelRun> = if self.partial {
            self.runs.iter().map(ModelRun::completed_view).collect()
        } else {
            std::mem::take(&mut self.runs)
        };

        let models: Vec<ModelSection> = runs
            .iter()
            .map(|run| self.build_section(run, truth))
            .collect();
        let scored: Vec<ModelRun> = runs
            .into_iter()
            .zip(&models)
            .filter(|(_, section)| section.error.is_none())
            .map(|(run, _)| run)
            .collect();
        let comparisons = compare_models(&scored, truth, &self.stat_config);

        FullReport {
            metadata: ReportMetadata {
                title: self.title,
                generated_at: Utc::now(),
                framework_version: env!("CARGO_PKG_VERSION").to_string(),
                stat_config: StatConfigSummary::from(&self.stat_config),
                partial: self.partial,
            },
            models,
            comparisons,
        }
    }

    fn build_section(&self, run: &ModelRun, truth: &GroundTruth) -> ModelSection {
        let (summary, error) = match self.build_summary(run, truth) {
            Ok(rows) => (rows, None),
            Err(e) => {
                tracing::warn!(model = %run.model(), error = %e, "summary not computable");
                (Vec::new(), Some(e.to_string()))
            }
        };
        ModelSection {
            model: run.model().to_string(),
            validation: run.validation(),
            cases: case_order(run).len(),
            raw: raw_table(run),
            results: wide_table(run, truth),
            summary,
            error,
        }
    }

    fn build_summary(
        &self,
        run: &ModelRun,
        truth: &GroundTruth,
    ) -> Result<Vec<SummaryRow>, crate::metrics::ScoringError> {
        run.validate()?;
        let scoped = truth.restrict(case_order(run));
        let mut rows = run
            .prompts()
            .iter()
            .map(|prompt| {
                let score = score_prompt(run.model(), prompt, &scoped, &self.stat_config)?;
                Ok(SummaryRow {
                    model: score.model,
                    prompt: score.prompt,
                    accuracy: score.mode.accuracy,
                    precision: score.mode.precision,
                    recall: score.mode.recall,
                    f1: score.mode.f1,
                    under_triage_rate: score.mode.under_triage_rate,
                    over_triage_rate: score.mode.over_triage_rate,
                    unparseable_rate: score.mode.unparseable_rate,
                    agreement: score.agreement,
                    raw_accuracy: score.raw.accuracy,
                    raw_precision: score.raw.precision,
                    raw_recall: score.raw.recall,
                    raw_f1: score.raw.f1,
                    raw_under_triage_rate: score.raw.under_triage_rate,
                    raw_over_triage_rate: score.raw.over_triage_rate,
                    ci_lower: score.accuracy_ci.0,
                    ci_upper: score.accuracy_ci.1,
                })
            })
            .collect::<Result<Vec<_>, crate::metrics::ScoringError>>()?;
        rows.push(SummaryRow::total(run.model(), &rows));
        Ok(rows)
    }
}

/// Table row for text/markdown output
#[derive(Tabled)]
struct SummaryTableRow {
    #[tabled(rename = "Model")]
    model: String,
    #[tabled(rename = "Prompt")]
    prompt: String,
    #[tabled(rename = "Accuracy")]
    accuracy: String,
    #[tabled(rename = "F1")]
    f1: String,
    #[tabled(rename = "Under")]
    under: String,
    #[tabled(rename = "Over")]
    over: String,
    #[tabled(rename = "Agreement")]
    agreement: String,
    #[tabled(rename = "Raw Acc")]
    raw_accuracy: String,
}

impl From<&SummaryRow> for SummaryTableRow {
    fn from(row: &SummaryRow) -> Self {
        Self {
            model: row.model.clone(),
            prompt: row.prompt.clone(),
            accuracy: format!(
                "{:.2}% [{:.2}-{:.2}]",
                row.accuracy * 100.0,
                row.ci_lower * 100.0,
                row.ci_upper * 100.0
            ),
            f1: format!("{:.3}", row.f1),
            under: format!("{:.2}", row.under_triage_rate),
            over: format!("{:.2}", row.over_triage_rate),
            agreement: format!("{:.2}", row.agreement),
            raw_accuracy: format!("{:.2}%", row.raw_accuracy * 100.0),
        }
    }
}

#[derive(Tabled)]
struct ComparisonTableRow {
    #[tabled(rename = "Prompt")]
    prompt: String,
    #[tabled(rename = "Model A")]
    model_a: String,
    #[tabled(rename = "Model B")]
    model_b: String,
    #[tabled(rename = "A only")]
    first_only: u64,
    #[tabled(rename = "B only")]
    second_only: u64,
    #[tabled(rename = "Test")]
    method: String,
    #[tabled(rename = "p-value")]
    p_value: String,
    #[tabled(rename = "Significant")]
    significant: String,
}

impl From<&ModelComparison> for ComparisonTableRow {
    fn from(cmp: &ModelComparison) -> Self {
        Self {
            prompt: cmp.prompt.clone(),
            model_a: cmp.model_a.clone(),
            model_b: cmp.model_b.clone(),
            first_only: cmp.table.first_only,
            second_only: cmp.table.second_only,
            method: cmp.test.as_ref().map_or("-", |t| method_name(t.method)).to_string(),
            p_value: cmp
                .test
                .as_ref()
                .map_or_else(|| "n/a".to_string(), |t| format!("{:.4}", t.p_value)),
            significant: if cmp.is_significant() { "✓" } else { "" }.to_string(),
        }
    }
}

/// Display name of a McNemar test form
#[must_use]
pub const fn method_name(method: McNemarMethod) -> &'static str {
    match method {
        McNemarMethod::Exact => "exact",
        McNemarMethod::Asymptotic => "chi2",
    }
}

impl FullReport {
    /// All summary rows across models
    pub fn summary_rows(&self) -> impl Iterator<Item = &SummaryRow> {
        self.models.iter().flat_map(|m| m.summary.iter())
    }

    /// Render report as JSON
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Render report as Markdown
    #[must_use]
    pub fn to_markdown(&self) -> String {
        let mut output = String::new();

        writeln!(output, "# {}", self.metadata.title).ok();
        writeln!(output).ok();
        writeln!(
            output,
            "**Generated:** {}",
            self.metadata.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
        )
        .ok();
        writeln!(
            output,
            "**Framework Version:** {}",
            self.metadata.framework_version
        )
        .ok();
        if self.metadata.partial {
            writeln!(output, "**Partial:** completed cases only").ok();
        }
        writeln!(output).ok();

        writeln!(output, "## Summary").ok();
        writeln!(output).ok();
        writeln!(
            output,
            "| Model | Prompt | Accuracy | 95% CI | Precision | Recall | F1 | Under-triage | Over-triage | Agreement | Raw Accuracy |"
        )
        .ok();
        writeln!(
            output,
            "|-------|--------|----------|--------|-----------|--------|----|--------------|-------------|-----------|--------------|"
        )
        .ok();
        for row in self.summary_rows() {
            let prompt = if row.is_total() {
                format!("**{}**", row.prompt)
            } else {
                row.prompt.clone()
            };
            writeln!(
                output,
                "| {} | {} | {:.2}% | [{:.2}-{:.2}] | {:.3} | {:.3} | {:.3} | {:.2} | {:.2} | {:.2} | {:.2}% |",
                row.model,
                prompt,
                row.accuracy * 100.0,
                row.ci_lower * 100.0,
                row.ci_upper * 100.0,
                row.precision,
                row.recall,
                row.f1,
                row.under_triage_rate,
                row.over_triage_rate,
                row.agreement,
                row.raw_accuracy * 100.0
            )
            .ok();
        }
        writeln!(output).ok();

        let failed: Vec<&ModelSection> = self.models.iter().filter(|m| m.error.is_some()).collect();
        if !failed.is_empty() {
            writeln!(output, "## Unscored Models").ok();
            writeln!(output).ok();
            for section in failed {
                writeln!(
                    output,
                    "- **{}**: {}",
                    section.model,
                    section.error.as_deref().unwrap_or_default()
                )
                .ok();
            }
            writeln!(output).ok();
        }

        if !self.comparisons.is_empty() {
            writeln!(output, "## Model Comparisons (McNemar)").ok();
            writeln!(output).ok();
            writeln!(
                output,
                "| Prompt | Model A | Model B | A only | B only | Test | p-value | Significant |"
            )
            .ok();
            writeln!(
                output,
                "|--------|---------|---------|--------|--------|------|---------|-------------|"
            )
            .ok();
            for cmp in &self.comparisons {
                let row = ComparisonTableRow::from(cmp);
                writeln!(
                    output,
                    "| {} | {} | {} | {} | {} | {} | {} | {} |",
                    row.prompt,
                    row.model_a,
                    row.model_b,
                    row.first_only,
                    row.second_only,
                    row.method,
                    row.p_value,
                    row.significant
                )
                .ok();
            }
            writeln!(output).ok();
        }

        writeln!(output, "## Configuration").ok();
        writeln!(output).ok();
        writeln!(
            output,
            "- Bootstrap samples: {}",
            self.metadata.stat_config.bootstrap_n
        )
        .ok();
        writeln!(
            output,
            "- Confidence level: {:.0}%",
            self.metadata.stat_config.confidence * 100.0
        )
        .ok();
        writeln!(
            output,
            "- Significance threshold: α = {} (Bonferroni-corrected per comparison)",
            self.metadata.stat_config.alpha
        )
        .ok();

        output
    }

    /// Render report as plain text table
    #[must_use]
    pub fn to_text(&self) -> String {
        let mut output = String::new();

        writeln!(
            output,
            "═══════════════════════════════════════════════════════════════"
        )
        .ok();
        writeln!(output, "  {}", self.metadata.title).ok();
        writeln!(
            output,
            "═══════════════════════════════════════════════════════════════"
        )
        .ok();
        writeln!(output).ok();

        writeln!(output, "SUMMARY").ok();
        writeln!(
            output,
            "───────────────────────────────────────────────────────────────"
        )
        .ok();
        let rows: Vec<SummaryTableRow> = self.summary_rows().map(SummaryTableRow::from).collect();
        if rows.is_empty() {
            writeln!(output, "  (no scored models)").ok();
        } else {
            writeln!(output, "{}", Table::new(rows)).ok();
        }
        for section in &self.models {
            if let Some(error) = &section.error {
                writeln!(output, "  {}: not scored ({error})", section.model).ok();
            }
        }

        if !self.comparisons.is_empty() {
            writeln!(output).ok();
            writeln!(output, "COMPARISONS").ok();
            writeln!(
                output,
                "───────────────────────────────────────────────────────────────"
            )
            .ok();
            let rows: Vec<ComparisonTableRow> =
                self.comparisons.iter().map(ComparisonTableRow::from).collect();
            writeln!(output, "{}", Table::new(rows)).ok();
        }

        output
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::records::Trial;

    fn run_with(model: &str, answers: &[(&str, &[&str])]) -> ModelRun {
        let validation = answers.first().map_or(1, |(_, a)| a.len());
        let mut run = ModelRun::new(model, validation).unwrap();
        for (case, trials) in answers {
            for answer in *trials {
                run.record("prompt_1", case, Trial::new(*answer, "porque")).unwrap();
            }
        }
        run
    }

    fn truth() -> GroundTruth {
        GroundTruth::from_labels([("1", "Vermelho"), ("2", "Verde"), ("3", "Amarelo")]).unwrap()
    }

    fn scenario_run() -> ModelRun {
        run_with(
            "m1",
            &[
                ("1", &["Vermelho", "Vermelho", "Laranja"]),
                ("2", &["Verde", "Verde", "Verde"]),
                ("3", &["Amarelo", "Vermelho", "Amarelo"]),
            ],
        )
    }

    // =========================================================================
    // Wide tables
    // =========================================================================

    #[test]
    fn test_wide_table_columns() {
        let table = wide_table(&scenario_run(), &truth());
        assert_eq!(
            table.headers,
            vec![
                "ID",
                "prompt_1 (1x)",
                "prompt_1 (2x)",
                "prompt_1 (3x)",
                "prompt_1 (mode)",
                "Ground Truth",
                "Justification"
            ]
        );
        assert_eq!(table.rows.len(), 3);
        assert_eq!(table.cell("3", "prompt_1 (2x)"), Some("Vermelho"));
        assert_eq!(table.cell("3", "prompt_1 (mode)"), Some("Amarelo"));
        assert_eq!(table.cell("1", "Ground Truth"), Some("Vermelho"));
    }

    #[test]
    fn test_wide_table_missing_truth_is_ungradable() {
        let run = run_with("m1", &[("1", &["Verde"]), ("99", &["Azul"])]);
        let table = wide_table(&run, &truth());
        assert_eq!(table.cell("99", TRUTH_COLUMN), Some(UNGRADABLE));
        assert_eq!(table.cell("99", JUSTIFICATION_COLUMN), Some(""));
        assert_eq!(table.cell("1", TRUTH_COLUMN), Some("Vermelho"));
    }

    #[test]
    fn test_raw_table_has_no_mode_or_truth() {
        let table = raw_table(&scenario_run());
        assert_eq!(table.headers.len(), 4);
        assert!(table.column("prompt_1 (mode)").is_none());
        assert!(table.column(TRUTH_COLUMN).is_none());
    }

    #[test]
    fn test_wide_table_mode_tie_takes_first_trial() {
        let run = run_with("m1", &[("1", &["Laranja", "Vermelho"])]);
        let table = wide_table(&run, &truth());
        assert_eq!(table.cell("1", "prompt_1 (mode)"), Some("Laranja"));
    }

    // =========================================================================
    // Summary rows
    // =========================================================================

    #[test]
    fn test_summary_with_total_row() {
        let mut builder = ReportBuilder::new("test");
        builder.add_run(scenario_run());
        let report = builder.build(&truth());
        let summary = &report.models[0].summary;
        assert_eq!(summary.len(), 2);
        assert!((summary[0].accuracy - 1.0).abs() < 1e-9);
        assert!((summary[0].raw_accuracy - 7.0 / 9.0).abs() < 1e-9);
        assert!(summary[1].is_total());
        assert!((summary[1].raw_accuracy - summary[0].raw_accuracy).abs() < 1e-12);
    }

    #[test]
    fn test_total_row_averages() {
        let a = SummaryRow::from_values("m", "p1", [1.0; 16]);
        let b = SummaryRow::from_values("m", "p2", [0.0; 16]);
        let total = SummaryRow::total("m", &[a, b]);
        assert_eq!(total.prompt, TOTAL_PROMPT);
        assert!((total.accuracy - 0.5).abs() < f64::EPSILON);
        assert!((total.ci_upper - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_rounded() {
        let row = SummaryRow::from_values("m", "p", [7.0 / 9.0; 16]);
        let rounded = row.rounded(2);
        assert!((rounded.raw_accuracy - 0.78).abs() < 1e-12);
        assert!((round_to(0.125, 2) - 0.13).abs() < 1e-12);
    }

    #[test]
    fn test_incomplete_run_records_error() {
        let mut run = ModelRun::new("m1", 2).unwrap();
        run.record("prompt_1", "1", Trial::new("Vermelho", "")).unwrap();
        let mut builder = ReportBuilder::new("test");
        builder.add_run(run);
        let report = builder.build(&truth());
        let section = &report.models[0];
        assert!(section.summary.is_empty());
        assert!(section.error.as_deref().is_some_and(|e| e.contains("expected 2")));
        // Tables are still produced
        assert_eq!(section.results.rows.len(), 1);
    }

    #[test]
    fn test_unscored_run_not_compared() {
        let mut partial = ModelRun::new("b", 3).unwrap();
        partial.record("prompt_1", "1", Trial::new("Verde", "")).unwrap();
        let mut builder = ReportBuilder::new("test");
        builder.add_run(scenario_run());
        builder.add_run(partial);
        let report = builder.build(&truth());
        assert!(report.models[0].error.is_none());
        assert!(report.models[1].error.is_some());
        assert!(report.comparisons.is_empty());
    }

    #[test]
    fn test_partial_report_uses_completed_cases() {
        let mut run = ModelRun::new("m1", 2).unwrap();
        for case in ["1", "2"] {
            run.record("prompt_1", case, Trial::new("Vermelho", "")).unwrap();
            run.record("prompt_1", case, Trial::new("Vermelho", "")).unwrap();
        }
        run.record("prompt_1", "3", Trial::new("Amarelo", "")).unwrap();

        let mut builder = ReportBuilder::new("test").partial(true);
        builder.add_run(run);
        let report = builder.build(&truth());
        let section = &report.models[0];
        assert!(section.error.is_none());
        assert_eq!(section.cases, 2);
        assert!((section.summary[0].accuracy - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_unknown_case_fails_summary_only() {
        let run = run_with("m1", &[("1", &["Vermelho"]), ("99", &["Azul"])]);
        let mut builder = ReportBuilder::new("test");
        builder.add_run(run);
        let report = builder.build(&truth());
        assert!(report.models[0].error.as_deref().is_some_and(|e| e.contains("99")));
    }

    // =========================================================================
    // Rendering
    // =========================================================================

    #[test]
    fn test_render_formats() {
        let mut builder = ReportBuilder::new("Triage Report");
        builder.add_run(scenario_run());
        builder.add_run(run_with(
            "m2",
            &[
                ("1", &["Azul", "Azul", "Azul"]),
                ("2", &["Verde", "Verde", "Verde"]),
                ("3", &["Azul", "Azul", "Azul"]),
            ],
        ));
        let report = builder.build(&truth());
        assert_eq!(report.comparisons.len(), 1);

        let json = report.to_json().unwrap();
        assert!(json.contains("\"comparisons\""));
        assert!(json.contains("\"under_triage_rate\""));

        let md = report.to_markdown();
        assert!(md.contains("# Triage Report"));
        assert!(md.contains("**Total**"));
        assert!(md.contains("McNemar"));

        let text = report.to_text();
        assert!(text.contains("SUMMARY"));
        assert!(text.contains("m2"));
    }
}
