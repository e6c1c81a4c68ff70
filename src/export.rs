//! Report files on disk.
//!
//! Layout of an output directory:
//!
//! ```text
//! <out>/
//!   <model>/full_response.csv        raw trial answers
//!   <model>/results_summary.csv      trials, mode verdicts and ground truth
//!   summary_statistics.csv           one row per (model, prompt) plus totals
//!   summary_statistics_rounded.csv   same, rounded to 2 decimals
//!   comparisons.csv                  McNemar comparisons
//!   report.json
//!   report.md
//! ```

use crate::report::{method_name, FullReport, SummaryRow, WideTable};
use crate::significance::ModelComparison;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Decimal places of the human-facing summary
pub const ROUNDED_DECIMALS: i32 = 2;

/// Errors that can occur while writing reports
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Failed to write report file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to write CSV: {0}")]
    CsvError(#[from] csv::Error),

    #[error("Failed to encode JSON report: {0}")]
    JsonError(#[from] serde_json::Error),
}

/// One comparison as a flat CSV record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonRecord {
    pub prompt: String,
    pub model_a: String,
    pub model_b: String,
    pub both_correct: u64,
    pub a_only: u64,
    pub b_only: u64,
    pub both_wrong: u64,
    pub method: Option<String>,
    pub statistic: Option<f64>,
    pub p_value: Option<f64>,
    pub alpha: f64,
    pub significant: bool,
}

impl From<&ModelComparison> for ComparisonRecord {
    fn from(cmp: &ModelComparison) -> Self {
        Self {
            prompt: cmp.prompt.clone(),
            model_a: cmp.model_a.clone(),
            model_b: cmp.model_b.clone(),
            both_correct: cmp.table.both_correct,
            a_only: cmp.table.first_only,
            b_only: cmp.table.second_only,
            both_wrong: cmp.table.both_wrong,
            method: cmp.test.as_ref().map(|t| method_name(t.method).to_string()),
            statistic: cmp.test.as_ref().map(|t| t.statistic),
            p_value: cmp.test.as_ref().map(|t| t.p_value),
            alpha: cmp.alpha,
            significant: cmp.is_significant(),
        }
    }
}

/// Directory name for a model identifier
///
/// Characters outside `[A-Za-z0-9._-]` become `_`, so `gemma3:4b` maps to
/// `gemma3_4b`. Use [`model_dir_names`] when writing several models.
#[must_use]
pub fn model_dir_name(model: &str) -> String {
    model
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Directory names for several models, distinct even when sanitizing collides
///
/// A name already taken gets the first free `_2`, `_3`, ... suffix, in model
/// order.
#[must_use]
pub fn model_dir_names<'a>(models: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    let mut taken = HashSet::new();
    models
        .into_iter()
        .map(|model| {
            let base = model_dir_name(model);
            let mut name = base.clone();
            let mut n = 2;
            while !taken.insert(name.clone()) {
                name = format!("{base}_{n}");
                n += 1;
            }
            if name != base {
                tracing::warn!(model, dir = %name, "model directory name collides, using suffix");
            }
            name
        })
        .collect()
}

/// Write a wide table as CSV
///
/// # Errors
///
/// Returns an error if the file cannot be written.
pub fn write_wide_table(path: &Path, table: &WideTable) -> Result<(), ExportError> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(&table.headers)?;
    for row in &table.rows {
        writer.write_record(row)?;
    }
    writer.flush()?;
    Ok(())
}

/// Read a wide table back from CSV
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed.
pub fn read_wide_table(path: &Path) -> Result<WideTable, ExportError> {
    let mut reader = csv::Reader::from_path(path)?;
    let headers = reader.headers()?.iter().map(String::from).collect();
    let rows = reader
        .records()
        .map(|r| r.map(|record| record.iter().map(String::from).collect()))
        .collect::<Result<Vec<Vec<String>>, csv::Error>>()?;
    Ok(WideTable { headers, rows })
}

/// Write summary rows as CSV
///
/// # Errors
///
/// Returns an error if the file cannot be written.
pub fn write_summary<'a>(
    path: &Path,
    rows: impl IntoIterator<Item = &'a SummaryRow>,
) -> Result<(), ExportError> {
    let mut writer = csv::Writer::from_path(path)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

/// Read summary rows back from CSV
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed.
pub fn read_summary(path: &Path) -> Result<Vec<SummaryRow>, ExportError> {
    let mut reader = csv::Reader::from_path(path)?;
    let rows = reader.deserialize().collect::<Result<Vec<SummaryRow>, csv::Error>>()?;
    Ok(rows)
}

/// Write comparisons as CSV
///
/// # Errors
///
/// Returns an error if the file cannot be written.
pub fn write_comparisons(path: &Path, comparisons: &[ModelComparison]) -> Result<(), ExportError> {
    let mut writer = csv::Writer::from_path(path)?;
    for cmp in comparisons {
        writer.serialize(ComparisonRecord::from(cmp))?;
    }
    writer.flush()?;
    Ok(())
}

/// Write every report file under `dir`, creating it if needed
///
/// Returns the paths written.
///
/// # Errors
///
/// Returns the first write failure.
pub fn export_report(report: &FullReport, dir: &Path) -> Result<Vec<PathBuf>, ExportError> {
    std::fs::create_dir_all(dir)?;
    let mut written = Vec::new();

    let dir_names = model_dir_names(report.models.iter().map(|m| m.model.as_str()));
    for (section, dir_name) in report.models.iter().zip(&dir_names) {
        let model_dir = dir.join(dir_name);
        std::fs::create_dir_all(&model_dir)?;

        let raw = model_dir.join("full_response.csv");
        write_wide_table(&raw, &section.raw)?;
        written.push(raw);

        let results = model_dir.join("results_summary.csv");
        write_wide_table(&results, &section.results)?;
        written.push(results);
    }

    let summary = dir.join("summary_statistics.csv");
    write_summary(&summary, report.summary_rows())?;
    written.push(summary);

    let rounded_rows: Vec<SummaryRow> = report
        .summary_rows()
        .map(|row| row.rounded(ROUNDED_DECIMALS))
        .collect();
    let rounded = dir.join("summary_statistics_rounded.csv");
    write_summary(&rounded, &rounded_rows)?;
    written.push(rounded);

    let comparisons = dir.join("comparisons.csv");
    write_comparisons(&comparisons, &report.comparisons)?;
    written.push(comparisons);

    let json = dir.join("report.json");
    std::fs::write(&json, report.to_json()?)?;
    written.push(json);

    let markdown = dir.join("report.md");
    std::fs::write(&markdown, report.to_markdown())?;
    written.push(markdown);

    tracing::info!(dir = %dir.display(), files = written.len(), "reports written");
    Ok(written)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::records::{GroundTruth, ModelRun, Trial};
    use crate::report::ReportBuilder;
    use tempfile::TempDir;

    fn report() -> FullReport {
        let truth =
            GroundTruth::from_labels([("1", "Vermelho"), ("2", "Verde"), ("3", "Amarelo")])
                .unwrap();
        let mut builder = ReportBuilder::new("export test");
        for (model, answers) in [
            ("gemma3:4b", ["Vermelho", "Verde", "Vermelho"]),
            ("llama3", ["Laranja", "Verde", "Amarelo"]),
        ] {
            let mut run = ModelRun::new(model, 1).unwrap();
            for (case, answer) in ["1", "2", "3"].iter().zip(answers) {
                run.record("prompt_1", case, Trial::new(answer, "")).unwrap();
            }
            builder.add_run(run);
        }
        builder.build(&truth)
    }

    #[test]
    fn test_model_dir_name() {
        assert_eq!(model_dir_name("gemma3:4b"), "gemma3_4b");
        assert_eq!(model_dir_name("deepseek-r1:1.5b"), "deepseek-r1_1.5b");
        assert_eq!(model_dir_name("org/model"), "org_model");
    }

    #[test]
    fn test_model_dir_names_disambiguate() {
        let names = model_dir_names(["a:b", "a_b", "a?b", "c"]);
        assert_eq!(names, vec!["a_b", "a_b_2", "a_b_3", "c"]);
    }

    #[test]
    fn test_colliding_models_keep_separate_files() {
        let truth = GroundTruth::from_labels([("1", "Vermelho")]).unwrap();
        let mut builder = ReportBuilder::new("collision");
        for (model, answer) in [("a:b", "Vermelho"), ("a_b", "Azul")] {
            let mut run = ModelRun::new(model, 1).unwrap();
            run.record("prompt_1", "1", Trial::new(answer, "")).unwrap();
            builder.add_run(run);
        }
        let dir = TempDir::new().unwrap();
        export_report(&builder.build(&truth), dir.path()).unwrap();

        let first = read_wide_table(&dir.path().join("a_b/results_summary.csv")).unwrap();
        let second = read_wide_table(&dir.path().join("a_b_2/results_summary.csv")).unwrap();
        assert_eq!(first.cell("1", "prompt_1 (mode)"), Some("Vermelho"));
        assert_eq!(second.cell("1", "prompt_1 (mode)"), Some("Azul"));
    }

    #[test]
    fn test_export_writes_all_files() {
        let dir = TempDir::new().unwrap();
        let written = export_report(&report(), dir.path()).unwrap();
        assert_eq!(written.len(), 9);
        for path in &written {
            assert!(path.exists(), "{} missing", path.display());
        }
        assert!(dir.path().join("gemma3_4b/results_summary.csv").exists());
    }

    #[test]
    fn test_summary_round_trip() {
        let dir = TempDir::new().unwrap();
        let report = report();
        export_report(&report, dir.path()).unwrap();

        let full = read_summary(&dir.path().join("summary_statistics.csv")).unwrap();
        assert_eq!(full.len(), 4);
        let original: Vec<&SummaryRow> = report.summary_rows().collect();
        assert!((full[0].accuracy - original[0].accuracy).abs() < 1e-12);
        assert_eq!(full[3].prompt, "Total");

        let rounded = read_summary(&dir.path().join("summary_statistics_rounded.csv")).unwrap();
        // 2/3 accuracy
        assert!((rounded[0].accuracy - 0.67).abs() < 1e-12);
    }

    #[test]
    fn test_wide_table_round_trip() {
        let dir = TempDir::new().unwrap();
        let report = report();
        export_report(&report, dir.path()).unwrap();
        let table = read_wide_table(&dir.path().join("llama3/results_summary.csv")).unwrap();
        assert_eq!(table, report.models[1].results);
        assert_eq!(table.cell("1", "prompt_1 (mode)"), Some("Laranja"));
    }

    #[test]
    fn test_comparisons_csv() {
        let dir = TempDir::new().unwrap();
        export_report(&report(), dir.path()).unwrap();
        let mut reader = csv::Reader::from_path(dir.path().join("comparisons.csv")).unwrap();
        let records: Vec<ComparisonRecord> = reader.deserialize().map(Result::unwrap).collect();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].a_only, 1);
        assert_eq!(records[0].b_only, 1);
        assert_eq!(records[0].method.as_deref(), Some("exact"));
    }
}
