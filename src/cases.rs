//! Patient case table loading.
//!
//! A case table is a CSV with a unique `ID` column, any number of clinical
//! attribute columns, and two trailing columns holding the correct severity
//! label and its justification.

use crate::records::{GroundTruth, RecordError, TruthEntry};
use crate::severity::SeverityLevel;
use std::collections::HashSet;
use std::io::Read;
use std::path::Path;
use thiserror::Error;

/// Name of the case identifier column
pub const ID_COLUMN: &str = "ID";

/// Errors that can occur while loading a case table
#[derive(Error, Debug)]
pub enum CaseTableError {
    #[error("Failed to read case table: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse case table CSV: {0}")]
    CsvError(#[from] csv::Error),

    #[error("Case table has no ID column")]
    MissingIdColumn,

    #[error("Case table needs an ID column plus truth and justification columns, found {0} columns")]
    TooFewColumns(usize),

    #[error("Duplicate case ID: {0}")]
    DuplicateId(String),

    #[error("Row {row}: empty case ID")]
    EmptyId { row: usize },

    #[error(transparent)]
    Truth(#[from] RecordError),
}

/// One patient case
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaseRecord {
    /// Case identifier
    pub id: String,
    /// Non-empty clinical attributes in column order
    pub attributes: Vec<(String, String)>,
    /// Correct severity label as written in the table
    pub truth_label: String,
    /// Justification of the correct label
    pub justification: String,
}

/// Summary statistics of a case table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaseTableStats {
    /// Number of cases
    pub total_cases: usize,
    /// Number of attribute columns
    pub attribute_columns: usize,
    /// Case count per severity label, ascending urgency; unknown labels last
    pub by_severity: Vec<(String, usize)>,
}

/// Loaded case table
#[derive(Debug, Clone, Default)]
pub struct CaseTable {
    /// Attribute column names in table order
    pub columns: Vec<String>,
    /// Cases in table order
    pub cases: Vec<CaseRecord>,
}

impl CaseTable {
    /// Load a case table from a CSV file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or has the wrong shape.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, CaseTableError> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file)
    }

    /// Parse a case table from CSV data
    ///
    /// # Errors
    ///
    /// Returns an error if the CSV is malformed, lacks an `ID` column, or
    /// contains duplicate IDs.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, CaseTableError> {
        let mut rdr = csv::ReaderBuilder::new()
            .flexible(false)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers = rdr.headers()?.clone();
        let width = headers.len();
        if width < 3 {
            return Err(CaseTableError::TooFewColumns(width));
        }
        let id_idx = headers
            .iter()
            .position(|h| h == ID_COLUMN)
            .ok_or(CaseTableError::MissingIdColumn)?;
        if id_idx >= width - 2 {
            return Err(CaseTableError::MissingIdColumn);
        }

        let attribute_idx: Vec<usize> = (0..width - 2).filter(|&i| i != id_idx).collect();
        let columns = attribute_idx.iter().map(|&i| headers[i].to_string()).collect();

        let mut seen = HashSet::new();
        let mut cases = Vec::new();
        for (row, record) in rdr.records().enumerate() {
            let record = record?;
            let id = record[id_idx].to_string();
            if id.is_empty() {
                return Err(CaseTableError::EmptyId { row: row + 1 });
            }
            if !seen.insert(id.clone()) {
                return Err(CaseTableError::DuplicateId(id));
            }
            let attributes = attribute_idx
                .iter()
                .filter(|&&i| !record[i].is_empty())
                .map(|&i| (headers[i].to_string(), record[i].to_string()))
                .collect();
            cases.push(CaseRecord {
                id,
                attributes,
                truth_label: record[width - 2].to_string(),
                justification: record[width - 1].to_string(),
            });
        }

        Ok(Self { columns, cases })
    }

    /// A new table holding rows `offset..offset + limit`
    #[must_use]
    pub fn window(&self, offset: usize, limit: Option<usize>) -> Self {
        let rows = self.cases.iter().skip(offset);
        let cases = match limit {
            Some(limit) => rows.take(limit).cloned().collect(),
            None => rows.cloned().collect(),
        };
        Self {
            columns: self.columns.clone(),
            cases,
        }
    }

    /// Ground truth of every case
    ///
    /// # Errors
    ///
    /// Returns `CaseTableError::Truth` naming the case with an unrecognized
    /// severity label.
    pub fn ground_truth(&self) -> Result<GroundTruth, CaseTableError> {
        let entries = self
            .cases
            .iter()
            .map(|case| {
                case.truth_label
                    .parse::<SeverityLevel>()
                    .map(|severity| TruthEntry {
                        case_id: case.id.clone(),
                        severity,
                        justification: case.justification.clone(),
                    })
                    .map_err(|source| RecordError::UnknownLabel {
                        case_id: case.id.clone(),
                        source,
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(GroundTruth::from_entries(entries)?)
    }

    /// Number of cases
    #[must_use]
    pub fn len(&self) -> usize {
        self.cases.len()
    }

    /// Whether the table has no cases
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cases.is_empty()
    }

    /// Iterate over cases
    pub fn iter(&self) -> impl Iterator<Item = &CaseRecord> {
        self.cases.iter()
    }

    /// Compute table statistics
    #[must_use]
    pub fn stats(&self) -> CaseTableStats {
        let mut by_severity: Vec<(String, usize)> = SeverityLevel::ALL
            .iter()
            .map(|level| (level.label().to_string(), 0))
            .collect();
        for case in &self.cases {
            let key = case
                .truth_label
                .parse::<SeverityLevel>()
                .map_or_else(|_| case.truth_label.clone(), |l| l.label().to_string());
            match by_severity.iter().position(|(label, _)| *label == key) {
                Some(idx) => by_severity[idx].1 += 1,
                None => by_severity.push((key, 1)),
            }
        }
        CaseTableStats {
            total_cases: self.cases.len(),
            attribute_columns: self.columns.len(),
            by_severity,
        }
    }
}
