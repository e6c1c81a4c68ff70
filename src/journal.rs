//! Append-only trial journal.
//!
//! Every trial is written as one JSON line and flushed before the next query,
//! so an interrupted evaluation loses at most the trial in flight. A sidecar
//! `.lock` file holding the writer's PID keeps a second writer off the same
//! journal; a lock whose writer is no longer running is reclaimed. Replaying a
//! journal rebuilds the [`EvaluationStore`] it was written from.

use crate::records::{EvaluationStore, RecordError, Trial};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors raised while writing or replaying a journal
#[derive(Error, Debug)]
pub enum JournalError {
    #[error("Journal IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Journal {0} is locked by another writer")]
    Locked(PathBuf),

    #[error("Malformed journal line {line}: {source}")]
    Malformed {
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to encode journal record: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("Journal line {line}: trial {expected} of {model}/{prompt}/{case_id} recorded as trial {found}")]
    OutOfOrder {
        line: usize,
        model: String,
        prompt: String,
        case_id: String,
        expected: usize,
        found: usize,
    },

    #[error("Journal line {line}: {source}")]
    Record {
        line: usize,
        #[source]
        source: RecordError,
    },
}

/// One journaled trial
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalRecord {
    /// Model identifier
    pub model: String,
    /// Trials per case of the run
    pub validation: usize,
    /// Prompt identifier
    pub prompt: String,
    /// Case identifier
    pub case_id: String,
    /// 1-based trial position
    pub trial: usize,
    /// Parsed answer
    pub answer: String,
    /// Parsed explanation
    pub explanation: String,
    /// Raw model output, when kept
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw: Option<String>,
    /// When the trial was recorded
    pub recorded_at: DateTime<Utc>,
}

impl JournalRecord {
    /// The trial this record holds
    #[must_use]
    pub fn to_trial(&self) -> Trial {
        Trial::new(self.answer.clone(), self.explanation.clone())
    }
}

/// Sidecar lock path of a journal
#[must_use]
pub fn lock_path(journal: &Path) -> PathBuf {
    let mut name = journal.as_os_str().to_os_string();
    name.push(".lock");
    PathBuf::from(name)
}

/// Create the lock file holding our PID; `false` if it already exists
fn try_lock(lock: &Path) -> Result<bool, JournalError> {
    match OpenOptions::new().write(true).create_new(true).open(lock) {
        Ok(mut file) => {
            if let Err(e) = writeln!(file, "{}", std::process::id()) {
                std::fs::remove_file(lock).ok();
                return Err(e.into());
            }
            Ok(true)
        }
        Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => Ok(false),
        Err(e) => Err(e.into()),
    }
}

/// Whether the process named in a lock file is still running
///
/// A lock whose PID cannot be read is treated as held.
fn holder_alive(lock: &Path) -> bool {
    let Ok(content) = std::fs::read_to_string(lock) else {
        return true;
    };
    content
        .trim()
        .parse::<u32>()
        .map_or(true, process_running)
}

#[cfg(unix)]
fn process_running(pid: u32) -> bool {
    let Ok(pid) = libc::pid_t::try_from(pid) else {
        return false;
    };
    // SAFETY: signal 0 only checks that the process exists
    if unsafe { libc::kill(pid, 0) } == 0 {
        return true;
    }
    std::io::Error::last_os_error().raw_os_error() == Some(libc::EPERM)
}

#[cfg(not(unix))]
fn process_running(_pid: u32) -> bool {
    true
}

/// Single writer appending to a journal
#[derive(Debug)]
pub struct JournalWriter {
    path: PathBuf,
    lock: PathBuf,
    out: BufWriter<File>,
    written: usize,
}

impl JournalWriter {
    /// Open a journal for appending, taking its lock
    ///
    /// A lock left behind by a process that is no longer running is taken
    /// over.
    ///
    /// # Errors
    ///
    /// Returns `JournalError::Locked` if a running process holds the lock.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, JournalError> {
        let path = path.as_ref().to_path_buf();
        let lock = lock_path(&path);
        if !try_lock(&lock)? {
            if holder_alive(&lock) {
                return Err(JournalError::Locked(path));
            }
            tracing::warn!(lock = %lock.display(), "removing stale journal lock");
            std::fs::remove_file(&lock).ok();
            if !try_lock(&lock)? {
                return Err(JournalError::Locked(path));
            }
        }

        let file = match OpenOptions::new().create(true).append(true).open(&path) {
            Ok(file) => file,
            Err(e) => {
                std::fs::remove_file(&lock).ok();
                return Err(e.into());
            }
        };
        tracing::debug!(journal = %path.display(), "journal opened");
        Ok(Self {
            path,
            lock,
            out: BufWriter::new(file),
            written: 0,
        })
    }

    /// Journal path
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Records appended through this writer
    #[must_use]
    pub const fn written(&self) -> usize {
        self.written
    }

    /// Append one record and flush it to disk
    ///
    /// # Errors
    ///
    /// Returns an error if the record cannot be encoded or written.
    pub fn append(&mut self, record: &JournalRecord) -> Result<(), JournalError> {
        let line = serde_json::to_string(record)?;
        writeln!(self.out, "{line}")?;
        self.out.flush()?;
        self.written += 1;
        Ok(())
    }
}

impl Drop for JournalWriter {
    fn drop(&mut self) {
        self.out.flush().ok();
        if let Err(e) = std::fs::remove_file(&self.lock) {
            tracing::warn!(
                lock = %self.lock.display(),
                error = %e,
                "failed to release journal lock"
            );
        }
    }
}

/// Read every record of a journal
///
/// A malformed final line is an interrupted write and is dropped with a
/// warning; a malformed line anywhere else is an error.
///
/// # Errors
///
/// Returns an error if the file cannot be read or holds malformed lines.
pub fn read_journal<P: AsRef<Path>>(path: P) -> Result<Vec<JournalRecord>, JournalError> {
    let file = File::open(path.as_ref())?;
    let lines: Vec<String> = BufReader::new(file).lines().collect::<Result<_, _>>()?;
    let last = lines.iter().rposition(|l| !l.trim().is_empty());

    let mut records = Vec::with_capacity(lines.len());
    for (idx, line) in lines.iter().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<JournalRecord>(line) {
            Ok(record) => records.push(record),
            Err(source) if Some(idx) == last => {
                tracing::warn!(
                    journal = %path.as_ref().display(),
                    line = idx + 1,
                    error = %source,
                    "dropping truncated final journal line"
                );
            }
            Err(source) => {
                return Err(JournalError::Malformed {
                    line: idx + 1,
                    source,
                })
            }
        }
    }
    Ok(records)
}

/// Replay records into a store, checking each lands at its recorded position
///
/// # Errors
///
/// Returns `JournalError::OutOfOrder` if trials were not journaled in order,
/// or `JournalError::Record` if the store rejects a record.
pub fn replay(records: &[JournalRecord], store: &mut EvaluationStore) -> Result<(), JournalError> {
    for (idx, record) in records.iter().enumerate() {
        let line = idx + 1;
        let expected = store.trial_count(&record.model, &record.prompt, &record.case_id) + 1;
        if record.trial != expected {
            return Err(JournalError::OutOfOrder {
                line,
                model: record.model.clone(),
                prompt: record.prompt.clone(),
                case_id: record.case_id.clone(),
                expected,
                found: record.trial,
            });
        }
        store
            .record(
                &record.model,
                record.validation,
                &record.prompt,
                &record.case_id,
                record.to_trial(),
            )
            .map_err(|source| JournalError::Record { line, source })?;
    }
    Ok(())
}

/// Load a journal into a new store
///
/// # Errors
///
/// Propagates errors from [`read_journal`] and [`replay`].
pub fn load_store<P: AsRef<Path>>(path: P) -> Result<EvaluationStore, JournalError> {
    let records = read_journal(&path)?;
    let mut store = EvaluationStore::new();
    replay(&records, &mut store)?;
    tracing::info!(
        journal = %path.as_ref().display(),
        trials = records.len(),
        models = store.runs().len(),
        "journal replayed"
    );
    Ok(store)
}
