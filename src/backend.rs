//! Model-serving backends.
//!
//! Queries are sent to a locally installed CLI tool (by default `ollama run`)
//! as a subprocess per trial. The [`ModelBackend`] trait is the seam the
//! runner talks to, so tests and alternative servers can supply their own.

use crate::config::BackendConfig;
use std::io::Read;
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};
use thiserror::Error;

/// Poll interval while waiting for a subprocess
const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Errors that can occur while querying a backend
#[derive(Error, Debug)]
pub enum BackendError {
    #[error("Backend unavailable: {0}")]
    Unavailable(String),

    #[error("Backend execution failed: {0}")]
    ExecutionFailed(String),

    #[error("Backend timeout after {0:?}")]
    Timeout(Duration),

    #[error("Invalid arguments template: {0}")]
    InvalidTemplate(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl BackendError {
    /// Whether retrying the same query cannot succeed
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::Unavailable(_) | Self::InvalidTemplate(_))
    }
}

/// Something that answers a prompt with raw model output
pub trait ModelBackend {
    /// Backend name for logs
    fn name(&self) -> &str;

    /// Check the backend can be reached
    ///
    /// # Errors
    ///
    /// Returns `BackendError::Unavailable` when it cannot.
    fn ensure_available(&self) -> Result<(), BackendError>;

    /// Send one prompt to one model and return its raw text output
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or times out.
    fn query(&self, model: &str, prompt: &str) -> Result<String, BackendError>;

    /// Models the backend can serve, if it can tell
    fn list_models(&self) -> Vec<String> {
        Vec::new()
    }
}

/// Backend that runs a CLI tool per query
#[derive(Debug, Clone)]
pub struct CliBackend {
    config: BackendConfig,
    timeout: Duration,
}

impl CliBackend {
    /// Create a backend from configuration
    #[must_use]
    pub fn new(config: BackendConfig) -> Self {
        let timeout = Duration::from_millis(config.timeout_ms);
        Self { config, timeout }
    }

    /// Create the default Ollama CLI backend
    #[must_use]
    pub fn ollama() -> Self {
        Self::new(BackendConfig::ollama())
    }

    /// Configuration in use
    #[must_use]
    pub const fn config(&self) -> &BackendConfig {
        &self.config
    }

    /// Check if the CLI tool is installed
    #[must_use]
    pub fn is_available(&self) -> bool {
        Command::new("which")
            .arg(&self.config.command)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .is_ok_and(|s| s.success())
    }

    /// Expand the arguments template for one query
    ///
    /// The template is split into words before substitution, so the prompt
    /// always lands in a single argument whatever it contains.
    ///
    /// # Errors
    ///
    /// Returns `BackendError::InvalidTemplate` if the template has unbalanced
    /// quotes.
    #[allow(clippy::literal_string_with_formatting_args)]
    pub fn build_args(&self, model: &str, prompt: &str) -> Result<Vec<String>, BackendError> {
        let words = shell_words::split(&self.config.args_template)
            .map_err(|e| BackendError::InvalidTemplate(e.to_string()))?;
        Ok(words
            .into_iter()
            .map(|word| word.replace("{model}", model).replace("{prompt}", prompt))
            .collect())
    }

    fn run(&self, args: &[String]) -> Result<String, BackendError> {
        let mut child = Command::new(&self.config.command)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;

        // Drain pipes on separate threads so a chatty child cannot block
        let stdout = child.stdout.take().map(spawn_reader);
        let stderr = child.stderr.take().map(spawn_reader);

        let start = Instant::now();
        let status = loop {
            if let Some(status) = child.try_wait()? {
                break status;
            }
            if start.elapsed() > self.timeout {
                child.kill().ok();
                child.wait().ok();
                return Err(BackendError::Timeout(self.timeout));
            }
            thread::sleep(POLL_INTERVAL);
        };

        let output = stdout.and_then(|h| h.join().ok()).unwrap_or_default();
        if !status.success() {
            let errors = stderr.and_then(|h| h.join().ok()).unwrap_or_default();
            return Err(BackendError::ExecutionFailed(format!(
                "{} exited with {status}: {}",
                self.config.command,
                errors.trim()
            )));
        }
        Ok(output)
    }
}

fn spawn_reader<R: Read + Send + 'static>(mut pipe: R) -> thread::JoinHandle<String> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        pipe.read_to_end(&mut buf).ok();
        String::from_utf8_lossy(&buf).into_owned()
    })
}

impl ModelBackend for CliBackend {
    fn name(&self) -> &str {
        &self.config.name
    }

    fn ensure_available(&self) -> Result<(), BackendError> {
        if self.is_available() {
            Ok(())
        } else {
            Err(BackendError::Unavailable(format!(
                "{} not found on PATH",
                self.config.command
            )))
        }
    }

    fn query(&self, model: &str, prompt: &str) -> Result<String, BackendError> {
        self.ensure_available()?;
        let args = self.build_args(model, prompt)?;
        tracing::debug!(backend = %self.config.name, model, "querying");
        self.run(&args)
    }

    fn list_models(&self) -> Vec<String> {
        let Some(list_args) = self.config.list_args.as_deref() else {
            return Vec::new();
        };
        let Ok(args) = shell_words::split(list_args) else {
            return Vec::new();
        };
        match Command::new(&self.config.command).args(args).output() {
            Ok(output) if output.status.success() => {
                parse_model_list(&String::from_utf8_lossy(&output.stdout))
            }
            _ => Vec::new(),
        }
    }
}

/// Model names from tabular `list` output: header line skipped, first column
#[must_use]
pub fn parse_model_list(output: &str) -> Vec<String> {
    output
        .lines()
        .skip(1)
        .filter_map(|line| line.split_whitespace().next())
        .map(String::from)
        .collect()
}

/// Requested models the backend does not report as installed
#[must_use]
pub fn missing_models<'a>(requested: &'a [String], installed: &[String]) -> Vec<&'a str> {
    requested
        .iter()
        .filter(|model| {
            !installed
                .iter()
                .any(|name| name == *model || name.strip_suffix(":latest") == Some(model.as_str()))
        })
        .map(String::as_str)
        .collect()
}
