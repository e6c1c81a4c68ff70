//! Configuration module for evaluation runs.
//!
//! Handles YAML configuration loading: trials per case, statistical settings,
//! the model-serving backend, models to query and the prompt set.

use crate::metrics::StatConfig;
use crate::prompt::DEFAULT_ANSWERING_RULES;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use thiserror::Error;

/// Model entry standing for every model the backend has installed
pub const ALL_MODELS: &str = "all";

/// Errors that can occur during configuration loading
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read configuration file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse YAML configuration: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("Validation level must be at least 1, got {0}")]
    InvalidValidation(usize),

    #[error("Confidence must be in (0, 1), got {0}")]
    InvalidConfidence(f64),

    #[error("Duplicate prompt id: {0}")]
    DuplicatePrompt(u32),

    #[error("Unknown prompt id: {0}")]
    UnknownPrompt(u32),

    #[error("No models configured")]
    NoModels,

    #[error("All installed models requested, but the backend lists none")]
    NoInstalledModels,

    #[error("No prompts configured")]
    NoPrompts,
}

/// Evaluation settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EvaluationSettings {
    /// Trials per (model, prompt, case)
    #[serde(default = "default_validation")]
    pub validation: usize,
    /// Bootstrap resamples for CI
    #[serde(default = "default_bootstrap_n")]
    pub bootstrap_n: usize,
    /// Confidence level
    #[serde(default = "default_confidence")]
    pub confidence: f64,
    /// Random seed for reproducibility
    #[serde(default = "default_seed")]
    pub seed: u64,
    /// Maximum p-value for significance
    #[serde(default = "default_alpha")]
    pub alpha: f64,
    /// Discordant pairs below which McNemar's exact test is used
    #[serde(default = "default_exact_threshold")]
    pub exact_threshold: u64,
}

const fn default_validation() -> usize {
    1
}
const fn default_bootstrap_n() -> usize {
    10000
}
const fn default_confidence() -> f64 {
    0.95
}
const fn default_seed() -> u64 {
    42
}
const fn default_alpha() -> f64 {
    0.05
}
const fn default_exact_threshold() -> u64 {
    25
}

impl Default for EvaluationSettings {
    fn default() -> Self {
        Self {
            validation: default_validation(),
            bootstrap_n: default_bootstrap_n(),
            confidence: default_confidence(),
            seed: default_seed(),
            alpha: default_alpha(),
            exact_threshold: default_exact_threshold(),
        }
    }
}

impl From<&EvaluationSettings> for StatConfig {
    fn from(settings: &EvaluationSettings) -> Self {
        Self {
            bootstrap_n: settings.bootstrap_n,
            confidence: settings.confidence,
            alpha: settings.alpha,
            seed: settings.seed,
            exact_threshold: settings.exact_threshold,
        }
    }
}

/// Model-serving backend invoked as a CLI subprocess
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BackendConfig {
    /// Name of the backend
    #[serde(default = "default_backend_name")]
    pub name: String,
    /// CLI command to invoke
    #[serde(default = "default_backend_command")]
    pub command: String,
    /// Arguments template with `{model}` and `{prompt}` placeholders
    #[serde(default = "default_args_template")]
    pub args_template: String,
    /// Arguments listing installed models (one per line, name first)
    #[serde(default = "default_list_args")]
    pub list_args: Option<String>,
    /// Timeout per query in milliseconds
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Extra attempts after a failed query
    #[serde(default = "default_max_retries")]
    pub max_retries: usize,
}

fn default_backend_name() -> String {
    "ollama".to_string()
}
fn default_backend_command() -> String {
    "ollama".to_string()
}
fn default_args_template() -> String {
    "run {model} {prompt}".to_string()
}
#[allow(clippy::unnecessary_wraps)]
fn default_list_args() -> Option<String> {
    Some("list".to_string())
}
const fn default_timeout_ms() -> u64 {
    300_000
}
const fn default_max_retries() -> usize {
    2
}

impl BackendConfig {
    /// Create Ollama CLI backend configuration
    #[must_use]
    pub fn ollama() -> Self {
        Self {
            name: default_backend_name(),
            command: default_backend_command(),
            args_template: default_args_template(),
            list_args: default_list_args(),
            timeout_ms: default_timeout_ms(),
            max_retries: default_max_retries(),
        }
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self::ollama()
    }
}

/// A prompt template
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PromptSpec {
    /// Prompt identifier
    pub id: u32,
    /// Human-readable name
    #[serde(default)]
    pub name: String,
    /// Instruction text placed before the case attributes
    pub text: String,
}

/// Complete evaluation configuration loaded from YAML
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EvalConfig {
    /// Evaluation settings
    #[serde(default)]
    pub evaluation: EvaluationSettings,
    /// Backend settings
    #[serde(default)]
    pub backend: BackendConfig,
    /// Models to query; empty or [`ALL_MODELS`] means every installed model
    #[serde(default)]
    pub models: Vec<String>,
    /// Prompt set
    #[serde(default = "default_prompts")]
    pub prompts: Vec<PromptSpec>,
    /// Instructions appended to each prompt (defaults to the JSON rules)
    #[serde(default)]
    pub answering_rules: Option<String>,
}

fn default_prompts() -> Vec<PromptSpec> {
    vec![
        PromptSpec {
            id: 1,
            name: "Prompt Instrucional".to_string(),
            text: "Você é um sistema inteligente de apoio a decisão clínica. Sua tarefa é classificar pacientes segundo o Protocolo de Triagem de Manchester (MTS), com base nas informações fornecidas sobre a queixa principal, sintomas, sinais vitais e possivelmente uma anamnese. O MTS organiza os pacientes em categorias de prioridade com base em critérios clínicos padronizados, e cada categoria define um tempo máximo recomendado para atendimento. A seguir estão os dados do paciente, identifique a categoria mais apropriada (ex: Vermelho, Laranja, Amarelo, Verde ou Azul) e justifique a escolha com base nos critérios do MTS.".to_string(),
        },
        PromptSpec {
            id: 2,
            name: "Prompt de tarefa direta".to_string(),
            text: "Classifique pacientes segundo o Protocolo de Triagem de Manchester (MTS) com base nas informações fornecidas. Indique a categoria mais apropriada (Vermelho, Laranja, Amarelo, Verde ou Azul) e justifique a escolha.".to_string(),
        },
    ]
}

impl Default for EvalConfig {
    fn default() -> Self {
        Self {
            evaluation: EvaluationSettings::default(),
            backend: BackendConfig::default(),
            models: Vec::new(),
            prompts: default_prompts(),
            answering_rules: None,
        }
    }
}

impl EvalConfig {
    /// Load configuration from YAML file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Load configuration from YAML string
    ///
    /// # Errors
    ///
    /// Returns an error if the YAML cannot be parsed.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(yaml)?;
        Ok(config)
    }

    /// Check settings that the query loop relies on
    ///
    /// # Errors
    ///
    /// Returns the first invalid setting found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.evaluation.validation < 1 {
            return Err(ConfigError::InvalidValidation(self.evaluation.validation));
        }
        let confidence = self.evaluation.confidence;
        if !(confidence > 0.0 && confidence < 1.0) {
            return Err(ConfigError::InvalidConfidence(confidence));
        }
        if self.prompts.is_empty() {
            return Err(ConfigError::NoPrompts);
        }
        let mut ids = HashSet::new();
        for prompt in &self.prompts {
            if !ids.insert(prompt.id) {
                return Err(ConfigError::DuplicatePrompt(prompt.id));
            }
        }
        if self.models.is_empty() {
            return Err(ConfigError::NoModels);
        }
        Ok(())
    }

    /// Whether every installed model should be queried
    ///
    /// True when no model is named or one entry is [`ALL_MODELS`] (or its
    /// Portuguese form `Todos`).
    #[must_use]
    pub fn wants_all_models(&self) -> bool {
        self.models.is_empty()
            || self
                .models
                .iter()
                .any(|m| m.eq_ignore_ascii_case(ALL_MODELS) || m.eq_ignore_ascii_case("todos"))
    }

    /// Replace the model list by `installed` when every model is wanted
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::NoInstalledModels` if every model is wanted and
    /// `installed` is empty.
    pub fn expand_models(&mut self, installed: &[String]) -> Result<(), ConfigError> {
        if !self.wants_all_models() {
            return Ok(());
        }
        if installed.is_empty() {
            return Err(ConfigError::NoInstalledModels);
        }
        self.models = installed.to_vec();
        Ok(())
    }

    /// Prompts with the given ids, in configuration order; all prompts if empty
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::UnknownPrompt` for an id not in the configuration.
    pub fn select_prompts(&self, ids: &[u32]) -> Result<Vec<PromptSpec>, ConfigError> {
        let known = |id: &&u32| self.prompts.iter().any(|p| p.id == **id);
        if let Some(&missing) = ids.iter().find(|id| !known(id)) {
            return Err(ConfigError::UnknownPrompt(missing));
        }
        Ok(self
            .prompts
            .iter()
            .filter(|p| ids.is_empty() || ids.contains(&p.id))
            .cloned()
            .collect())
    }

    /// Answering rules appended to each prompt
    #[must_use]
    pub fn answering_rules(&self) -> &str {
        self.answering_rules
            .as_deref()
            .unwrap_or(DEFAULT_ANSWERING_RULES)
    }

    /// Statistical configuration for scoring
    #[must_use]
    pub fn stat_config(&self) -> StatConfig {
        StatConfig::from(&self.evaluation)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_evaluation_settings_default_values() {
        let settings = EvaluationSettings::default();
        assert_eq!(settings.validation, 1);
        assert_eq!(settings.bootstrap_n, 10000);
        assert!((settings.confidence - 0.95).abs() < f64::EPSILON);
        assert_eq!(settings.seed, 42);
        assert!((settings.alpha - 0.05).abs() < f64::EPSILON);
        assert_eq!(settings.exact_threshold, 25);
    }

    #[test]
    fn test_serialization_roundtrip() {
        let config = EvalConfig {
            models: vec!["gemma3:4b".to_string()],
            ..EvalConfig::default()
        };
        let yaml = serde_yaml::to_string(&config).expect("serialize");
        let parsed = EvalConfig::from_yaml(&yaml).expect("deserialize");
        assert_eq!(config, parsed);
    }

    #[test]
    fn test_from_yaml_full() {
        let yaml = r#"
evaluation:
  validation: 3
  alpha: 0.01

backend:
  command: "ollama"
  args_template: "run {model} {prompt}"
  timeout_ms: 1000

models:
  - "gemma3:4b"
  - "deepseek-r1:1.5b"

prompts:
  - id: 7
    name: "short"
    text: "Classifique."

answering_rules: "Responda em JSON."
"#;
        let config = EvalConfig::from_yaml(yaml).expect("parse yaml");
        assert_eq!(config.evaluation.validation, 3);
        assert!((config.evaluation.alpha - 0.01).abs() < f64::EPSILON);
        assert_eq!(config.evaluation.seed, 42); // default
        assert_eq!(config.backend.timeout_ms, 1000);
        assert_eq!(config.backend.max_retries, 2); // default
        assert_eq!(config.models.len(), 2);
        assert_eq!(config.prompts[0].id, 7);
        assert_eq!(config.answering_rules(), "Responda em JSON.");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_yaml_minimal_uses_default_prompts() {
        let config = EvalConfig::from_yaml("models: [m]\n").expect("parse yaml");
        assert_eq!(config.prompts.len(), 2);
        assert_eq!(config.answering_rules(), DEFAULT_ANSWERING_RULES);
        assert_eq!(config.backend, BackendConfig::ollama());
    }

    #[test]
    fn test_validate_errors() {
        let mut config = EvalConfig::default();
        assert!(matches!(config.validate(), Err(ConfigError::NoModels)));

        config.models.push("m".to_string());
        config.evaluation.validation = 0;
        assert!(matches!(config.validate(), Err(ConfigError::InvalidValidation(0))));

        config.evaluation.validation = 3;
        config.prompts.push(config.prompts[0].clone());
        assert!(matches!(config.validate(), Err(ConfigError::DuplicatePrompt(1))));

        config.prompts.clear();
        assert!(matches!(config.validate(), Err(ConfigError::NoPrompts)));
    }

    #[test]
    fn test_validate_confidence() {
        let mut config = EvalConfig {
            models: vec!["m".to_string()],
            ..EvalConfig::default()
        };
        config.evaluation.confidence = 1.5;
        assert!(matches!(config.validate(), Err(ConfigError::InvalidConfidence(_))));
    }

    #[test]
    fn test_expand_models_to_installed() {
        let installed = vec!["gemma3:4b".to_string(), "llama3:latest".to_string()];

        let mut config = EvalConfig::default();
        assert!(config.wants_all_models());
        config.expand_models(&installed).unwrap();
        assert_eq!(config.models, installed);
        assert!(config.validate().is_ok());

        let mut config = EvalConfig {
            models: vec!["Todos".to_string()],
            ..EvalConfig::default()
        };
        config.expand_models(&installed).unwrap();
        assert_eq!(config.models.len(), 2);

        let mut config = EvalConfig {
            models: vec!["gemma3:4b".to_string()],
            ..EvalConfig::default()
        };
        assert!(!config.wants_all_models());
        config.expand_models(&[]).unwrap();
        assert_eq!(config.models, vec!["gemma3:4b".to_string()]);
    }

    #[test]
    fn test_expand_models_needs_installed_list() {
        let mut config = EvalConfig {
            models: vec![ALL_MODELS.to_string()],
            ..EvalConfig::default()
        };
        assert!(matches!(
            config.expand_models(&[]),
            Err(ConfigError::NoInstalledModels)
        ));
    }

    #[test]
    fn test_select_prompts() {
        let config = EvalConfig::default();
        assert_eq!(config.select_prompts(&[]).unwrap().len(), 2);
        let selected = config.select_prompts(&[2]).unwrap();
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].id, 2);
        assert!(matches!(
            config.select_prompts(&[2, 9]),
            Err(ConfigError::UnknownPrompt(9))
        ));
    }

    #[test]
    fn test_stat_config_from_settings() {
        let mut config = EvalConfig::default();
        config.evaluation.bootstrap_n = 500;
        let stat = config.stat_config();
        assert_eq!(stat.bootstrap_n, 500);
        assert_eq!(stat.exact_threshold, 25);
    }

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::UnknownPrompt(4);
        assert!(err.to_string().contains('4'));
    }
}
