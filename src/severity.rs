//! Manchester Triage System severity scale.
//!
//! Five urgency levels with a strict total order (Azul lowest, Vermelho
//! highest). Labels are accepted case-insensitively in Portuguese or English.
//! Anything else is an [`UnknownSeverity`] rather than a silent coercion.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Answer substituted for a trial whose model output could not be parsed
pub const FAILED_ANSWER: &str = "Failed JSON";

/// Explanation substituted for a trial whose model output could not be parsed
pub const FAILED_EXPLANATION: &str = "Failed json";

/// A label that is not one of the ten recognized severity strings
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unrecognized severity label: {0:?}")]
pub struct UnknownSeverity(pub String);

/// MTS urgency category, ordered from least to most urgent
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SeverityLevel {
    /// Non-urgent (blue)
    Azul = 1,
    /// Standard (green)
    Verde = 2,
    /// Urgent (yellow)
    Amarelo = 3,
    /// Very urgent (orange)
    Laranja = 4,
    /// Immediate (red)
    Vermelho = 5,
}

impl SeverityLevel {
    /// All levels in ascending urgency
    pub const ALL: [Self; 5] = [
        Self::Azul,
        Self::Verde,
        Self::Amarelo,
        Self::Laranja,
        Self::Vermelho,
    ];

    /// Ordinal on the 1..=5 scale
    #[must_use]
    pub const fn ordinal(self) -> u8 {
        self as u8
    }

    /// Canonical (Portuguese) label
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Azul => "Azul",
            Self::Verde => "Verde",
            Self::Amarelo => "Amarelo",
            Self::Laranja => "Laranja",
            Self::Vermelho => "Vermelho",
        }
    }

    /// English color name
    #[must_use]
    pub const fn english(self) -> &'static str {
        match self {
            Self::Azul => "Blue",
            Self::Verde => "Green",
            Self::Amarelo => "Yellow",
            Self::Laranja => "Orange",
            Self::Vermelho => "Red",
        }
    }
}

impl fmt::Display for SeverityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for SeverityLevel {
    type Err = UnknownSeverity;

    /// Parse a severity label
    ///
    /// # Errors
    ///
    /// Returns `UnknownSeverity` carrying the offending string if it is not
    /// one of the five colors in Portuguese or English.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "azul" | "blue" => Ok(Self::Azul),
            "verde" | "green" => Ok(Self::Verde),
            "amarelo" | "yellow" => Ok(Self::Amarelo),
            "laranja" | "orange" => Ok(Self::Laranja),
            "vermelho" | "red" => Ok(Self::Vermelho),
            _ => Err(UnknownSeverity(s.to_string())),
        }
    }
}

/// A trial answer interpreted against the severity scale
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Prediction {
    /// A recognized severity level
    Level(SeverityLevel),
    /// The model output could not be parsed (sentinel answer)
    Failed,
    /// Parsed output whose answer is not a severity label
    Unrecognized(String),
}

impl Prediction {
    /// Interpret a raw trial answer
    #[must_use]
    pub fn from_answer(answer: &str) -> Self {
        if answer == FAILED_ANSWER {
            return Self::Failed;
        }
        answer
            .parse::<SeverityLevel>()
            .map_or_else(|_| Self::Unrecognized(answer.trim().to_string()), Self::Level)
    }

    /// The severity level, if the answer was recognized
    #[must_use]
    pub const fn level(&self) -> Option<SeverityLevel> {
        match self {
            Self::Level(level) => Some(*level),
            Self::Failed | Self::Unrecognized(_) => None,
        }
    }

    /// Whether this prediction can be placed on the severity scale
    #[must_use]
    pub const fn is_gradable(&self) -> bool {
        matches!(self, Self::Level(_))
    }
}

impl fmt::Display for Prediction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Level(level) => f.write_str(level.label()),
            Self::Failed => f.write_str(FAILED_ANSWER),
            Self::Unrecognized(raw) => f.write_str(raw),
        }
    }
}

/// Direction of a single prediction against the true severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfusionOutcome {
    /// Predicted level equals the true level
    Correct,
    /// Predicted a less urgent level than warranted
    UnderTriage,
    /// Predicted a more urgent level than warranted
    OverTriage,
    /// Sentinel or unmapped answer; direction unknown
    Unparseable,
}

impl ConfusionOutcome {
    /// Classify a prediction against the true severity
    #[must_use]
    pub fn classify(predicted: &Prediction, truth: SeverityLevel) -> Self {
        match predicted.level() {
            None => Self::Unparseable,
            Some(level) => match level.cmp(&truth) {
                Ordering::Equal => Self::Correct,
                Ordering::Less => Self::UnderTriage,
                Ordering::Greater => Self::OverTriage,
            },
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_ordinals_ascend() {
        let ordinals: Vec<u8> = SeverityLevel::ALL.iter().map(|l| l.ordinal()).collect();
        assert_eq!(ordinals, vec![1, 2, 3, 4, 5]);
        assert!(SeverityLevel::Azul < SeverityLevel::Vermelho);
        assert!(SeverityLevel::Laranja > SeverityLevel::Amarelo);
    }

    #[test]
    fn test_parse_portuguese_and_english() {
        assert_eq!("Vermelho".parse::<SeverityLevel>().unwrap(), SeverityLevel::Vermelho);
        assert_eq!("RED".parse::<SeverityLevel>().unwrap(), SeverityLevel::Vermelho);
        assert_eq!("amarelo".parse::<SeverityLevel>().unwrap(), SeverityLevel::Amarelo);
        assert_eq!("Yellow".parse::<SeverityLevel>().unwrap(), SeverityLevel::Amarelo);
        assert_eq!(" verde ".parse::<SeverityLevel>().unwrap(), SeverityLevel::Verde);
        for level in SeverityLevel::ALL {
            assert_eq!(level.english().parse::<SeverityLevel>().unwrap(), level);
            assert_eq!(level.label().parse::<SeverityLevel>().unwrap(), level);
        }
    }

    #[test]
    fn test_parse_unknown_carries_label() {
        let err = "Roxo".parse::<SeverityLevel>().unwrap_err();
        assert_eq!(err, UnknownSeverity("Roxo".to_string()));
        assert!(err.to_string().contains("Roxo"));
        assert!(FAILED_ANSWER.parse::<SeverityLevel>().is_err());
    }

    #[test]
    fn test_prediction_from_answer() {
        assert_eq!(
            Prediction::from_answer("laranja"),
            Prediction::Level(SeverityLevel::Laranja)
        );
        assert_eq!(Prediction::from_answer(FAILED_ANSWER), Prediction::Failed);
        assert_eq!(
            Prediction::from_answer("Vermelho ou Laranja"),
            Prediction::Unrecognized("Vermelho ou Laranja".to_string())
        );
        assert!(!Prediction::Failed.is_gradable());
        assert_eq!(Prediction::Failed.to_string(), FAILED_ANSWER);
    }

    #[test]
    fn test_confusion_outcome_direction() {
        let red = Prediction::Level(SeverityLevel::Vermelho);
        let green = Prediction::Level(SeverityLevel::Verde);
        assert_eq!(
            ConfusionOutcome::classify(&red, SeverityLevel::Amarelo),
            ConfusionOutcome::OverTriage
        );
        assert_eq!(
            ConfusionOutcome::classify(&green, SeverityLevel::Amarelo),
            ConfusionOutcome::UnderTriage
        );
        assert_eq!(
            ConfusionOutcome::classify(&red, SeverityLevel::Vermelho),
            ConfusionOutcome::Correct
        );
        assert_eq!(
            ConfusionOutcome::classify(&Prediction::Failed, SeverityLevel::Azul),
            ConfusionOutcome::Unparseable
        );
    }
}
