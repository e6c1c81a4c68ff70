//! Parsing of raw model output into trials.
//!
//! Models are asked for a bare JSON object `{"resposta": ..., "explicacao": ...}`
//! but frequently wrap it in markdown fences or surround it with prose.
//! Parsing never fails: anything that cannot be read becomes the sentinel trial.

use crate::records::Trial;
use regex::Regex;
use serde_json::{Map, Value};
use std::sync::LazyLock;

#[allow(clippy::expect_used)]
static CODE_FENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)```(?:json)?\s*(.*?)\s*```").expect("valid code fence regex")
});

const ANSWER_KEYS: [&str; 2] = ["resposta", "answer"];
const EXPLANATION_KEYS: [&str; 2] = ["explicacao", "explanation"];

/// Remove surrounding whitespace and the first markdown code fence, if any
#[must_use]
pub fn strip_code_fence(response: &str) -> &str {
    let text = response.trim();
    CODE_FENCE
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map_or(text, |m| m.as_str().trim())
}

/// Parse raw model output into a trial, substituting the sentinel on failure
#[must_use]
pub fn parse_response(raw: &str) -> Trial {
    let text = strip_code_fence(raw);

    let object = parse_object(text).or_else(|| embedded_object(text).and_then(parse_object));

    match object {
        Some(map) => Trial::new(field(&map, &ANSWER_KEYS), field(&map, &EXPLANATION_KEYS)),
        None => {
            tracing::debug!(response = %raw, "model output is not a JSON object");
            Trial::failed()
        }
    }
}

fn parse_object(text: &str) -> Option<Map<String, Value>> {
    match serde_json::from_str::<Value>(text).ok()? {
        Value::Object(map) => Some(map),
        _ => None,
    }
}

/// Outermost `{...}` span, for objects surrounded by prose
fn embedded_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

fn field(map: &Map<String, Value>, keys: &[&str]) -> String {
    keys.iter()
        .find_map(|key| map.get(*key))
        .map(|value| match value {
            Value::String(s) => s.clone(),
            Value::Null => String::new(),
            other => other.to_string(),
        })
        .unwrap_or_default()
}
