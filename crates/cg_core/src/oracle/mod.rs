//! Optional external oracle.
//!
//! Two narrow roles, each behind its own trait:
//! - [`RankingOracle`] picks the most promising patch candidate.
//! - [`SpecGenerator`] drafts a GameSpec from a free-text design prompt.
//!
//! Both are advisory. Every failure (transport, timeout, malformed reply,
//! out-of-range index) surfaces as an [`OracleError`] which callers log and
//! then ignore.

pub mod gemini;
pub mod prompts;

use serde_json::Value;
use std::collections::BTreeMap;
use std::time::Duration;

use crate::error::OracleError;
use crate::models::{AuditReport, Effect, PatchProposal, GATED_METRICS};

pub use gemini::GeminiClient;

pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

const DEFAULT_RATIONALE: &str = "Selected by oracle.";

/// Connection settings. Built by the caller; the library never reads the
/// environment itself.
#[derive(Clone)]
pub struct OracleConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    pub timeout: Duration,
}

impl OracleConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }
}

impl std::fmt::Debug for OracleConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OracleConfig")
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// A validated ranking reply.
#[derive(Debug, Clone, PartialEq)]
pub struct OracleSuggestion {
    pub selected_index: usize,
    pub rationale: String,
    /// One entry per gated metric.
    pub expected_effect: BTreeMap<String, Effect>,
}

pub trait RankingOracle: Send + Sync {
    fn rank(
        &self,
        report: &AuditReport,
        candidates: &[PatchProposal],
    ) -> Result<OracleSuggestion, OracleError>;
}

pub trait SpecGenerator: Send + Sync {
    /// Raw reply text; the caller extracts, parses and validates the spec.
    fn generate_spec(&self, design_prompt: &str, seed: u64) -> Result<String, OracleError>;
}

/// Slice from the first `{` to the last `}`, if both exist in that order.
pub fn extract_json_object(text: &str) -> Option<&str> {
    let begin = text.find('{')?;
    let end = text.rfind('}')?;
    (begin < end).then(|| &text[begin..=end])
}

/// Parse a ranking reply against a list of `candidate_count` candidates.
pub fn parse_suggestion(text: &str, candidate_count: usize) -> Result<OracleSuggestion, OracleError> {
    let snippet = extract_json_object(text)
        .ok_or_else(|| OracleError::MalformedResponse("no JSON object in reply".to_string()))?;
    let parsed: Value = serde_json::from_str(snippet)
        .map_err(|e| OracleError::MalformedResponse(e.to_string()))?;

    let selected_index = match &parsed["selected_index"] {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    }
    .ok_or_else(|| OracleError::MalformedResponse("selected_index missing or invalid".to_string()))?
        as usize;
    if selected_index >= candidate_count {
        return Err(OracleError::MalformedResponse(format!(
            "selected_index {} out of range 0..{}",
            selected_index, candidate_count
        )));
    }

    let rationale = match &parsed["rationale"] {
        Value::String(s) if !s.trim().is_empty() => s.trim().to_string(),
        _ => DEFAULT_RATIONALE.to_string(),
    };
    let expected_effect = GATED_METRICS
        .iter()
        .map(|&name| {
            let effect = parsed["expected_effect"][name]
                .as_str()
                .map(Effect::coerce)
                .unwrap_or(Effect::Same);
            (name.to_string(), effect)
        })
        .collect();

    Ok(OracleSuggestion {
        selected_index,
        rationale,
        expected_effect,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_json_object() {
        assert_eq!(extract_json_object("```json\n{\"a\": 1}\n```"), Some("{\"a\": 1}"));
        assert_eq!(extract_json_object("no json here"), None);
        assert_eq!(extract_json_object("} backwards {"), None);
    }

    #[test]
    fn test_parse_suggestion_happy_path() {
        let text = r#"Sure! {"selected_index": 1, "rationale": "Opens the choke.",
            "expected_effect": {"deadlock_rate": "down", "win_skew": "up", "exploit_dominance": "same"}}"#;
        let s = parse_suggestion(text, 3).unwrap();
        assert_eq!(s.selected_index, 1);
        assert_eq!(s.rationale, "Opens the choke.");
        assert_eq!(s.expected_effect["deadlock_rate"], Effect::Down);
        // Anything outside down/same is coerced.
        assert_eq!(s.expected_effect["win_skew"], Effect::Same);
        assert_eq!(s.expected_effect.len(), 3);
    }

    #[test]
    fn test_parse_suggestion_defaults() {
        let s = parse_suggestion(r#"{"selected_index": "0"}"#, 2).unwrap();
        assert_eq!(s.selected_index, 0);
        assert_eq!(s.rationale, DEFAULT_RATIONALE);
        assert!(s.expected_effect.values().all(|&e| e == Effect::Same));
    }

    #[test]
    fn test_parse_suggestion_rejects_bad_replies() {
        assert!(parse_suggestion(r#"{"selected_index": 2}"#, 2).is_err());
        assert!(parse_suggestion(r#"{"selected_index": -1}"#, 2).is_err());
        assert!(parse_suggestion(r#"{"rationale": "x"}"#, 2).is_err());
        assert!(parse_suggestion("{not json}", 2).is_err());
        assert!(parse_suggestion("", 2).is_err());
    }

    #[test]
    fn test_config_debug_hides_key() {
        let config = OracleConfig::new("secret-key").with_model("m");
        let shown = format!("{:?}", config);
        assert!(!shown.contains("secret-key"));
        assert!(shown.contains("\"m\""));
    }
}
