//! Gemini `generateContent` client.
//!
//! Blocking `ureq` agent with a fixed timeout. The API key travels in the
//! query string, so request URLs are never logged.

use serde_json::{json, Value};
use tracing::{debug, warn};

use super::prompts::{ranking_prompt, spec_prompt, PATCH_SYSTEM_PROMPT, STRICT_JSON_SUFFIX};
use super::{parse_suggestion, OracleConfig, OracleSuggestion, RankingOracle, SpecGenerator};
use crate::error::OracleError;
use crate::models::{AuditReport, PatchProposal};

pub struct GeminiClient {
    config: OracleConfig,
    agent: ureq::Agent,
}

impl GeminiClient {
    pub fn new(config: OracleConfig) -> Result<Self, OracleError> {
        if config.api_key.trim().is_empty() {
            return Err(OracleError::MissingCredentials);
        }
        let agent = ureq::AgentBuilder::new().timeout(config.timeout).build();
        Ok(Self { config, agent })
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/models/{}:generateContent?key={}",
            self.config.base_url.trim_end_matches('/'),
            self.config.model,
            self.config.api_key
        )
    }

    /// Send one prompt and return the first candidate's text.
    pub fn generate(&self, prompt: &str) -> Result<String, OracleError> {
        let payload = json!({
            "contents": [{"parts": [{"text": prompt}]}]
        });
        let body: Value = self
            .agent
            .post(&self.endpoint())
            .set("Content-Type", "application/json")
            .send_json(payload)
            .map_err(Box::new)?
            .into_json()?;
        candidate_text(&body)
    }
}

/// `candidates[0].content.parts[0].text` of a response body.
pub fn candidate_text(body: &Value) -> Result<String, OracleError> {
    body.pointer("/candidates/0/content/parts/0/text")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| OracleError::MalformedResponse("response has no candidate text".to_string()))
}

impl RankingOracle for GeminiClient {
    fn rank(
        &self,
        report: &AuditReport,
        candidates: &[PatchProposal],
    ) -> Result<OracleSuggestion, OracleError> {
        let strict = format!("{}{}", PATCH_SYSTEM_PROMPT, STRICT_JSON_SUFFIX);
        let mut last_err = OracleError::MalformedResponse("no attempt made".to_string());
        for (attempt, instructions) in [PATCH_SYSTEM_PROMPT, strict.as_str()].into_iter().enumerate() {
            let prompt = ranking_prompt(instructions, report, candidates)?;
            match self
                .generate(&prompt)
                .and_then(|text| parse_suggestion(&text, candidates.len()))
            {
                Ok(suggestion) => {
                    debug!(attempt, index = suggestion.selected_index, "oracle ranked candidates");
                    return Ok(suggestion);
                }
                Err(e) => {
                    warn!(attempt, error = %e, "oracle ranking attempt failed");
                    last_err = e;
                }
            }
        }
        Err(last_err)
    }
}

impl SpecGenerator for GeminiClient {
    fn generate_spec(&self, design_prompt: &str, seed: u64) -> Result<String, OracleError> {
        self.generate(&spec_prompt(design_prompt, seed))
    }
}
