//! Prompt text sent to the external oracle.

use once_cell::sync::Lazy;

use crate::error::OracleError;
use crate::models::{AuditReport, GameSpec, PatchProposal};

pub const PATCH_SYSTEM_PROMPT: &str = r#"You are PatchSynth. Select one minimal patch candidate and explain why in one short sentence.
You must return JSON:
{
  "selected_index": int,
  "rationale": "string",
  "expected_effect": {"deadlock_rate":"down|same", "win_skew":"down|same", "exploit_dominance":"down|same"}
}"#;

/// Appended on the retry after a response that could not be parsed.
pub const STRICT_JSON_SUFFIX: &str = "\nReturn strict JSON only. Do not include markdown.";

const SPEC_CONSTRAINTS: &str = r#"You output only valid JSON object for GameSpec v0.1.
No markdown, no explanation text.
Constraints:
- Ensure map has at least one path between each spawn and enemy flag.
- Keep coordinates inside map. x is the column, y is the row.
- Map size 8..20 per side, max_turns 30..120, deadlock_repeat 4..10.
- Include all mandatory fields from this JSON schema:"#;

/// Generator instructions with the GameSpec JSON schema embedded.
pub static SPEC_SYSTEM_PROMPT: Lazy<String> = Lazy::new(|| {
    let schema = schemars::schema_for!(GameSpec);
    let schema_json = serde_json::to_string_pretty(&schema).unwrap_or_default();
    format!("{}\n{}", SPEC_CONSTRAINTS, schema_json)
});

fn to_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<String, OracleError> {
    serde_json::to_string(value).map_err(|e| OracleError::MalformedResponse(e.to_string()))
}

/// Full ranking request: instructions, then the report and candidate list as JSON.
pub fn ranking_prompt(
    instructions: &str,
    report: &AuditReport,
    candidates: &[PatchProposal],
) -> Result<String, OracleError> {
    Ok(format!(
        "{}\n\nAuditReport:\n{}\n\nCandidates:\n{}",
        instructions,
        to_json(report)?,
        to_json(candidates)?
    ))
}

pub fn spec_prompt(design_prompt: &str, seed: u64) -> String {
    format!(
        "{}\n\nDesign prompt: {}\nUse seed={}.",
        SPEC_SYSTEM_PROMPT.as_str(),
        design_prompt,
        seed
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::build_audit_report;

    #[test]
    fn test_spec_prompt_embeds_schema() {
        let prompt = spec_prompt("symmetric arena", 7);
        assert!(prompt.contains("\"deadlock_repeat\""));
        assert!(prompt.contains("\"spawns\""));
        assert!(prompt.ends_with("Design prompt: symmetric arena\nUse seed=7."));
    }

    #[test]
    fn test_ranking_prompt_sections() {
        let report = build_audit_report(&[]);
        let candidates = vec![PatchProposal::no_op("keep")];
        let prompt = ranking_prompt(PATCH_SYSTEM_PROMPT, &report, &candidates).unwrap();
        assert!(prompt.starts_with("You are PatchSynth."));
        assert!(prompt.contains("AuditReport:\n{\"metrics\""));
        assert!(prompt.contains("Candidates:\n[{\"patch_ops\":[]"));
    }
}
