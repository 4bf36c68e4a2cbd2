// Request Composer
// Builds the instruction/prompt/schema triple, makes the single outbound call
// and maps the structured answer onto an OptimizationResult.

use regex::Regex;
use serde::Deserialize;
use serde_json::Value;
use std::sync::OnceLock;
use thiserror::Error;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::models::{OptimizationResult, OptimizeRequest};

use super::config_store::HUMAN_SCORE_FALLBACK;
use super::providers::{GenerationRequest, TextGenerator};
use super::writing_policy::{
    build_system_instruction, build_task_prompt, response_schema, WritingPolicy,
};

pub const VALIDATION_MESSAGE: &str = "Berätta din idé eller klistra in din text först.";
pub const PROCESSING_MESSAGE: &str =
    "Bearbetningen misslyckades. Kontrollera nätverket eller försök igen.";

/// The two failures a student can see. Causes of a processing failure are logged only.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ComposeError {
    #[error("{}", VALIDATION_MESSAGE)]
    Validation,
    #[error("{}", PROCESSING_MESSAGE)]
    Processing { cause: String },
}

impl ComposeError {
    pub fn user_message(&self) -> &'static str {
        match self {
            ComposeError::Validation => VALIDATION_MESSAGE,
            ComposeError::Processing { .. } => PROCESSING_MESSAGE,
        }
    }
}

/// Lenient view of the service answer; absent fields fall back per field.
#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct RawGeneration {
    #[serde(default)]
    optimized_text: Option<String>,
    #[serde(default)]
    improvements: Option<Vec<String>>,
    #[serde(default)]
    defense_tips: Option<Vec<String>>,
    #[serde(default)]
    human_score: Option<Value>,
}

#[derive(Debug, Clone)]
pub struct RequestComposer {
    policy: WritingPolicy,
    human_score_fallback: u8,
}

impl RequestComposer {
    pub fn new(policy: WritingPolicy) -> Self {
        Self {
            policy,
            human_score_fallback: HUMAN_SCORE_FALLBACK,
        }
    }

    pub fn with_human_score_fallback(mut self, score: u8) -> Self {
        self.human_score_fallback = score.min(100);
        self
    }

    pub fn human_score_fallback(&self) -> u8 {
        self.human_score_fallback
    }

    pub fn policy(&self) -> &WritingPolicy {
        &self.policy
    }

    /// Instruction, prompt and schema for one request. No I/O.
    pub fn compose(&self, request: &OptimizeRequest) -> GenerationRequest {
        GenerationRequest {
            system_instruction: build_system_instruction(
                &self.policy,
                request.help_level,
                request.text_type,
                request.grade,
            ),
            prompt: build_task_prompt(&self.policy, &request.idea, request.text_type),
            response_schema: response_schema(),
        }
    }

    /// Validate, call the generator once, and parse the answer.
    pub async fn optimize(
        &self,
        generator: &dyn TextGenerator,
        request: &OptimizeRequest,
    ) -> Result<OptimizationResult, ComposeError> {
        if !request.has_idea() {
            warn!("optimize.rejected: empty idea");
            return Err(ComposeError::Validation);
        }

        let request_id = Uuid::new_v4();
        info!(
            request_id = %request_id,
            help_level = %request.help_level,
            text_type = %request.text_type,
            grade = %request.grade,
            idea_chars = request.idea.chars().count(),
            "optimize.start"
        );

        let output = generator.generate(&self.compose(request)).await.map_err(|e| {
            error!(request_id = %request_id, error = %e, "optimize.provider_failed");
            ComposeError::Processing { cause: e.to_string() }
        })?;

        let result = parse_generation(&output.content, request, self.human_score_fallback)
            .map_err(|cause| {
                error!(request_id = %request_id, error = %cause, "optimize.parse_failed");
                ComposeError::Processing { cause }
            })?;

        info!(
            request_id = %request_id,
            model = %output.model,
            latency_ms = output.latency_ms,
            human_score = result.human_score(),
            improvements = result.improvements().len(),
            defense_tips = result.defense_tips().len(),
            "optimize.done"
        );
        Ok(result)
    }
}

impl Default for RequestComposer {
    fn default() -> Self {
        Self::new(super::writing_policy::default_policy().clone())
    }
}

/// Map the structured answer onto a result, applying per-field fallbacks.
pub fn parse_generation(
    content: &str,
    request: &OptimizeRequest,
    human_score_fallback: u8,
) -> Result<OptimizationResult, String> {
    let value = extract_json(content)?;
    if !value.is_object() {
        return Err("Response is not a JSON object".to_string());
    }
    let raw: RawGeneration =
        serde_json::from_value(value).map_err(|e| format!("Schema mismatch: {}", e))?;

    let optimized_text = raw
        .optimized_text
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| request.idea.clone());
    let human_score = raw
        .human_score
        .as_ref()
        .and_then(score_from_value)
        .unwrap_or(human_score_fallback);

    Ok(OptimizationResult::new(
        request.idea.clone(),
        optimized_text,
        raw.improvements.unwrap_or_default(),
        raw.defense_tips.unwrap_or_default(),
        request.grade,
        human_score,
    ))
}

fn score_from_value(value: &Value) -> Option<u8> {
    let raw = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().trim_end_matches('%').trim().parse::<f64>().ok()?,
        _ => return None,
    };
    if !raw.is_finite() {
        return None;
    }
    Some(raw.round().clamp(0.0, 100.0) as u8)
}

fn code_fence_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)```(?:json)?\s*(.*?)\s*```").expect("valid fence regex"))
}

/// Extract JSON from response content. A body that already parses as an
/// object is taken as is; fences and surrounding chatter are stripped only otherwise.
fn extract_json(content: &str) -> Result<Value, String> {
    let content = content.trim();
    if content.is_empty() {
        return Err("Empty response".to_string());
    }

    if let Ok(value @ Value::Object(_)) = serde_json::from_str::<Value>(content) {
        return Ok(value);
    }

    let unfenced = code_fence_re()
        .captures(content)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim())
        .unwrap_or(content);

    let candidate = if unfenced.starts_with('{') || unfenced.starts_with('[') {
        unfenced
    } else if let Some(start) = unfenced.find('{') {
        match unfenced.rfind('}') {
            Some(end) if end > start => &unfenced[start..=end],
            _ => return Err("Invalid JSON response".to_string()),
        }
    } else {
        return Err("No JSON in response".to_string());
    };

    serde_json::from_str(candidate).map_err(|e| format!("JSON parse error: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{GradeLevel, HelpLevel, TextType};
    use crate::services::testing::ScriptedGenerator;

    fn request(idea: &str) -> OptimizeRequest {
        OptimizeRequest::new(idea, HelpLevel::Expand, TextType::Essay, GradeLevel::C)
    }

    #[tokio::test]
    async fn test_well_formed_response_is_copied() {
        let generator = ScriptedGenerator::ok(
            r#"{"optimizedText":"Skolan borde faktiskt börja senare.","improvements":["la till argument om sömnforskning"],"defenseTips":["Förklara att du läst om dygnsrytm."],"humanScore":87}"#,
        );
        let composer = RequestComposer::default();
        let req = request("  skolan borde börja senare ");

        let result = composer.optimize(&generator, &req).await.unwrap();

        assert_eq!(result.original_text(), "  skolan borde börja senare ");
        assert_eq!(result.optimized_text(), "Skolan borde faktiskt börja senare.");
        assert_eq!(result.improvements(), ["la till argument om sömnforskning"]);
        assert_eq!(result.defense_tips(), ["Förklara att du läst om dygnsrytm."]);
        assert_eq!(result.human_score(), 87);
        assert_eq!(result.estimated_grade_level(), GradeLevel::C);
        assert_eq!(generator.calls(), 1);
    }

    #[tokio::test]
    async fn test_empty_idea_makes_no_call() {
        let generator = ScriptedGenerator::ok("{}");
        let composer = RequestComposer::default();

        for idea in ["", "   ", "\n\t"] {
            let err = composer.optimize(&generator, &request(idea)).await.unwrap_err();
            assert_eq!(err, ComposeError::Validation);
            assert_eq!(err.to_string(), VALIDATION_MESSAGE);
        }
        assert_eq!(generator.calls(), 0);
    }

    #[tokio::test]
    async fn test_provider_failure_is_processing_error() {
        let generator = ScriptedGenerator::failing();
        let composer = RequestComposer::default();

        let err = composer.optimize(&generator, &request("idé")).await.unwrap_err();
        assert!(matches!(err, ComposeError::Processing { .. }));
        assert_eq!(err.user_message(), PROCESSING_MESSAGE);
        assert_eq!(generator.calls(), 1);
    }

    #[tokio::test]
    async fn test_malformed_response_is_processing_error() {
        for body in ["not json at all", "{\"optimizedText\": ", "[1,2,3]", "", "{\"improvements\": \"one\"}"] {
            let generator = ScriptedGenerator::ok(body);
            let err = RequestComposer::default()
                .optimize(&generator, &request("idé"))
                .await
                .unwrap_err();
            assert!(matches!(err, ComposeError::Processing { .. }), "body: {body}");
        }
    }

    #[tokio::test]
    async fn test_compose_sends_policy_and_schema() {
        let generator = ScriptedGenerator::ok(r#"{"optimizedText":"x"}"#);
        let composer = RequestComposer::default();
        let req = OptimizeRequest::new("mobiler i skolan", HelpLevel::Full, TextType::OpinionPiece, GradeLevel::A);

        composer.optimize(&generator, &req).await.unwrap();

        let sent = generator.last_request().unwrap();
        assert!(sent.system_instruction.contains("VALD HJÄLP-NIVÅ: Skriv hela texten åt mig"));
        assert!(sent.system_instruction.contains("MÅLBETYG: A"));
        assert!(sent.prompt.contains("\"mobiler i skolan\""));
        assert!(sent.prompt.contains("Debattartikel"));
        assert_eq!(sent.response_schema, response_schema());
    }

    #[test]
    fn test_missing_fields_fall_back() {
        let req = request("min idé");
        let result = parse_generation("{}", &req, 99).unwrap();
        assert_eq!(result.optimized_text(), "min idé");
        assert!(result.improvements().is_empty());
        assert!(result.defense_tips().is_empty());
        assert_eq!(result.human_score(), 99);

        let result = parse_generation(
            r#"{"optimizedText":"","improvements":null,"defenseTips":null,"humanScore":null}"#,
            &req,
            99,
        )
        .unwrap();
        assert_eq!(result.optimized_text(), "min idé");
        assert!(result.improvements().is_empty());
        assert_eq!(result.human_score(), 99);
    }

    #[test]
    fn test_human_score_variants() {
        let req = request("idé");
        let score = |body: &str| parse_generation(body, &req, 99).unwrap().human_score();

        assert_eq!(score(r#"{"humanScore":"mycket"}"#), 99);
        assert_eq!(score(r#"{"humanScore":[80]}"#), 99);
        assert_eq!(score(r#"{"humanScore":"91"}"#), 91);
        assert_eq!(score(r#"{"humanScore":"91%"}"#), 91);
        assert_eq!(score(r#"{"humanScore":86.6}"#), 87);
        assert_eq!(score(r#"{"humanScore":140}"#), 100);
        assert_eq!(score(r#"{"humanScore":-3}"#), 0);
        assert_eq!(score(r#"{"humanScore":0}"#), 0);
    }

    #[test]
    fn test_configured_fallback_score() {
        let result = parse_generation("{}", &request("idé"), 50).unwrap();
        assert_eq!(result.human_score(), 50);
    }

    #[test]
    fn test_extract_json_tolerates_fences_and_chatter() {
        let req = request("idé");
        let fenced = "```json\n{\"optimizedText\":\"Hej\",\"humanScore\":70}\n```";
        assert_eq!(parse_generation(fenced, &req, 99).unwrap().optimized_text(), "Hej");

        let chatter = "Här kommer svaret: {\"optimizedText\":\"Hej då\"} Lycka till!";
        assert_eq!(parse_generation(chatter, &req, 99).unwrap().optimized_text(), "Hej då");
    }

    #[test]
    fn test_backticks_inside_text_are_kept() {
        let req = request("kod");
        let body = r#"{"optimizedText":"Skriv ```rust\nfn main() {}\n``` i terminalen","improvements":["la till ett kodexempel"],"defenseTips":[],"humanScore":80}"#;

        let result = parse_generation(body, &req, 99).unwrap();

        assert_eq!(
            result.optimized_text(),
            "Skriv ```rust\nfn main() {}\n``` i terminalen"
        );
        assert_eq!(result.improvements(), ["la till ett kodexempel"]);
        assert_eq!(result.human_score(), 80);
    }
}
