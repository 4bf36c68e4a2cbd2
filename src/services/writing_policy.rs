// Writing Policy
// Instruction template kept as data: one clause per help level and per grade,
// plus the humanizer directives shared by every request.

use crate::models::{GradeLevel, HelpLevel, TextType};
use serde::Deserialize;
use serde_json::{json, Value};
use std::fs;
use std::path::Path;
use std::sync::OnceLock;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WritingPolicy {
    pub intro: Vec<String>,
    pub help_levels: HelpLevelClauses,
    pub grades: GradeClauses,
    pub humanizer: Vec<String>,
    pub defense_tips: String,
    pub closing: String,
    pub task_prompt: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HelpLevelClauses {
    pub full: String,
    pub expand: String,
    pub humanize_only: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GradeClauses {
    pub e: String,
    pub c: String,
    pub a: String,
}

static DEFAULT_POLICY: OnceLock<WritingPolicy> = OnceLock::new();

/// Built-in policy shipped with the binary.
pub fn default_policy() -> &'static WritingPolicy {
    DEFAULT_POLICY.get_or_init(|| {
        let raw = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/data/writing_policy.json"));
        serde_json::from_str(raw).expect("writing_policy.json parse failed")
    })
}

/// Load a replacement policy from disk.
pub fn load_policy(path: &Path) -> Result<WritingPolicy, String> {
    let content = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read policy {}: {}", path.display(), e))?;
    serde_json::from_str(&content)
        .map_err(|e| format!("Failed to parse policy {}: {}", path.display(), e))
}

impl WritingPolicy {
    pub fn help_clause(&self, level: HelpLevel) -> &str {
        match level {
            HelpLevel::Full => &self.help_levels.full,
            HelpLevel::Expand => &self.help_levels.expand,
            HelpLevel::HumanizeOnly => &self.help_levels.humanize_only,
        }
    }

    pub fn grade_clause(&self, grade: GradeLevel) -> &str {
        match grade {
            GradeLevel::E => &self.grades.e,
            GradeLevel::C => &self.grades.c,
            GradeLevel::A => &self.grades.a,
        }
    }
}

/// System instruction sent alongside every request.
pub fn build_system_instruction(
    policy: &WritingPolicy,
    help_level: HelpLevel,
    text_type: TextType,
    grade: GradeLevel,
) -> String {
    let mut out = String::new();
    for line in &policy.intro {
        out.push_str(line);
        out.push('\n');
    }
    out.push('\n');
    out.push_str(&format!("VALD HJÄLP-NIVÅ: {}\n", help_level.label()));
    out.push_str(&format!("TEXTTYP: {}\n", text_type.label()));
    out.push_str(&format!("MÅLBETYG: {}\n\n", grade.label()));

    out.push_str("INSTRUKTIONER FÖR DIN ROLL:\n");
    out.push_str(&format!(
        "1. UTVECKLING ({}): {}\n",
        help_level.label(),
        policy.help_clause(help_level)
    ));
    out.push_str(&format!(
        "2. BETYGSANPASSNING (nivå {}): {}\n",
        grade.label(),
        policy.grade_clause(grade)
    ));
    out.push_str("3. HUMANIZER (OERHÖRT VIKTIGT):\n");
    for directive in &policy.humanizer {
        out.push_str("   - ");
        out.push_str(directive);
        out.push('\n');
    }
    out.push_str(&format!("4. FÖRSVARSTIPS: {}\n\n", policy.defense_tips));
    out.push_str(&policy.closing);
    out
}

/// Short task prompt naming the student's literal idea.
pub fn build_task_prompt(policy: &WritingPolicy, idea: &str, text_type: TextType) -> String {
    // textType first so an idea containing "{textType}" is left alone
    policy
        .task_prompt
        .replace("{textType}", text_type.label())
        .replace("{idea}", idea)
}

/// Structured output contract the service must fill.
pub fn response_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "optimizedText": { "type": "STRING" },
            "improvements": {
                "type": "ARRAY",
                "items": { "type": "STRING" }
            },
            "defenseTips": {
                "type": "ARRAY",
                "items": { "type": "STRING" },
                "description": "Tips på hur man försvarar textens kvalitet för läraren."
            },
            "humanScore": {
                "type": "INTEGER",
                "description": "Estimated percentage of human-like flow (0-100)"
            }
        },
        "required": ["optimizedText", "improvements", "defenseTips", "humanScore"]
    })
}
