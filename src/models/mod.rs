// Skrivpartner Data Models
// Form selections and the optimization result shown to the student

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;

// ============ Form Selections ============

/// How much of the writing work the service does versus keeping the student's voice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, ValueEnum)]
pub enum HelpLevel {
    #[serde(rename = "Skriv hela texten åt mig")]
    #[value(name = "full")]
    Full,
    #[default]
    #[serde(rename = "Bygg ut min idé med mer fakta")]
    #[value(name = "expand")]
    Expand,
    #[serde(rename = "Gör bara min text mänsklig")]
    #[value(name = "humanize")]
    HumanizeOnly,
}

impl HelpLevel {
    pub const ALL: [HelpLevel; 3] = [HelpLevel::Full, HelpLevel::Expand, HelpLevel::HumanizeOnly];

    pub fn label(self) -> &'static str {
        match self {
            HelpLevel::Full => "Skriv hela texten åt mig",
            HelpLevel::Expand => "Bygg ut min idé med mer fakta",
            HelpLevel::HumanizeOnly => "Gör bara min text mänsklig",
        }
    }
}

/// Target genre of the produced text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, ValueEnum)]
pub enum TextType {
    #[default]
    #[serde(rename = "Uppsats")]
    #[value(name = "essay")]
    Essay,
    #[serde(rename = "Debattartikel")]
    #[value(name = "opinion")]
    OpinionPiece,
    #[serde(rename = "Krönika")]
    #[value(name = "column")]
    Column,
    #[serde(rename = "Analys")]
    #[value(name = "analysis")]
    Analysis,
    #[serde(rename = "Berättelse")]
    #[value(name = "narrative")]
    Narrative,
}

impl TextType {
    pub const ALL: [TextType; 5] = [
        TextType::Essay,
        TextType::OpinionPiece,
        TextType::Column,
        TextType::Analysis,
        TextType::Narrative,
    ];

    pub fn label(self) -> &'static str {
        match self {
            TextType::Essay => "Uppsats",
            TextType::OpinionPiece => "Debattartikel",
            TextType::Column => "Krönika",
            TextType::Analysis => "Analys",
            TextType::Narrative => "Berättelse",
        }
    }
}

/// Target grade tier (Swedish scale, E lowest).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, ValueEnum)]
pub enum GradeLevel {
    #[value(name = "e")]
    E,
    #[default]
    #[value(name = "c")]
    C,
    #[value(name = "a")]
    A,
}

impl GradeLevel {
    pub const ALL: [GradeLevel; 3] = [GradeLevel::E, GradeLevel::C, GradeLevel::A];

    pub fn label(self) -> &'static str {
        match self {
            GradeLevel::E => "E",
            GradeLevel::C => "C",
            GradeLevel::A => "A",
        }
    }
}

impl fmt::Display for HelpLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl fmt::Display for TextType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl fmt::Display for GradeLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ============ Request ============

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptimizeRequest {
    pub idea: String,
    #[serde(default)]
    pub help_level: HelpLevel,
    #[serde(default)]
    pub text_type: TextType,
    #[serde(default)]
    pub grade: GradeLevel,
}

impl OptimizeRequest {
    pub fn new(idea: impl Into<String>, help_level: HelpLevel, text_type: TextType, grade: GradeLevel) -> Self {
        Self {
            idea: idea.into(),
            help_level,
            text_type,
            grade,
        }
    }

    /// True when the idea has content after trimming.
    pub fn has_idea(&self) -> bool {
        !self.idea.trim().is_empty()
    }
}

// ============ Result ============

/// Outcome of one successful round trip. Replaced wholesale on the next success.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptimizationResult {
    original_text: String,
    optimized_text: String,
    improvements: Vec<String>,
    defense_tips: Vec<String>,
    estimated_grade_level: GradeLevel,
    human_score: u8,
}

impl OptimizationResult {
    pub fn new(
        original_text: String,
        optimized_text: String,
        improvements: Vec<String>,
        defense_tips: Vec<String>,
        estimated_grade_level: GradeLevel,
        human_score: u8,
    ) -> Self {
        Self {
            original_text,
            optimized_text,
            improvements,
            defense_tips,
            estimated_grade_level,
            human_score: human_score.min(100),
        }
    }

    pub fn original_text(&self) -> &str {
        &self.original_text
    }

    pub fn optimized_text(&self) -> &str {
        &self.optimized_text
    }

    pub fn improvements(&self) -> &[String] {
        &self.improvements
    }

    pub fn defense_tips(&self) -> &[String] {
        &self.defense_tips
    }

    pub fn estimated_grade_level(&self) -> GradeLevel {
        self.estimated_grade_level
    }

    /// Estimated naturalness, 0-100.
    pub fn human_score(&self) -> u8 {
        self.human_score
    }
}
