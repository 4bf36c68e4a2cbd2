// Result Presenter
// Formats an already-final OptimizationResult for review. No scoring or
// text transformation happens here.

use thiserror::Error;

use crate::models::OptimizationResult;

/// View-state for the defense tips list. Not part of the result.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TipsDisclosure {
    expanded: bool,
}

impl TipsDisclosure {
    pub fn collapsed() -> Self {
        Self { expanded: false }
    }

    pub fn expanded() -> Self {
        Self { expanded: true }
    }

    pub fn is_expanded(&self) -> bool {
        self.expanded
    }

    pub fn toggle(&mut self) {
        self.expanded = !self.expanded;
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ResultView<'a> {
    result: &'a OptimizationResult,
}

impl<'a> ResultView<'a> {
    pub fn new(result: &'a OptimizationResult) -> Self {
        Self { result }
    }

    pub fn original_text(&self) -> &'a str {
        self.result.original_text()
    }

    pub fn optimized_text(&self) -> &'a str {
        self.result.optimized_text()
    }

    pub fn grade_badge(&self) -> String {
        self.result.estimated_grade_level().label().to_string()
    }

    pub fn human_score_badge(&self) -> String {
        format!("{}%", self.result.human_score())
    }

    pub fn improvement_log(&self) -> &'a [String] {
        self.result.improvements()
    }

    /// Tips to show under the current disclosure state.
    pub fn visible_tips(&self, disclosure: TipsDisclosure) -> &'a [String] {
        if disclosure.is_expanded() {
            self.result.defense_tips()
        } else {
            &[]
        }
    }

    pub fn tip_count(&self) -> usize {
        self.result.defense_tips().len()
    }
}

/// Render the result panel for a terminal.
pub fn render_text(view: &ResultView<'_>, disclosure: TipsDisclosure) -> String {
    let mut out = String::new();

    out.push_str("== INMATAD IDÉ ==\n");
    out.push_str(view.original_text());
    out.push_str("\n\n");

    out.push_str(&format!(
        "== FÄRDIG TEXT ==  [Mål: {}]  [Human: {}]\n",
        view.grade_badge(),
        view.human_score_badge()
    ));
    out.push_str(view.optimized_text());
    out.push_str("\n\n");

    let marker = if disclosure.is_expanded() { "▼" } else { "▶" };
    out.push_str(&format!(
        "{} HUR DU FÖRSVARAR TEXTEN ({} tips)\n",
        marker,
        view.tip_count()
    ));
    for tip in view.visible_tips(disclosure) {
        out.push_str(&format!("  • {}\n", tip));
    }
    out.push('\n');

    out.push_str("== FÖRBÄTTRINGAR ==\n");
    if view.improvement_log().is_empty() {
        out.push_str("  (inga)\n");
    }
    for item in view.improvement_log() {
        out.push_str(&format!("  • {}\n", item));
    }

    out
}

#[derive(Error, Debug)]
pub enum ClipboardError {
    #[error("Clipboard unavailable: {0}")]
    Unavailable(String),
}

/// Platform clipboard capability.
pub trait Clipboard {
    fn set_text(&mut self, text: &str) -> Result<(), ClipboardError>;
}

/// System clipboard backed by `cli-clipboard`.
#[derive(Debug, Default)]
pub struct SystemClipboard;

impl Clipboard for SystemClipboard {
    fn set_text(&mut self, text: &str) -> Result<(), ClipboardError> {
        cli_clipboard::set_contents(text.to_string())
            .map_err(|e| ClipboardError::Unavailable(e.to_string()))
    }
}

pub fn copy_optimized_text(
    result: &OptimizationResult,
    clipboard: &mut dyn Clipboard,
) -> Result<(), ClipboardError> {
    clipboard.set_text(result.optimized_text())
}
