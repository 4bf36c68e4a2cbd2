// Submit Session
// Form state plus the linear idle -> processing -> success | error flow.

use tracing::info;

use crate::models::{GradeLevel, HelpLevel, OptimizationResult, OptimizeRequest, TextType};

use super::composer::{ComposeError, RequestComposer};
use super::presenter::TipsDisclosure;
use super::providers::TextGenerator;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Idle,
    Processing,
    Success,
    Error,
}

/// What a single `submit` did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    Completed,
    Rejected(ComposeError),
    Failed(ComposeError),
}

/// Marks a request in flight; dropping it clears the flag, so a cancelled
/// submit leaves the form submittable.
struct InFlight<'a> {
    flag: &'a mut bool,
    phase: &'a mut SessionPhase,
    resume_phase: SessionPhase,
}

impl<'a> InFlight<'a> {
    fn start(flag: &'a mut bool, phase: &'a mut SessionPhase, resume_phase: SessionPhase) -> Self {
        *flag = true;
        *phase = SessionPhase::Processing;
        Self {
            flag,
            phase,
            resume_phase,
        }
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        *self.flag = false;
        if *self.phase == SessionPhase::Processing {
            *self.phase = self.resume_phase;
        }
    }
}

pub struct Session {
    composer: RequestComposer,
    form: OptimizeRequest,
    phase: SessionPhase,
    in_flight: bool,
    result: Option<OptimizationResult>,
    error: Option<&'static str>,
    tips: TipsDisclosure,
}

impl Session {
    pub fn new(composer: RequestComposer) -> Self {
        Self {
            composer,
            form: OptimizeRequest::default(),
            phase: SessionPhase::Idle,
            in_flight: false,
            result: None,
            error: None,
            tips: TipsDisclosure::collapsed(),
        }
    }

    pub fn set_idea(&mut self, idea: impl Into<String>) {
        self.form.idea = idea.into();
    }

    pub fn set_help_level(&mut self, level: HelpLevel) {
        self.form.help_level = level;
    }

    pub fn set_text_type(&mut self, text_type: TextType) {
        self.form.text_type = text_type;
    }

    pub fn set_grade(&mut self, grade: GradeLevel) {
        self.form.grade = grade;
    }

    pub fn form(&self) -> &OptimizeRequest {
        &self.form
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn is_processing(&self) -> bool {
        self.in_flight
    }

    /// Submission is disabled only while a request is in flight.
    pub fn can_submit(&self) -> bool {
        !self.in_flight
    }

    pub fn result(&self) -> Option<&OptimizationResult> {
        self.result.as_ref()
    }

    pub fn error_message(&self) -> Option<&'static str> {
        self.error
    }

    pub fn tips(&self) -> TipsDisclosure {
        self.tips
    }

    pub fn toggle_tips(&mut self) {
        self.tips.toggle();
    }

    /// Submit the current form. Holding `&mut self` across the call keeps it to one request at a time.
    /// If the returned future is dropped mid-call the session goes back to its last settled phase.
    pub async fn submit(&mut self, generator: &dyn TextGenerator) -> SubmitOutcome {
        if !self.form.has_idea() {
            let err = ComposeError::Validation;
            self.error = Some(err.user_message());
            self.phase = SessionPhase::Error;
            return SubmitOutcome::Rejected(err);
        }

        self.error = None;
        let resume_phase = if self.result.is_some() {
            SessionPhase::Success
        } else {
            SessionPhase::Idle
        };

        let outcome = {
            let _in_flight = InFlight::start(&mut self.in_flight, &mut self.phase, resume_phase);
            self.composer.optimize(generator, &self.form).await
        };

        match outcome {
            Ok(result) => {
                self.result = Some(result);
                self.tips = TipsDisclosure::collapsed();
                self.phase = SessionPhase::Success;
                info!("session.success");
                SubmitOutcome::Completed
            }
            Err(err) => {
                // previous result stays on screen
                self.error = Some(err.user_message());
                self.phase = SessionPhase::Error;
                info!(kept_previous = self.result.is_some(), "session.error");
                SubmitOutcome::Failed(err)
            }
        }
    }
}
