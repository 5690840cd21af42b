//! Quiz session state machine.
//!
//! `SessionState` is a plain value and `SessionState::reduce` is a pure
//! transition function: it takes one `SessionEvent` and returns the next state
//! plus at most one `Effect` for the driver to perform. Events that do not
//! apply to the current phase leave the state untouched.
//!
//! Invariant after every transition: `score <= current_index <= len`. Credit
//! for a correct answer is held in `Phase::Advancing` and only lands in
//! `score` together with the index increment.

use crate::model::{OptionLabel, Question, QuestionId, QuestionSet, SkillId, ValidationResult};

//
// ─── PHASE / EVENTS / EFFECTS ──────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Waiting for the question set.
    Loading,
    /// The question set could not be fetched; the user may retry or leave.
    LoadFailed,
    AwaitingAnswer,
    /// The selected option is out for validation.
    Validating { option: OptionLabel },
    /// Wrong-answer shake is playing.
    Feedback,
    /// The current index is consumed; `credited` marks a correct answer.
    Advancing { credited: bool },
    Finished,
}

impl Phase {
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Phase::Loading => "loading",
            Phase::LoadFailed => "load_failed",
            Phase::AwaitingAnswer => "awaiting_answer",
            Phase::Validating { .. } => "validating",
            Phase::Feedback => "feedback",
            Phase::Advancing { .. } => "advancing",
            Phase::Finished => "finished",
        }
    }
}

/// User- or gesture-originated request against the current question.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    Select(OptionLabel),
    Confirm,
    Swipe,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    Loaded(QuestionSet),
    LoadFailed,
    RetryLoad,
    Intent(Intent),
    Validated(ValidationResult),
    FeedbackFinished,
    Advance,
}

impl SessionEvent {
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            SessionEvent::Loaded(_) => "loaded",
            SessionEvent::LoadFailed => "load_failed",
            SessionEvent::RetryLoad => "retry_load",
            SessionEvent::Intent(Intent::Select(_)) => "select",
            SessionEvent::Intent(Intent::Confirm) => "confirm",
            SessionEvent::Intent(Intent::Swipe) => "swipe",
            SessionEvent::Validated(_) => "validated",
            SessionEvent::FeedbackFinished => "feedback_finished",
            SessionEvent::Advance => "advance",
        }
    }
}

/// Side effect requested by a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    /// Fetch the question set again.
    Load,
    /// Confirm was pressed with nothing selected.
    PromptSelection,
    Validate {
        question_id: QuestionId,
        option: OptionLabel,
    },
    PlayFeedback,
    /// Feed `SessionEvent::Advance` back in.
    Advance,
    /// The index is exhausted; fetch the outcome.
    Finish,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    pub state: SessionState,
    pub effect: Option<Effect>,
    pub ignored: bool,
}

impl Step {
    fn to(state: SessionState, effect: Option<Effect>) -> Self {
        Self {
            state,
            effect,
            ignored: false,
        }
    }

    fn ignored(state: SessionState) -> Self {
        Self {
            state,
            effect: None,
            ignored: true,
        }
    }
}

//
// ─── STATE ─────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, PartialEq)]
pub struct SessionState {
    skill_id: SkillId,
    questions: QuestionSet,
    current_index: usize,
    selected_option: Option<OptionLabel>,
    score: u32,
    phase: Phase,
}

impl SessionState {
    /// Fresh session waiting for its questions.
    #[must_use]
    pub fn new(skill_id: SkillId) -> Self {
        Self {
            skill_id,
            questions: QuestionSet::empty(),
            current_index: 0,
            selected_option: None,
            score: 0,
            phase: Phase::Loading,
        }
    }

    #[must_use]
    pub fn skill_id(&self) -> SkillId {
        self.skill_id
    }

    #[must_use]
    pub fn questions(&self) -> &QuestionSet {
        &self.questions
    }

    #[must_use]
    pub fn current_index(&self) -> usize {
        self.current_index
    }

    #[must_use]
    pub fn selected_option(&self) -> Option<OptionLabel> {
        self.selected_option
    }

    #[must_use]
    pub fn score(&self) -> u32 {
        self.score
    }

    #[must_use]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.phase == Phase::Finished
    }

    /// Only `AwaitingAnswer` takes select/confirm/swipe.
    #[must_use]
    pub fn accepts_answer_input(&self) -> bool {
        self.phase == Phase::AwaitingAnswer
    }

    /// Question on screen, if the session is between load and finish.
    #[must_use]
    pub fn current_question(&self) -> Option<&Question> {
        match self.phase {
            Phase::Loading | Phase::LoadFailed | Phase::Finished => None,
            _ => self.questions.get(self.current_index),
        }
    }

    /// Fraction of questions consumed, for the progress bar.
    #[must_use]
    pub fn progress(&self) -> f32 {
        if self.questions.is_empty() {
            return if self.is_finished() { 1.0 } else { 0.0 };
        }
        self.current_index as f32 / self.questions.len() as f32
    }

    /// `score <= current_index <= len`.
    #[must_use]
    pub fn invariants_hold(&self) -> bool {
        let score = usize::try_from(self.score).unwrap_or(usize::MAX);
        score <= self.current_index && self.current_index <= self.questions.len()
    }

    //
    // ─── TRANSITIONS ───────────────────────────────────────────────────────────
    //

    /// Apply one event.
    #[must_use]
    pub fn reduce(&self, event: SessionEvent) -> Step {
        let step = match (self.phase, event) {
            (Phase::Loading, SessionEvent::Loaded(questions)) => self.loaded(questions),
            (Phase::Loading, SessionEvent::LoadFailed) => Step::to(
                SessionState {
                    phase: Phase::LoadFailed,
                    ..self.clone()
                },
                None,
            ),
            (Phase::LoadFailed, SessionEvent::RetryLoad) => Step::to(
                SessionState {
                    phase: Phase::Loading,
                    ..self.clone()
                },
                Some(Effect::Load),
            ),
            (Phase::AwaitingAnswer, SessionEvent::Intent(intent)) => self.answer_intent(intent),
            (Phase::Validating { .. }, SessionEvent::Validated(result)) => {
                if result.correct {
                    self.advancing(true)
                } else {
                    Step::to(
                        SessionState {
                            phase: Phase::Feedback,
                            ..self.clone()
                        },
                        Some(Effect::PlayFeedback),
                    )
                }
            }
            (Phase::Feedback, SessionEvent::FeedbackFinished) => self.advancing(false),
            (Phase::Advancing { credited }, SessionEvent::Advance) => self.advance(credited),
            _ => Step::ignored(self.clone()),
        };
        debug_assert!(step.state.invariants_hold());
        step
    }

    fn loaded(&self, questions: QuestionSet) -> Step {
        if questions.is_empty() {
            return Step::to(
                SessionState {
                    questions,
                    phase: Phase::Finished,
                    ..self.clone()
                },
                Some(Effect::Finish),
            );
        }
        Step::to(
            SessionState {
                questions,
                current_index: 0,
                selected_option: None,
                phase: Phase::AwaitingAnswer,
                ..self.clone()
            },
            None,
        )
    }

    fn answer_intent(&self, intent: Intent) -> Step {
        match intent {
            Intent::Select(option) => {
                let selected_option = if self.selected_option == Some(option) {
                    None
                } else {
                    Some(option)
                };
                Step::to(
                    SessionState {
                        selected_option,
                        ..self.clone()
                    },
                    None,
                )
            }
            Intent::Confirm => {
                let (Some(option), Some(question)) =
                    (self.selected_option, self.questions.get(self.current_index))
                else {
                    return Step::to(self.clone(), Some(Effect::PromptSelection));
                };
                Step::to(
                    SessionState {
                        phase: Phase::Validating { option },
                        ..self.clone()
                    },
                    Some(Effect::Validate {
                        question_id: question.id(),
                        option,
                    }),
                )
            }
            Intent::Swipe => self.advancing(false),
        }
    }

    fn advancing(&self, credited: bool) -> Step {
        Step::to(
            SessionState {
                phase: Phase::Advancing { credited },
                ..self.clone()
            },
            Some(Effect::Advance),
        )
    }

    fn advance(&self, credited: bool) -> Step {
        let current_index = (self.current_index + 1).min(self.questions.len());
        let score = if credited { self.score + 1 } else { self.score };
        let finished = current_index == self.questions.len();
        Step::to(
            SessionState {
                current_index,
                score,
                selected_option: None,
                phase: if finished {
                    Phase::Finished
                } else {
                    Phase::AwaitingAnswer
                },
                ..self.clone()
            },
            finished.then_some(Effect::Finish),
        )
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
