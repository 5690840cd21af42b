//! Screen-side collaborators a session talks to: haptics, navigation and
//! user-facing notices. The app composition root supplies implementations.

use std::fmt;

use quiz_core::model::SessionOutcome;

/// Fire-and-forget platform haptics.
pub trait Haptics: Send + Sync {
    fn notify_error(&self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Library,
}

impl Route {
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Route::Library => "library",
        }
    }
}

/// Navigation stack. Only called when a session finishes or is abandoned.
pub trait Navigator: Send + Sync {
    fn reset_to(&self, route: Route);
    fn go_back(&self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notice {
    /// Confirm was pressed with no option selected.
    SelectAnswer,
    /// Blocking: questions could not be loaded; retry or go back.
    LoadFailed,
    /// Non-blocking: the answer could not be checked and counts as wrong.
    ValidationFailed,
    QuizCompleted(SessionOutcome),
    OutcomeUnavailable,
    /// Back was pressed mid-session; waiting for yes/no.
    ConfirmExit,
}

impl Notice {
    #[must_use]
    pub fn is_blocking(&self) -> bool {
        matches!(self, Notice::LoadFailed | Notice::ConfirmExit)
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notice::SelectAnswer => f.write_str("Select an answer."),
            Notice::LoadFailed => f.write_str("Could not load the questions."),
            Notice::ValidationFailed => {
                f.write_str("Could not check your answer; it was counted as incorrect.")
            }
            Notice::QuizCompleted(outcome) => write!(
                f,
                "Congratulations, you finished the quiz! Score {}, level {}.",
                outcome.score, outcome.level
            ),
            Notice::OutcomeUnavailable => {
                f.write_str("Quiz finished, but your level is unavailable. Try again later.")
            }
            Notice::ConfirmExit => f.write_str("Do you really want to leave?"),
        }
    }
}

pub trait Notifier: Send + Sync {
    fn notify(&self, notice: Notice);
}
