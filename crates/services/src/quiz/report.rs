use chrono::{DateTime, Utc};

use quiz_core::model::{SessionOutcome, SkillId};
use quiz_core::session::SessionState;

use crate::error::{LoadError, ValidationError};

/// Where the end-of-session outcome fetch stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutcomeStatus {
    NotSubmitted,
    Pending,
    Submitted(SessionOutcome),
    SubmitFailed,
}

/// Why the session loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// Finished and navigated to the library.
    Completed,
    /// The user confirmed leaving mid-session.
    Abandoned,
    /// The screen was torn down; pending work was dropped.
    Unmounted,
}

/// Final record of a session, returned when its loop stops.
#[derive(Debug)]
pub struct SessionReport {
    pub skill_id: SkillId,
    pub state: SessionState,
    pub outcome: OutcomeStatus,
    pub termination: Termination,
    pub load_errors: Vec<LoadError>,
    pub validation_errors: Vec<ValidationError>,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl SessionReport {
    #[must_use]
    pub fn is_abandoned(&self) -> bool {
        self.termination == Termination::Abandoned
    }

    /// Time from mount to the last question, if the session got that far.
    #[must_use]
    pub fn duration(&self) -> Option<chrono::Duration> {
        self.finished_at.map(|end| end - self.started_at)
    }
}
