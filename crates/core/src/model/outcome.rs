use serde::{Deserialize, Serialize};

/// Correctness of one submitted answer. Consumed immediately by the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub correct: bool,
}

impl ValidationResult {
    #[must_use]
    pub const fn correct() -> Self {
        Self { correct: true }
    }

    #[must_use]
    pub const fn incorrect() -> Self {
        Self { correct: false }
    }
}

/// Backend-computed summary for a skill after a finished session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionOutcome {
    pub score: u32,
    pub level: u32,
}
