use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use quiz_core::model::{
    OptionLabel, Question, QuestionId, SessionOutcome, SkillId, ValidationResult,
};

use crate::error::BackendError;

/// Fetches the ordered question set for a skill.
#[async_trait]
pub trait QuestionSource: Send + Sync {
    /// # Errors
    ///
    /// Returns `BackendError` if the request fails or the payload is malformed.
    /// An empty list is a valid answer, not an error.
    async fn fetch_questions(&self, skill_id: SkillId) -> Result<Vec<Question>, BackendError>;
}

/// Checks a selected option against the backend.
///
/// Implementations must be safe to call twice with the same arguments.
#[async_trait]
pub trait AnswerValidator: Send + Sync {
    /// # Errors
    ///
    /// Returns `BackendError` if the answer could not be checked.
    async fn submit_answer(
        &self,
        question_id: QuestionId,
        option: OptionLabel,
    ) -> Result<ValidationResult, BackendError>;
}

/// Fetches the backend-computed score and level after a session.
#[async_trait]
pub trait OutcomeSource: Send + Sync {
    /// # Errors
    ///
    /// Returns `BackendError` if the outcome is unavailable.
    async fn fetch_outcome(&self, skill_id: SkillId) -> Result<SessionOutcome, BackendError>;
}

#[derive(Debug, Default)]
struct Failures {
    load: HashSet<SkillId>,
    validate: HashSet<QuestionId>,
    outcome: HashSet<SkillId>,
}

/// Simple in-memory backend for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryBackend {
    questions: Arc<Mutex<HashMap<SkillId, Vec<Question>>>>,
    outcomes: Arc<Mutex<HashMap<SkillId, SessionOutcome>>>,
    submissions: Arc<Mutex<Vec<(QuestionId, OptionLabel)>>>,
    failures: Arc<Mutex<Failures>>,
}

fn poisoned<E: std::fmt::Display>(err: E) -> BackendError {
    BackendError::Unavailable(err.to_string())
}

impl InMemoryBackend {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the question set served for `skill_id`.
    ///
    /// # Errors
    ///
    /// Returns `BackendError::Unavailable` if the store lock is poisoned.
    pub fn put_questions(
        &self,
        skill_id: SkillId,
        questions: Vec<Question>,
    ) -> Result<(), BackendError> {
        let mut guard = self.questions.lock().map_err(poisoned)?;
        guard.insert(skill_id, questions);
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `BackendError::Unavailable` if the store lock is poisoned.
    pub fn put_outcome(&self, skill_id: SkillId, outcome: SessionOutcome) -> Result<(), BackendError> {
        let mut guard = self.outcomes.lock().map_err(poisoned)?;
        guard.insert(skill_id, outcome);
        Ok(())
    }

    /// Make every question fetch for `skill_id` fail.
    ///
    /// # Errors
    ///
    /// Returns `BackendError::Unavailable` if the store lock is poisoned.
    pub fn fail_load(&self, skill_id: SkillId, failing: bool) -> Result<(), BackendError> {
        let mut guard = self.failures.lock().map_err(poisoned)?;
        toggle(&mut guard.load, skill_id, failing);
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `BackendError::Unavailable` if the store lock is poisoned.
    pub fn fail_validation(&self, question_id: QuestionId, failing: bool) -> Result<(), BackendError> {
        let mut guard = self.failures.lock().map_err(poisoned)?;
        toggle(&mut guard.validate, question_id, failing);
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `BackendError::Unavailable` if the store lock is poisoned.
    pub fn fail_outcome(&self, skill_id: SkillId, failing: bool) -> Result<(), BackendError> {
        let mut guard = self.failures.lock().map_err(poisoned)?;
        toggle(&mut guard.outcome, skill_id, failing);
        Ok(())
    }

    /// Answers submitted so far, in order.
    ///
    /// # Errors
    ///
    /// Returns `BackendError::Unavailable` if the store lock is poisoned.
    pub fn submissions(&self) -> Result<Vec<(QuestionId, OptionLabel)>, BackendError> {
        let guard = self.submissions.lock().map_err(poisoned)?;
        Ok(guard.clone())
    }
}

fn toggle<T: std::hash::Hash + Eq>(set: &mut HashSet<T>, key: T, on: bool) {
    if on {
        set.insert(key);
    } else {
        set.remove(&key);
    }
}

#[async_trait]
impl QuestionSource for InMemoryBackend {
    async fn fetch_questions(&self, skill_id: SkillId) -> Result<Vec<Question>, BackendError> {
        if self.failures.lock().map_err(poisoned)?.load.contains(&skill_id) {
            return Err(BackendError::Unavailable(format!("questions for skill {skill_id}")));
        }
        let guard = self.questions.lock().map_err(poisoned)?;
        Ok(guard.get(&skill_id).cloned().unwrap_or_default())
    }
}

#[async_trait]
impl AnswerValidator for InMemoryBackend {
    async fn submit_answer(
        &self,
        question_id: QuestionId,
        option: OptionLabel,
    ) -> Result<ValidationResult, BackendError> {
        if self
            .failures
            .lock()
            .map_err(poisoned)?
            .validate
            .contains(&question_id)
        {
            return Err(BackendError::Unavailable(format!("validate question {question_id}")));
        }

        let correct = {
            let guard = self.questions.lock().map_err(poisoned)?;
            guard
                .values()
                .flatten()
                .find(|question| question.id() == question_id)
                .map(|question| question.is_correct(option))
                .ok_or(BackendError::HttpStatus(reqwest::StatusCode::NOT_FOUND))?
        };

        self.submissions
            .lock()
            .map_err(poisoned)?
            .push((question_id, option));
        Ok(ValidationResult { correct })
    }
}

#[async_trait]
impl OutcomeSource for InMemoryBackend {
    async fn fetch_outcome(&self, skill_id: SkillId) -> Result<SessionOutcome, BackendError> {
        if self.failures.lock().map_err(poisoned)?.outcome.contains(&skill_id) {
            return Err(BackendError::Unavailable(format!("outcome for skill {skill_id}")));
        }
        let guard = self.outcomes.lock().map_err(poisoned)?;
        guard
            .get(&skill_id)
            .copied()
            .ok_or(BackendError::HttpStatus(reqwest::StatusCode::NOT_FOUND))
    }
}
