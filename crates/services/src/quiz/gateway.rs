//! Wraps each collaborator call in the session's timeout and converts the
//! result into the session-level error kinds.

use std::future::Future;
use std::time::Duration;

use quiz_core::model::{
    OptionLabel, QuestionId, QuestionSet, SessionOutcome, SkillId, ValidationResult,
};

use crate::backend::{AnswerValidator, OutcomeSource, QuestionSource};
use crate::error::{BackendError, LoadError, OutcomeError, ValidationError};

async fn bounded<T, E>(
    limit: Duration,
    call: impl Future<Output = Result<T, BackendError>>,
    timed_out: E,
) -> Result<T, E>
where
    E: From<BackendError>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result.map_err(E::from),
        Err(_) => Err(timed_out),
    }
}

pub(crate) async fn load_questions(
    source: &dyn QuestionSource,
    skill_id: SkillId,
    limit: Duration,
) -> Result<QuestionSet, LoadError> {
    let questions = bounded(limit, source.fetch_questions(skill_id), LoadError::TimedOut).await?;
    Ok(QuestionSet::new(questions))
}

pub(crate) async fn validate_answer(
    validator: &dyn AnswerValidator,
    question_id: QuestionId,
    option: OptionLabel,
    limit: Duration,
) -> Result<ValidationResult, ValidationError> {
    bounded(
        limit,
        validator.submit_answer(question_id, option),
        ValidationError::TimedOut,
    )
    .await
}

pub(crate) async fn fetch_outcome(
    source: &dyn OutcomeSource,
    skill_id: SkillId,
    limit: Duration,
) -> Result<SessionOutcome, OutcomeError> {
    bounded(limit, source.fetch_outcome(skill_id), OutcomeError::TimedOut).await
}
