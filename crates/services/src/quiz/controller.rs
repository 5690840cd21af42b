//! Session controller: one event loop per mounted quiz screen.
//!
//! User intents, gesture releases and the completions of network calls and
//! the shake animation all arrive at a single consumer, which feeds them
//! through `SessionState::reduce` one at a time. Collaborator calls run as
//! tasks in a `JoinSet` owned by the loop, so tearing the loop down drops
//! every pending call with it and no late result can touch the state.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::{JoinError, JoinHandle, JoinSet};

use quiz_core::Clock;
use quiz_core::gesture::{CardPose, GestureController};
use quiz_core::model::{OptionLabel, QuestionSet, SessionOutcome, SkillId, ValidationResult};
use quiz_core::session::{Effect, Intent, Phase, SessionEvent, SessionState};

use crate::backend::{AnswerValidator, OutcomeSource, QuestionSource};
use crate::error::{LoadError, OutcomeError, ValidationError};
use crate::feedback::FeedbackAnimator;
use crate::platform::{Haptics, Navigator, Notice, Notifier, Route};

use super::config::SessionConfig;
use super::gateway;
use super::report::{OutcomeStatus, SessionReport, Termination};

//
// ─── PUBLIC TYPES ──────────────────────────────────────────────────────────────
//

/// Raw screen input.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UserIntent {
    TapOption(OptionLabel),
    TapConfirm,
    DragStart,
    DragMove { translation_x: f32 },
    DragEnd,
    /// Hardware back.
    Back,
    /// "Yes" on the leave prompt.
    ConfirmExit,
    /// "No" on the leave prompt.
    CancelExit,
    RetryLoad,
}

/// What the screen renders.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSnapshot {
    pub state: SessionState,
    pub card: CardPose,
    pub exit_prompt: bool,
    pub outcome: OutcomeStatus,
}

/// Everything a session talks to.
#[derive(Clone)]
pub struct SessionCollaborators {
    pub questions: Arc<dyn QuestionSource>,
    pub validator: Arc<dyn AnswerValidator>,
    pub outcomes: Arc<dyn OutcomeSource>,
    pub haptics: Arc<dyn Haptics>,
    pub navigator: Arc<dyn Navigator>,
    pub notifier: Arc<dyn Notifier>,
}

/// Mounts quiz sessions.
#[derive(Clone)]
pub struct SessionController {
    config: SessionConfig,
    clock: Clock,
    collaborators: SessionCollaborators,
}

impl SessionController {
    #[must_use]
    pub fn new(config: SessionConfig, clock: Clock, collaborators: SessionCollaborators) -> Self {
        Self {
            config,
            clock,
            collaborators,
        }
    }

    /// Start a session for `skill_id` and begin loading its questions.
    ///
    /// Must be called from within a tokio runtime.
    #[must_use]
    pub fn mount(&self, skill_id: SkillId) -> SessionHandle {
        let state = SessionState::new(skill_id);
        let (snapshot_tx, snapshot_rx) = watch::channel(SessionSnapshot {
            state: state.clone(),
            card: CardPose::Rest,
            exit_prompt: false,
            outcome: OutcomeStatus::NotSubmitted,
        });
        let (shake_tx, shake_rx) = watch::channel(0.0_f32);
        let (intent_tx, intent_rx) = mpsc::unbounded_channel();
        let (unmount_tx, unmount_rx) = oneshot::channel();

        let animator = FeedbackAnimator::new(Arc::clone(&self.collaborators.haptics))
            .with_timeline(self.config.shake);
        let session = SessionLoop {
            config: self.config,
            clock: self.clock,
            deps: self.collaborators.clone(),
            animator: Arc::new(animator),
            state,
            gesture: GestureController::new(self.config.gesture),
            drag_index: None,
            exit_prompt: false,
            outcome: OutcomeStatus::NotSubmitted,
            load_errors: Vec::new(),
            validation_errors: Vec::new(),
            started_at: self.clock.now(),
            finished_at: None,
            tasks: JoinSet::new(),
            snapshots: snapshot_tx,
            shake: Arc::new(shake_tx),
        };

        SessionHandle {
            intents: intent_tx,
            unmount: Some(unmount_tx),
            snapshots: snapshot_rx,
            shake: shake_rx,
            task: tokio::spawn(session.run(intent_rx, unmount_rx)),
        }
    }
}

/// The mounted screen's side of a session.
///
/// Dropping the handle unmounts the session.
pub struct SessionHandle {
    intents: mpsc::UnboundedSender<UserIntent>,
    unmount: Option<oneshot::Sender<()>>,
    snapshots: watch::Receiver<SessionSnapshot>,
    shake: watch::Receiver<f32>,
    task: JoinHandle<SessionReport>,
}

impl SessionHandle {
    /// Queue an intent. Returns `false` once the session has stopped.
    pub fn send(&self, intent: UserIntent) -> bool {
        self.intents.send(intent).is_ok()
    }

    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        self.snapshots.borrow().clone()
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshots.clone()
    }

    /// Horizontal card offset of the wrong-answer shake.
    #[must_use]
    pub fn shake_offsets(&self) -> watch::Receiver<f32> {
        self.shake.clone()
    }

    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.task.is_finished()
    }

    /// Tear the session down, discarding any in-flight call.
    ///
    /// # Errors
    ///
    /// Returns `JoinError` if the session task panicked.
    pub async fn unmount(mut self) -> Result<SessionReport, JoinError> {
        if let Some(tx) = self.unmount.take() {
            let _ = tx.send(());
        }
        (&mut self.task).await
    }

    /// Wait for the session to stop on its own (finished or abandoned).
    ///
    /// # Errors
    ///
    /// Returns `JoinError` if the session task panicked.
    pub async fn join(mut self) -> Result<SessionReport, JoinError> {
        (&mut self.task).await
    }
}

//
// ─── EVENT LOOP ────────────────────────────────────────────────────────────────
//

enum Completion {
    Loaded(Result<QuestionSet, LoadError>),
    Validated {
        index: usize,
        result: Result<ValidationResult, ValidationError>,
    },
    FeedbackFinished {
        index: usize,
    },
    OutcomeFetched(Result<SessionOutcome, OutcomeError>),
    CardSettled {
        release_id: u64,
    },
}

enum Message {
    Intent(UserIntent),
    Completed(Result<Completion, JoinError>),
    Unmount,
}

enum Flow {
    Continue,
    Stop(Termination),
}

struct SessionLoop {
    config: SessionConfig,
    clock: Clock,
    deps: SessionCollaborators,
    animator: Arc<FeedbackAnimator>,
    state: SessionState,
    gesture: GestureController,
    /// Question the active drag started on.
    drag_index: Option<usize>,
    exit_prompt: bool,
    outcome: OutcomeStatus,
    load_errors: Vec<LoadError>,
    validation_errors: Vec<ValidationError>,
    started_at: DateTime<Utc>,
    finished_at: Option<DateTime<Utc>>,
    tasks: JoinSet<Completion>,
    snapshots: watch::Sender<SessionSnapshot>,
    shake: Arc<watch::Sender<f32>>,
}

impl SessionLoop {
    async fn run(
        mut self,
        mut intents: mpsc::UnboundedReceiver<UserIntent>,
        mut unmount: oneshot::Receiver<()>,
    ) -> SessionReport {
        tracing::info!(skill_id = %self.state.skill_id(), "quiz session mounted");
        self.perform(Effect::Load);
        self.publish();

        loop {
            let message = tokio::select! {
                biased;
                _ = &mut unmount => Message::Unmount,
                Some(done) = self.tasks.join_next(), if !self.tasks.is_empty() => {
                    Message::Completed(done)
                }
                intent = intents.recv() => intent.map_or(Message::Unmount, Message::Intent),
            };

            let flow = match message {
                Message::Intent(intent) => self.on_intent(intent),
                Message::Completed(Ok(completion)) => self.on_completion(completion),
                Message::Completed(Err(err)) => self.on_task_failure(err),
                Message::Unmount => Flow::Stop(Termination::Unmounted),
            };
            self.publish();

            if let Flow::Stop(termination) = flow {
                return self.into_report(termination);
            }
        }
    }

    fn publish(&self) {
        self.snapshots.send_replace(SessionSnapshot {
            state: self.state.clone(),
            card: self.gesture.pose(),
            exit_prompt: self.exit_prompt,
            outcome: self.outcome,
        });
    }

    fn into_report(self, termination: Termination) -> SessionReport {
        tracing::info!(
            skill_id = %self.state.skill_id(),
            index = self.state.current_index(),
            score = self.state.score(),
            phase = self.state.phase().name(),
            ?termination,
            "quiz session stopped"
        );
        // Dropping `tasks` here aborts anything still in flight.
        SessionReport {
            skill_id: self.state.skill_id(),
            state: self.state,
            outcome: self.outcome,
            termination,
            load_errors: self.load_errors,
            validation_errors: self.validation_errors,
            started_at: self.started_at,
            finished_at: self.finished_at,
        }
    }

    //
    // ─── INPUT ─────────────────────────────────────────────────────────────────
    //

    fn on_intent(&mut self, intent: UserIntent) -> Flow {
        if self.exit_prompt {
            return self.on_exit_prompt(intent);
        }

        match intent {
            UserIntent::TapOption(option) => {
                self.dispatch(SessionEvent::Intent(Intent::Select(option)));
            }
            UserIntent::TapConfirm => self.dispatch(SessionEvent::Intent(Intent::Confirm)),
            UserIntent::DragStart => {
                if self.state.accepts_answer_input() {
                    self.gesture.press();
                    self.drag_index = Some(self.state.current_index());
                } else {
                    tracing::debug!(phase = self.state.phase().name(), "drag ignored, card is locked");
                }
            }
            UserIntent::DragMove { translation_x } => self.gesture.update(translation_x),
            UserIntent::DragEnd => self.on_release(),
            UserIntent::Back => {
                if self.state.is_finished() {
                    tracing::debug!("back ignored, session already finished");
                } else {
                    self.exit_prompt = true;
                    self.deps.notifier.notify(Notice::ConfirmExit);
                }
            }
            UserIntent::RetryLoad => self.dispatch(SessionEvent::RetryLoad),
            UserIntent::ConfirmExit | UserIntent::CancelExit => {
                tracing::debug!(?intent, "no exit prompt open");
            }
        }
        Flow::Continue
    }

    fn on_release(&mut self) {
        let Some(release) = self.gesture.release() else {
            return;
        };
        let dragged = self.drag_index.take();

        let settle_after = release.spring_back.duration();
        let release_id = release.spring_back.release_id();
        self.tasks.spawn(async move {
            tokio::time::sleep(settle_after).await;
            Completion::CardSettled { release_id }
        });

        let Some(intent) = release.intent else {
            return;
        };
        if dragged == Some(self.state.current_index()) {
            self.dispatch(SessionEvent::Intent(intent));
        } else {
            tracing::debug!(?dragged, index = self.state.current_index(), "swipe from another card dropped");
        }
    }

    fn on_exit_prompt(&mut self, intent: UserIntent) -> Flow {
        match intent {
            UserIntent::ConfirmExit => {
                tracing::info!(
                    skill_id = %self.state.skill_id(),
                    index = self.state.current_index(),
                    "quiz session abandoned"
                );
                self.exit_prompt = false;
                self.deps.navigator.go_back();
                Flow::Stop(Termination::Abandoned)
            }
            UserIntent::CancelExit | UserIntent::Back => {
                self.exit_prompt = false;
                Flow::Continue
            }
            other => {
                tracing::debug!(intent = ?other, "intent ignored while exit prompt is open");
                Flow::Continue
            }
        }
    }

    //
    // ─── COMPLETIONS ───────────────────────────────────────────────────────────
    //

    fn on_completion(&mut self, completion: Completion) -> Flow {
        match completion {
            Completion::Loaded(Ok(questions)) => {
                tracing::info!(
                    skill_id = %self.state.skill_id(),
                    count = questions.len(),
                    "questions loaded"
                );
                self.dispatch(SessionEvent::Loaded(questions));
            }
            Completion::Loaded(Err(err)) => self.on_load_error(err),
            Completion::Validated { index, result } => {
                if !self.is_current(index) {
                    tracing::debug!(index, "stale validation result dropped");
                    return Flow::Continue;
                }
                let result = result.unwrap_or_else(|err| self.on_validation_error(err));
                self.dispatch(SessionEvent::Validated(result));
            }
            Completion::FeedbackFinished { index } => {
                if self.is_current(index) {
                    self.dispatch(SessionEvent::FeedbackFinished);
                }
            }
            Completion::OutcomeFetched(result) => return self.on_outcome(result),
            Completion::CardSettled { release_id } => {
                self.gesture.settle(release_id);
            }
        }
        Flow::Continue
    }

    fn on_load_error(&mut self, err: LoadError) {
        tracing::warn!(skill_id = %self.state.skill_id(), error = %err, "loading questions failed");
        self.load_errors.push(err);
        self.deps.notifier.notify(Notice::LoadFailed);
        self.dispatch(SessionEvent::LoadFailed);
    }

    /// Record a failed check; the answer counts as incorrect.
    fn on_validation_error(&mut self, err: ValidationError) -> ValidationResult {
        tracing::warn!(
            index = self.state.current_index(),
            error = %err,
            "validation failed, counting answer as incorrect"
        );
        self.validation_errors.push(err);
        self.deps.notifier.notify(Notice::ValidationFailed);
        ValidationResult::incorrect()
    }

    fn on_outcome(&mut self, result: Result<SessionOutcome, OutcomeError>) -> Flow {
        match result {
            Ok(outcome) => {
                tracing::info!(score = outcome.score, level = outcome.level, "session outcome received");
                self.outcome = OutcomeStatus::Submitted(outcome);
                self.deps.notifier.notify(Notice::QuizCompleted(outcome));
            }
            Err(err) => {
                tracing::warn!(error = %err, "session outcome unavailable");
                self.outcome = OutcomeStatus::SubmitFailed;
                self.deps.notifier.notify(Notice::OutcomeUnavailable);
            }
        }
        self.deps.navigator.reset_to(Route::Library);
        Flow::Stop(Termination::Completed)
    }

    /// A collaborator task panicked. Resolve whatever the phase was waiting
    /// on so the session cannot stall.
    fn on_task_failure(&mut self, err: JoinError) -> Flow {
        tracing::error!(error = %err, phase = self.state.phase().name(), "session task failed");
        match self.state.phase() {
            Phase::Loading => self.on_load_error(LoadError::Task(err)),
            Phase::Validating { .. } => {
                let result = self.on_validation_error(ValidationError::Task(err));
                self.dispatch(SessionEvent::Validated(result));
            }
            Phase::Feedback => self.dispatch(SessionEvent::FeedbackFinished),
            Phase::Finished if self.outcome == OutcomeStatus::Pending => {
                return self.on_outcome(Err(OutcomeError::Task(err)));
            }
            _ => {}
        }
        Flow::Continue
    }

    fn is_current(&self, index: usize) -> bool {
        index == self.state.current_index() && !self.state.is_finished()
    }

    //
    // ─── TRANSITIONS & EFFECTS ─────────────────────────────────────────────────
    //

    fn dispatch(&mut self, event: SessionEvent) {
        let index = self.state.current_index();
        self.step(event);
        if self.state.current_index() != index {
            // A new card starts at rest; a drag on the old one is over.
            self.gesture.cancel();
            self.drag_index = None;
        }
    }

    fn step(&mut self, event: SessionEvent) {
        let mut next = Some(event);
        while let Some(event) = next.take() {
            let name = event.name();
            let step = self.state.reduce(event);
            if step.ignored {
                tracing::debug!(event = name, phase = self.state.phase().name(), "event ignored");
                return;
            }
            self.state = step.state;
            tracing::debug!(
                event = name,
                phase = self.state.phase().name(),
                index = self.state.current_index(),
                score = self.state.score(),
                "session transition"
            );
            next = step.effect.and_then(|effect| self.perform(effect));
        }
    }

    /// Start an effect. Returns an event to feed back in immediately.
    fn perform(&mut self, effect: Effect) -> Option<SessionEvent> {
        let limit = self.config.request_timeout;
        let skill_id = self.state.skill_id();
        match effect {
            Effect::Load => {
                let source = Arc::clone(&self.deps.questions);
                self.tasks.spawn(async move {
                    Completion::Loaded(gateway::load_questions(source.as_ref(), skill_id, limit).await)
                });
            }
            Effect::PromptSelection => self.deps.notifier.notify(Notice::SelectAnswer),
            Effect::Validate {
                question_id,
                option,
            } => {
                let validator = Arc::clone(&self.deps.validator);
                let index = self.state.current_index();
                self.tasks.spawn(async move {
                    let result =
                        gateway::validate_answer(validator.as_ref(), question_id, option, limit).await;
                    Completion::Validated { index, result }
                });
            }
            Effect::PlayFeedback => {
                let animator = Arc::clone(&self.animator);
                let shake = Arc::clone(&self.shake);
                let index = self.state.current_index();
                self.tasks.spawn(async move {
                    animator.play(&shake).await;
                    Completion::FeedbackFinished { index }
                });
            }
            Effect::Advance => return Some(SessionEvent::Advance),
            Effect::Finish => {
                tracing::info!(
                    %skill_id,
                    score = self.state.score(),
                    total = self.state.questions().len(),
                    "quiz finished"
                );
                self.finished_at = Some(self.clock.now());
                self.outcome = OutcomeStatus::Pending;
                let source = Arc::clone(&self.deps.outcomes);
                self.tasks.spawn(async move {
                    Completion::OutcomeFetched(
                        gateway::fetch_outcome(source.as_ref(), skill_id, limit).await,
                    )
                });
            }
        }
        None
    }
}
