use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{Notify, watch};

use quiz_core::gesture::CardPose;
use quiz_core::model::{
    OptionLabel, Question, QuestionId, SessionOutcome, SkillId, ValidationResult,
};
use quiz_core::session::Phase;
use quiz_core::time::fixed_clock;
use services::{
    AnswerValidator, BackendError, Haptics, InMemoryBackend, LoadError, Navigator, Notice,
    Notifier, OutcomeStatus, QuestionSource, Route, SessionCollaborators, SessionConfig, SessionController, SessionHandle,
    SessionSnapshot, Termination, UserIntent, ValidationError,
};

const SKILL: u64 = 3;

//
// ─── FIXTURES ──────────────────────────────────────────────────────────────────
//

#[derive(Default)]
struct RecordingPlatform {
    pulses: AtomicUsize,
    backs: AtomicUsize,
    routes: Mutex<Vec<Route>>,
    notices: Mutex<Vec<Notice>>,
}

impl RecordingPlatform {
    fn pulses(&self) -> usize {
        self.pulses.load(Ordering::SeqCst)
    }

    fn backs(&self) -> usize {
        self.backs.load(Ordering::SeqCst)
    }

    fn routes(&self) -> Vec<Route> {
        self.routes.lock().unwrap().clone()
    }

    fn notices(&self) -> Vec<Notice> {
        self.notices.lock().unwrap().clone()
    }
}

impl Haptics for RecordingPlatform {
    fn notify_error(&self) {
        self.pulses.fetch_add(1, Ordering::SeqCst);
    }
}

impl Navigator for RecordingPlatform {
    fn reset_to(&self, route: Route) {
        self.routes.lock().unwrap().push(route);
    }

    fn go_back(&self) {
        self.backs.fetch_add(1, Ordering::SeqCst);
    }
}

impl Notifier for RecordingPlatform {
    fn notify(&self, notice: Notice) {
        self.notices.lock().unwrap().push(notice);
    }
}

/// Holds every answer until the gate opens.
struct GatedValidator {
    gate: Arc<Notify>,
}

#[async_trait]
impl AnswerValidator for GatedValidator {
    async fn submit_answer(
        &self,
        _question_id: QuestionId,
        _option: OptionLabel,
    ) -> Result<ValidationResult, BackendError> {
        self.gate.notified().await;
        Ok(ValidationResult::correct())
    }
}

/// Never answers.
struct SilentValidator;

#[async_trait]
impl AnswerValidator for SilentValidator {
    async fn submit_answer(
        &self,
        _question_id: QuestionId,
        _option: OptionLabel,
    ) -> Result<ValidationResult, BackendError> {
        std::future::pending().await
    }
}

struct CrashingSource;

#[async_trait]
impl QuestionSource for CrashingSource {
    async fn fetch_questions(&self, _skill_id: SkillId) -> Result<Vec<Question>, BackendError> {
        panic!("question source crashed")
    }
}

struct CrashingValidator;

#[async_trait]
impl AnswerValidator for CrashingValidator {
    async fn submit_answer(
        &self,
        _question_id: QuestionId,
        _option: OptionLabel,
    ) -> Result<ValidationResult, BackendError> {
        panic!("validator crashed")
    }
}

/// Questions 1..=count for `SKILL`, each answered correctly by A.
fn backend_with(count: u64) -> InMemoryBackend {
    let backend = InMemoryBackend::new();
    let questions = (1..=count)
        .map(|id| {
            Question::new(
                QuestionId::new(id),
                SkillId::new(SKILL),
                format!("Question {id}"),
                ["right".into(), "wrong".into(), "also wrong".into(), "nope".into()],
                OptionLabel::A,
            )
            .unwrap()
        })
        .collect();
    backend.put_questions(SkillId::new(SKILL), questions).unwrap();
    backend
        .put_outcome(SkillId::new(SKILL), SessionOutcome { score: 20, level: 2 })
        .unwrap();
    backend
}

fn collaborators(backend: &InMemoryBackend, platform: &Arc<RecordingPlatform>) -> SessionCollaborators {
    SessionCollaborators {
        questions: Arc::new(backend.clone()),
        validator: Arc::new(backend.clone()),
        outcomes: Arc::new(backend.clone()),
        haptics: platform.clone(),
        navigator: platform.clone(),
        notifier: platform.clone(),
    }
}

fn mount(collaborators: SessionCollaborators, config: SessionConfig) -> SessionHandle {
    SessionController::new(config, fixed_clock(), collaborators).mount(SkillId::new(SKILL))
}

async fn wait_until(
    rx: &mut watch::Receiver<SessionSnapshot>,
    pred: impl FnMut(&SessionSnapshot) -> bool,
) -> SessionSnapshot {
    rx.wait_for(pred).await.expect("session stopped early").clone()
}

async fn awaiting(rx: &mut watch::Receiver<SessionSnapshot>, index: usize) -> SessionSnapshot {
    wait_until(rx, |s| {
        s.state.phase() == Phase::AwaitingAnswer && s.state.current_index() == index
    })
    .await
}

fn answer(handle: &SessionHandle, option: OptionLabel) {
    assert!(handle.send(UserIntent::TapOption(option)));
    assert!(handle.send(UserIntent::TapConfirm));
}

fn swipe(handle: &SessionHandle, distance: f32) {
    handle.send(UserIntent::DragStart);
    handle.send(UserIntent::DragMove {
        translation_x: distance / 2.0,
    });
    handle.send(UserIntent::DragMove {
        translation_x: distance,
    });
    handle.send(UserIntent::DragEnd);
}

//
// ─── SCENARIOS ─────────────────────────────────────────────────────────────────
//

#[tokio::test(start_paused = true)]
async fn correct_correct_wrong_skip_scores_two() {
    let backend = backend_with(4);
    let platform = Arc::new(RecordingPlatform::default());
    let handle = mount(collaborators(&backend, &platform), SessionConfig::default());

    let mut watcher = handle.subscribe();
    let invariants = tokio::spawn(async move {
        let mut seen = 0;
        while watcher.changed().await.is_ok() {
            let snapshot = watcher.borrow_and_update().clone();
            assert!(snapshot.state.invariants_hold(), "{snapshot:?}");
            seen += 1;
        }
        seen
    });

    let mut rx = handle.subscribe();
    awaiting(&mut rx, 0).await;
    answer(&handle, OptionLabel::A);
    awaiting(&mut rx, 1).await;
    answer(&handle, OptionLabel::A);
    awaiting(&mut rx, 2).await;
    answer(&handle, OptionLabel::C);
    let third = awaiting(&mut rx, 3).await;
    assert_eq!(third.state.score(), 2);
    assert_eq!(third.state.selected_option(), None);
    swipe(&handle, -260.0);

    let report = handle.join().await.unwrap();
    assert_eq!(report.termination, Termination::Completed);
    assert_eq!(report.state.score(), 2);
    assert_eq!(report.state.current_index(), 4);
    assert_eq!(report.state.phase(), Phase::Finished);
    assert_eq!(
        report.outcome,
        OutcomeStatus::Submitted(SessionOutcome { score: 20, level: 2 })
    );
    // Fixed clock: mount and finish share a timestamp.
    assert_eq!(report.duration(), Some(chrono::Duration::zero()));
    assert!(report.validation_errors.is_empty());

    assert_eq!(platform.pulses(), 1);
    assert_eq!(platform.routes(), vec![Route::Library]);
    assert_eq!(
        platform.notices(),
        vec![Notice::QuizCompleted(SessionOutcome { score: 20, level: 2 })]
    );
    // The skipped question was never sent to the backend.
    assert_eq!(backend.submissions().unwrap().len(), 3);

    assert!(invariants.await.unwrap() > 0);
}

#[tokio::test(start_paused = true)]
async fn empty_question_set_finishes_immediately() {
    let backend = InMemoryBackend::new();
    backend
        .put_outcome(SkillId::new(SKILL), SessionOutcome { score: 0, level: 1 })
        .unwrap();
    let platform = Arc::new(RecordingPlatform::default());
    let handle = mount(collaborators(&backend, &platform), SessionConfig::default());

    let report = handle.join().await.unwrap();
    assert_eq!(report.state.phase(), Phase::Finished);
    assert_eq!(report.state.score(), 0);
    assert_eq!(report.state.current_index(), 0);
    assert_eq!(report.termination, Termination::Completed);
    assert_eq!(platform.routes(), vec![Route::Library]);
}

#[tokio::test(start_paused = true)]
async fn failed_validation_counts_as_wrong_and_advances() {
    let backend = backend_with(2);
    backend.fail_validation(QuestionId::new(1), true).unwrap();
    let platform = Arc::new(RecordingPlatform::default());
    let handle = mount(collaborators(&backend, &platform), SessionConfig::default());

    let mut rx = handle.subscribe();
    awaiting(&mut rx, 0).await;
    answer(&handle, OptionLabel::A);
    let next = awaiting(&mut rx, 1).await;
    assert_eq!(next.state.score(), 0);
    assert_eq!(platform.notices(), vec![Notice::ValidationFailed]);
    assert_eq!(platform.pulses(), 1);

    let report = handle.unmount().await.unwrap();
    assert_eq!(report.validation_errors.len(), 1);
    assert!(matches!(
        report.validation_errors[0],
        ValidationError::Backend(BackendError::Unavailable(_))
    ));
}

#[tokio::test(start_paused = true)]
async fn slow_validation_times_out_fail_closed() {
    let backend = backend_with(2);
    let platform = Arc::new(RecordingPlatform::default());
    let mut deps = collaborators(&backend, &platform);
    deps.validator = Arc::new(SilentValidator);
    let config = SessionConfig::default().with_request_timeout(Duration::from_secs(2));
    let handle = mount(deps, config);

    let mut rx = handle.subscribe();
    awaiting(&mut rx, 0).await;
    answer(&handle, OptionLabel::A);
    let next = awaiting(&mut rx, 1).await;
    assert_eq!(next.state.score(), 0);

    let report = handle.unmount().await.unwrap();
    assert!(matches!(report.validation_errors[..], [ValidationError::TimedOut]));
}

#[tokio::test(start_paused = true)]
async fn unmount_during_validation_drops_late_result() {
    let backend = backend_with(2);
    let platform = Arc::new(RecordingPlatform::default());
    let gate = Arc::new(Notify::new());
    let mut deps = collaborators(&backend, &platform);
    deps.validator = Arc::new(GatedValidator {
        gate: Arc::clone(&gate),
    });
    let config = SessionConfig::default().with_request_timeout(Duration::from_secs(3600));
    let handle = mount(deps, config);

    let mut rx = handle.subscribe();
    awaiting(&mut rx, 0).await;
    answer(&handle, OptionLabel::A);
    let pending = wait_until(&mut rx, |s| matches!(s.state.phase(), Phase::Validating { .. })).await;

    let report = handle.unmount().await.unwrap();
    assert_eq!(report.termination, Termination::Unmounted);
    assert_eq!(report.state, pending.state);

    gate.notify_waiters();
    gate.notify_one();
    tokio::time::sleep(Duration::from_secs(5)).await;

    assert_eq!(*rx.borrow(), pending);
    assert_eq!(platform.routes(), Vec::<Route>::new());
    assert_eq!(platform.backs(), 0);
}

#[tokio::test(start_paused = true)]
async fn confirm_without_selection_only_notifies() {
    let backend = backend_with(2);
    let platform = Arc::new(RecordingPlatform::default());
    let handle = mount(collaborators(&backend, &platform), SessionConfig::default());

    let mut rx = handle.subscribe();
    let before = awaiting(&mut rx, 0).await;
    handle.send(UserIntent::TapConfirm);
    handle.send(UserIntent::TapOption(OptionLabel::B));
    handle.send(UserIntent::TapOption(OptionLabel::B));
    tokio::time::sleep(Duration::from_millis(10)).await;

    // Tapping the same option twice clears the selection again.
    assert_eq!(handle.snapshot().state, before.state);
    assert_eq!(platform.notices(), vec![Notice::SelectAnswer]);
    assert!(backend.submissions().unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn input_during_feedback_is_ignored() {
    let backend = backend_with(3);
    let platform = Arc::new(RecordingPlatform::default());
    let handle = mount(collaborators(&backend, &platform), SessionConfig::default());

    let mut rx = handle.subscribe();
    awaiting(&mut rx, 0).await;
    answer(&handle, OptionLabel::D);
    wait_until(&mut rx, |s| s.state.phase() == Phase::Feedback).await;

    handle.send(UserIntent::TapOption(OptionLabel::A));
    handle.send(UserIntent::TapConfirm);
    swipe(&handle, -400.0);

    let next = awaiting(&mut rx, 1).await;
    assert_eq!(next.state.selected_option(), None);
    tokio::time::sleep(Duration::from_secs(2)).await;

    let settled = handle.snapshot();
    assert_eq!(settled.state.current_index(), 1);
    assert_eq!(settled.state.score(), 0);
    assert_eq!(backend.submissions().unwrap().len(), 1);
    assert_eq!(*handle.shake_offsets().borrow(), 0.0);
}

#[tokio::test(start_paused = true)]
async fn short_drag_does_not_skip() {
    let backend = backend_with(2);
    let platform = Arc::new(RecordingPlatform::default());
    let handle = mount(collaborators(&backend, &platform), SessionConfig::default());

    let mut rx = handle.subscribe();
    awaiting(&mut rx, 0).await;
    swipe(&handle, -150.0);
    tokio::time::sleep(Duration::from_millis(10)).await;

    let snapshot = handle.snapshot();
    assert_eq!(snapshot.state.current_index(), 0);
    assert!(matches!(snapshot.card, CardPose::Returning(_)));

    // Published back at rest once the spring-back has played out.
    let settled = wait_until(&mut rx, |s| s.card == CardPose::Rest).await;
    assert_eq!(settled.state.current_index(), 0);
}

#[tokio::test(start_paused = true)]
async fn drag_started_after_confirm_cannot_skip_the_next_card() {
    let backend = backend_with(3);
    let platform = Arc::new(RecordingPlatform::default());
    let handle = mount(collaborators(&backend, &platform), SessionConfig::default());

    let mut rx = handle.subscribe();
    awaiting(&mut rx, 0).await;
    answer(&handle, OptionLabel::A);
    handle.send(UserIntent::DragStart);
    handle.send(UserIntent::DragMove {
        translation_x: -300.0,
    });
    awaiting(&mut rx, 1).await;
    handle.send(UserIntent::DragEnd);
    tokio::time::sleep(Duration::from_millis(10)).await;

    let snapshot = handle.snapshot();
    assert_eq!(snapshot.state.current_index(), 1);
    assert_eq!(snapshot.state.score(), 1);
    assert_eq!(snapshot.state.phase(), Phase::AwaitingAnswer);
    assert_eq!(snapshot.card, CardPose::Rest);
    assert_eq!(backend.submissions().unwrap().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn drag_held_across_an_answer_ends_with_the_old_card() {
    let backend = backend_with(3);
    let platform = Arc::new(RecordingPlatform::default());
    let handle = mount(collaborators(&backend, &platform), SessionConfig::default());

    let mut rx = handle.subscribe();
    awaiting(&mut rx, 0).await;
    handle.send(UserIntent::TapOption(OptionLabel::A));
    handle.send(UserIntent::DragStart);
    handle.send(UserIntent::DragMove {
        translation_x: -300.0,
    });
    handle.send(UserIntent::TapConfirm);
    let next = awaiting(&mut rx, 1).await;
    assert_eq!(next.card, CardPose::Rest);

    handle.send(UserIntent::DragEnd);
    tokio::time::sleep(Duration::from_millis(10)).await;

    let snapshot = handle.snapshot();
    assert_eq!(snapshot.state.current_index(), 1);
    assert_eq!(snapshot.state.score(), 1);
}

#[tokio::test(start_paused = true)]
async fn crashed_question_source_reports_load_failure() {
    let backend = backend_with(1);
    let platform = Arc::new(RecordingPlatform::default());
    let mut deps = collaborators(&backend, &platform);
    deps.questions = Arc::new(CrashingSource);
    let handle = mount(deps, SessionConfig::default());

    let mut rx = handle.subscribe();
    wait_until(&mut rx, |s| s.state.phase() == Phase::LoadFailed).await;
    assert_eq!(platform.notices(), vec![Notice::LoadFailed]);

    let report = handle.unmount().await.unwrap();
    assert!(matches!(report.load_errors[..], [LoadError::Task(_)]));
}

#[tokio::test(start_paused = true)]
async fn crashed_validator_counts_as_failed_check() {
    let backend = backend_with(2);
    let platform = Arc::new(RecordingPlatform::default());
    let mut deps = collaborators(&backend, &platform);
    deps.validator = Arc::new(CrashingValidator);
    let handle = mount(deps, SessionConfig::default());

    let mut rx = handle.subscribe();
    awaiting(&mut rx, 0).await;
    answer(&handle, OptionLabel::A);
    let next = awaiting(&mut rx, 1).await;
    assert_eq!(next.state.score(), 0);
    assert_eq!(platform.notices(), vec![Notice::ValidationFailed]);

    let report = handle.unmount().await.unwrap();
    assert!(matches!(report.validation_errors[..], [ValidationError::Task(_)]));
}

#[tokio::test(start_paused = true)]
async fn back_asks_before_abandoning() {
    let backend = backend_with(2);
    let platform = Arc::new(RecordingPlatform::default());
    let handle = mount(collaborators(&backend, &platform), SessionConfig::default());

    let mut rx = handle.subscribe();
    awaiting(&mut rx, 0).await;
    handle.send(UserIntent::Back);
    wait_until(&mut rx, |s| s.exit_prompt).await;

    handle.send(UserIntent::TapOption(OptionLabel::A));
    handle.send(UserIntent::CancelExit);
    let closed = wait_until(&mut rx, |s| !s.exit_prompt).await;
    assert_eq!(closed.state.selected_option(), None);

    handle.send(UserIntent::Back);
    handle.send(UserIntent::ConfirmExit);
    let report = handle.join().await.unwrap();

    assert!(report.is_abandoned());
    assert_eq!(report.duration(), None);
    assert_eq!(report.outcome, OutcomeStatus::NotSubmitted);
    assert_eq!(platform.backs(), 1);
    assert!(platform.routes().is_empty());
    assert_eq!(platform.notices(), vec![Notice::ConfirmExit, Notice::ConfirmExit]);
}

#[tokio::test(start_paused = true)]
async fn load_failure_waits_for_explicit_retry() {
    let backend = backend_with(1);
    backend.fail_load(SkillId::new(SKILL), true).unwrap();
    let platform = Arc::new(RecordingPlatform::default());
    let handle = mount(collaborators(&backend, &platform), SessionConfig::default());

    let mut rx = handle.subscribe();
    wait_until(&mut rx, |s| s.state.phase() == Phase::LoadFailed).await;
    assert_eq!(platform.notices(), vec![Notice::LoadFailed]);

    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(handle.snapshot().state.phase(), Phase::LoadFailed);

    backend.fail_load(SkillId::new(SKILL), false).unwrap();
    handle.send(UserIntent::RetryLoad);
    awaiting(&mut rx, 0).await;

    let report = handle.unmount().await.unwrap();
    assert_eq!(report.load_errors.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn outcome_failure_still_navigates_away() {
    let backend = backend_with(1);
    backend.fail_outcome(SkillId::new(SKILL), true).unwrap();
    let platform = Arc::new(RecordingPlatform::default());
    let handle = mount(collaborators(&backend, &platform), SessionConfig::default());

    let mut rx = handle.subscribe();
    awaiting(&mut rx, 0).await;
    answer(&handle, OptionLabel::A);

    let report = handle.join().await.unwrap();
    assert_eq!(report.state.score(), 1);
    assert_eq!(report.outcome, OutcomeStatus::SubmitFailed);
    assert_eq!(report.termination, Termination::Completed);
    assert_eq!(platform.routes(), vec![Route::Library]);
    assert_eq!(platform.notices(), vec![Notice::OutcomeUnavailable]);
}
