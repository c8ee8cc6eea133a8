//! Question navigation state machine.
//!
//! `Loading → Active → Submitting → { Completed | Failed }`, with
//! `Submitting → Active` when a submission fails. All state lives behind a
//! single async mutex owned by the controller; network calls run with the
//! lock released so input keeps flowing while a request is in flight.

use std::{
    fmt,
    sync::{Arc, Weak},
    time::Duration,
};

use shared::domain::{Likert, Question, ResultId};
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, info, warn};

use crate::{
    answers::AnswerSet,
    error::{FlowError, LoadFailure},
    timers::ScheduledTask,
    view::{question_view, QuestionView},
    ResultsLink, ScoringService,
};

const DEFAULT_AUTO_ADVANCE_DELAY: Duration = Duration::from_millis(400);
const DEFAULT_IDLE_THRESHOLD: Duration = Duration::from_secs(5);
const EVENT_CAPACITY: usize = 256;

const LOAD_FAILED_MESSAGE: &str = "Failed to load the questions. Please reload and try again.";
const SUBMIT_FAILED_MESSAGE: &str = "Failed to save your result. Please try again.";

#[derive(Debug, Clone)]
pub struct FlowOptions {
    pub auto_advance_delay: Duration,
    pub idle_threshold: Duration,
    /// Submit automatically once the last question is answered and every
    /// slot is filled.
    pub auto_submit: bool,
    /// Prefix for the results-view reference handed off on completion.
    pub results_view_base: String,
}

impl Default for FlowOptions {
    fn default() -> Self {
        Self {
            auto_advance_delay: DEFAULT_AUTO_ADVANCE_DELAY,
            idle_threshold: DEFAULT_IDLE_THRESHOLD,
            auto_submit: true,
            results_view_base: String::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlowPhase {
    Loading,
    Active,
    Submitting,
    Completed(ResultId),
    Failed,
}

impl fmt::Display for FlowPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Loading => f.write_str("loading"),
            Self::Active => f.write_str("active"),
            Self::Submitting => f.write_str("submitting"),
            Self::Completed(id) => write!(f, "completed ({id})"),
            Self::Failed => f.write_str("failed"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    LoadFailed,
    SubmissionFailed,
}

/// A blocking, user-visible notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserNotice {
    pub kind: NoticeKind,
    pub message: String,
    pub retryable: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FlowEvent {
    Render(QuestionView),
    /// Navigation was refused because a question is unanswered.
    NeedAnswer { cursor: usize },
    Stalled,
    Resumed,
    Submitting,
    Completed(ResultsLink),
    Notice(UserNotice),
}

/// Discrete inputs from the front end (buttons, keys, pointer movement).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowInput {
    Answer(u8),
    Next,
    Prev,
    Submit,
    Activity,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Navigation {
    Moved { cursor: usize },
    Stayed,
    SubmissionInFlight,
    Completed(ResultId),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlowSnapshot {
    pub phase: FlowPhase,
    pub cursor: usize,
    pub answers: AnswerSet,
    pub total: usize,
    pub stalled: bool,
}

struct FlowState {
    phase: FlowPhase,
    load_started: bool,
    questions: Vec<Question>,
    answers: AnswerSet,
    cursor: usize,
    stalled: bool,
    auto_advance: Option<ScheduledTask>,
    auto_advance_epoch: u64,
    idle: Option<ScheduledTask>,
    idle_epoch: u64,
}

impl FlowState {
    fn ensure_active(&self) -> Result<(), FlowError> {
        if self.phase == FlowPhase::Active {
            Ok(())
        } else {
            Err(FlowError::NotActive(self.phase.clone()))
        }
    }

    fn is_last(&self) -> bool {
        self.cursor + 1 >= self.questions.len()
    }

    fn cancel_auto_advance(&mut self) {
        self.auto_advance_epoch += 1;
        if let Some(task) = self.auto_advance.take() {
            task.cancel();
        }
    }

    fn cancel_idle(&mut self) {
        self.idle_epoch += 1;
        self.stalled = false;
        if let Some(task) = self.idle.take() {
            task.cancel();
        }
    }
}

pub struct QuestionFlowController {
    service: Arc<dyn ScoringService>,
    options: FlowOptions,
    inner: Mutex<FlowState>,
    events: broadcast::Sender<FlowEvent>,
}

impl QuestionFlowController {
    pub fn new(service: Arc<dyn ScoringService>, options: FlowOptions) -> Arc<Self> {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Arc::new(Self {
            service,
            options,
            inner: Mutex::new(FlowState {
                phase: FlowPhase::Loading,
                load_started: false,
                questions: Vec::new(),
                answers: AnswerSet::default(),
                cursor: 0,
                stalled: false,
                auto_advance: None,
                auto_advance_epoch: 0,
                idle: None,
                idle_epoch: 0,
            }),
            events,
        })
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<FlowEvent> {
        self.events.subscribe()
    }

    pub fn options(&self) -> &FlowOptions {
        &self.options
    }

    pub async fn snapshot(&self) -> FlowSnapshot {
        let state = self.inner.lock().await;
        FlowSnapshot {
            phase: state.phase.clone(),
            cursor: state.cursor,
            answers: state.answers.clone(),
            total: state.questions.len(),
            stalled: state.stalled,
        }
    }

    pub async fn view(&self) -> Option<QuestionView> {
        let state = self.inner.lock().await;
        question_view(&state.questions, &state.answers, state.cursor)
    }

    /// Fetches the question set and enters `Active` at the first question.
    /// Any failure is terminal for this controller.
    pub async fn load(self: &Arc<Self>) -> Result<usize, FlowError> {
        {
            let mut state = self.inner.lock().await;
            if state.phase != FlowPhase::Loading || state.load_started {
                return Err(FlowError::NotActive(state.phase.clone()));
            }
            state.load_started = true;
        }

        let fetched = self.service.fetch_questions().await;

        let mut state = self.inner.lock().await;
        let mut questions = match fetched {
            Ok(questions) if !questions.is_empty() => questions,
            Ok(_) => return Err(self.fail_load(&mut state, LoadFailure::Empty)),
            Err(err) => return Err(self.fail_load(&mut state, LoadFailure::Service(err))),
        };

        if questions.iter().all(|q| q.order.is_some()) {
            questions.sort_by_key(|q| q.order);
        }

        let total = questions.len();
        state.answers = AnswerSet::unanswered(total);
        state.questions = questions;
        state.cursor = 0;
        state.phase = FlowPhase::Active;
        info!(total, "questions loaded");

        self.render(&state);
        self.arm_idle(&mut state);
        Ok(total)
    }

    /// Records `value` for the current question and schedules the
    /// auto-advance. A pending auto-advance from an earlier answer is
    /// replaced.
    pub async fn answer(self: &Arc<Self>, value: u8) -> Result<(), FlowError> {
        let value = Likert::new(value).map_err(|err| FlowError::InvalidAnswer(err.0))?;

        let mut state = self.inner.lock().await;
        state.ensure_active()?;

        let cursor = state.cursor;
        state.answers.set(cursor, value);
        debug!(cursor, value = value.value(), "answer recorded");

        self.touch(&mut state);
        self.render(&state);
        self.schedule_auto_advance(&mut state);
        Ok(())
    }

    pub async fn go_next(self: &Arc<Self>) -> Result<Navigation, FlowError> {
        {
            let mut state = self.inner.lock().await;
            state.ensure_active()?;
            state.cancel_auto_advance();
            self.touch(&mut state);

            let cursor = state.cursor;
            if state.answers.get(cursor).is_none() {
                self.emit(FlowEvent::NeedAnswer { cursor });
                return Err(FlowError::Validation { unanswered: cursor });
            }

            if !state.is_last() {
                state.cursor += 1;
                debug!(cursor = state.cursor, "moved to next question");
                self.render(&state);
                return Ok(Navigation::Moved {
                    cursor: state.cursor,
                });
            }
        }

        self.submit().await
    }

    pub async fn go_prev(self: &Arc<Self>) -> Result<Navigation, FlowError> {
        let mut state = self.inner.lock().await;
        state.ensure_active()?;
        self.touch(&mut state);

        if state.cursor == 0 {
            return Ok(Navigation::Stayed);
        }

        state.cancel_auto_advance();
        state.cursor -= 1;
        debug!(cursor = state.cursor, "moved to previous question");
        self.render(&state);
        Ok(Navigation::Moved {
            cursor: state.cursor,
        })
    }

    /// Sends the completed answer set. Only one submission runs at a time;
    /// further calls while one is in flight return `SubmissionInFlight`
    /// without touching the network.
    pub async fn submit(self: &Arc<Self>) -> Result<Navigation, FlowError> {
        let payload = {
            let mut state = self.inner.lock().await;
            match &state.phase {
                FlowPhase::Active => {}
                FlowPhase::Submitting => return Ok(Navigation::SubmissionInFlight),
                FlowPhase::Completed(id) => return Ok(Navigation::Completed(id.clone())),
                other => return Err(FlowError::NotActive(other.clone())),
            }
            state.cancel_auto_advance();

            let Some(payload) = state.answers.completed() else {
                let unanswered = state.answers.first_unanswered().unwrap_or_default();
                state.cursor = unanswered;
                debug!(cursor = unanswered, "submission blocked by unanswered question");
                self.render(&state);
                self.emit(FlowEvent::NeedAnswer { cursor: unanswered });
                return Err(FlowError::Validation { unanswered });
            };

            state.cancel_idle();
            state.phase = FlowPhase::Submitting;
            payload
        };

        self.emit(FlowEvent::Submitting);
        info!(answers = payload.len(), "submitting answers");

        let submitted = self.service.submit_answers(&payload).await;

        let mut state = self.inner.lock().await;
        match submitted {
            Ok(result_id) => {
                info!(result_id = %result_id, "submission accepted");
                state.phase = FlowPhase::Completed(result_id.clone());
                self.emit(FlowEvent::Completed(ResultsLink::new(
                    &self.options.results_view_base,
                    result_id.clone(),
                )));
                Ok(Navigation::Completed(result_id))
            }
            Err(err) => {
                warn!(error = %err, "submission failed; answers kept for retry");
                state.phase = FlowPhase::Active;
                self.emit(FlowEvent::Notice(UserNotice {
                    kind: NoticeKind::SubmissionFailed,
                    message: SUBMIT_FAILED_MESSAGE.to_string(),
                    retryable: true,
                }));
                self.render(&state);
                self.arm_idle(&mut state);
                Err(FlowError::Submission(err))
            }
        }
    }

    /// Resets the idle timer for input that carries no flow action.
    pub async fn note_activity(self: &Arc<Self>) {
        let mut state = self.inner.lock().await;
        if state.phase == FlowPhase::Active {
            self.touch(&mut state);
        }
    }

    pub async fn dispatch(self: &Arc<Self>, input: FlowInput) -> Result<Navigation, FlowError> {
        match input {
            FlowInput::Answer(value) => self.answer(value).await.map(|()| Navigation::Stayed),
            FlowInput::Next => self.go_next().await,
            FlowInput::Prev => self.go_prev().await,
            FlowInput::Submit => self.submit().await,
            FlowInput::Activity => {
                self.note_activity().await;
                Ok(Navigation::Stayed)
            }
        }
    }

    /// Abandons pending timers, as when the player navigates away.
    pub async fn shutdown(&self) {
        let mut state = self.inner.lock().await;
        state.cancel_auto_advance();
        state.cancel_idle();
    }

    fn fail_load(&self, state: &mut FlowState, failure: LoadFailure) -> FlowError {
        warn!(error = %failure, "question load failed");
        state.phase = FlowPhase::Failed;
        self.emit(FlowEvent::Notice(UserNotice {
            kind: NoticeKind::LoadFailed,
            message: LOAD_FAILED_MESSAGE.to_string(),
            retryable: false,
        }));
        FlowError::Load(failure)
    }

    fn emit(&self, event: FlowEvent) {
        let _ = self.events.send(event);
    }

    fn render(&self, state: &FlowState) {
        if let Some(view) = question_view(&state.questions, &state.answers, state.cursor) {
            self.emit(FlowEvent::Render(view));
        }
    }

    fn touch(self: &Arc<Self>, state: &mut FlowState) {
        if state.stalled {
            state.stalled = false;
            self.emit(FlowEvent::Resumed);
        }
        self.arm_idle(state);
    }

    fn arm_idle(self: &Arc<Self>, state: &mut FlowState) {
        state.idle_epoch += 1;
        let epoch = state.idle_epoch;
        let controller = Arc::downgrade(self);
        state.idle = Some(ScheduledTask::after(
            self.options.idle_threshold,
            async move {
                if let Some(controller) = controller.upgrade() {
                    controller.on_idle(epoch).await;
                }
            },
        ));
    }

    fn schedule_auto_advance(self: &Arc<Self>, state: &mut FlowState) {
        state.cancel_auto_advance();
        let epoch = state.auto_advance_epoch;
        let controller: Weak<Self> = Arc::downgrade(self);
        state.auto_advance = Some(ScheduledTask::after(
            self.options.auto_advance_delay,
            async move {
                if let Some(controller) = controller.upgrade() {
                    controller.on_auto_advance(epoch).await;
                }
            },
        ));
    }

    async fn on_idle(&self, epoch: u64) {
        let mut state = self.inner.lock().await;
        if state.idle_epoch != epoch || state.phase != FlowPhase::Active {
            return;
        }
        if let Some(task) = state.idle.take() {
            task.detach();
        }
        state.stalled = true;
        debug!(cursor = state.cursor, "player idle");
        self.emit(FlowEvent::Stalled);
    }

    async fn on_auto_advance(self: Arc<Self>, epoch: u64) {
        {
            let mut state = self.inner.lock().await;
            if state.auto_advance_epoch != epoch || state.phase != FlowPhase::Active {
                return;
            }
            if let Some(task) = state.auto_advance.take() {
                task.detach();
            }

            if !state.is_last() {
                state.cursor += 1;
                debug!(cursor = state.cursor, "auto-advanced");
                self.render(&state);
                return;
            }

            self.render(&state);
            if !self.options.auto_submit || !state.answers.is_complete() {
                return;
            }
        }

        if let Err(err) = self.submit().await {
            debug!(error = %err, "automatic submission did not complete");
        }
    }
}

#[cfg(test)]
#[path = "tests/flow_tests.rs"]
mod tests;
