//! The lifecycle controller: one task that owns the countdown, the
//! fullscreen gate, the grace timer, the status poll and every submission.
//!
//! Everything that can end the session (timer expiry, a voluntary submit,
//! a violation decision, a server-side status) is funnelled into this loop,
//! so at most one submission call is in flight at any time. The shared
//! [`SubmissionLatch`] extends that guarantee to the arbiter, which decides
//! on other threads.

use std::future::pending;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, mpsc};
use tokio::time::{interval_at, sleep, Instant, Interval, MissedTickBehavior, Sleep};

use vigil_arbiter::{SubmissionLatch, ViolationArbiter};
use vigil_client::ExamBackend;
use vigil_face::FramePump;
use vigil_types::{Answer, AnswerRecord, Question, SessionId, SessionStatus, TerminationDecision};

use crate::events::{
    EndedBy, LifecycleState, SessionEvent, SessionOutcome, SERVER_TERMINATED_REASON,
    TIME_EXPIRED_REASON,
};
use crate::surface::SessionSurface;
use crate::timer::{format_countdown, ExamTimer, TimerTick};
use crate::{SessionConfig, ShutdownCause};

const CLOCK_PERIOD: Duration = Duration::from_secs(1);

/// Requests from the host and from the arbiter.
#[derive(Debug)]
pub(crate) enum Command {
    FullscreenEntered,
    FullscreenFailed(String),
    Submit,
    Terminate(TerminationDecision),
    RecordAnswer { question_id: String, answer: Answer },
    AcknowledgeMessage,
}

#[derive(Debug)]
enum SubmitTrigger {
    Voluntary,
    TimeExpired,
    Violation(TerminationDecision),
}

enum Flow {
    Continue,
    Done,
}

pub(crate) struct SessionController {
    session_id: SessionId,
    config: SessionConfig,
    backend: Arc<dyn ExamBackend>,
    arbiter: Arc<ViolationArbiter>,
    latch: Arc<SubmissionLatch>,
    surface: Arc<SessionSurface>,
    questions: Vec<Question>,
    answers: AnswerRecord,
    timer: ExamTimer,
    clock: Option<Interval>,
    grace: Option<Pin<Box<Sleep>>>,
    last_message: Option<String>,
    pump: Option<FramePump>,
}

impl SessionController {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        session_id: SessionId,
        config: SessionConfig,
        backend: Arc<dyn ExamBackend>,
        arbiter: Arc<ViolationArbiter>,
        latch: Arc<SubmissionLatch>,
        surface: Arc<SessionSurface>,
        questions: Vec<Question>,
        answers: AnswerRecord,
        pump: Option<FramePump>,
    ) -> Self {
        let timer = ExamTimer::new(config.exam_duration_secs);
        Self {
            session_id,
            config,
            backend,
            arbiter,
            latch,
            surface,
            questions,
            answers,
            timer,
            clock: None,
            grace: None,
            last_message: None,
            pump,
        }
    }

    pub(crate) async fn run(
        mut self,
        mut commands: mpsc::UnboundedReceiver<Command>,
        mut shutdown: broadcast::Receiver<ShutdownCause>,
    ) {
        let period = self.config.poll_interval();
        let mut poll = interval_at(Instant::now() + period, period);
        poll.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            let flow = tokio::select! {
                biased;
                cause = shutdown.recv() => {
                    let cause = cause.map_or("closed", |c| c.as_str());
                    tracing::info!(session = %self.session_id, cause, "session controller shutting down");
                    break;
                }
                cmd = commands.recv() => match cmd {
                    Some(cmd) => self.handle_command(cmd).await,
                    None => break,
                },
                _ = next_tick(&mut self.clock) => self.on_clock().await,
                _ = grace_elapsed(&mut self.grace) => self.on_grace_elapsed(),
                _ = poll.tick() => self.poll_status().await,
            };
            if let Flow::Done = flow {
                break;
            }
        }

        self.teardown().await;
    }

    async fn handle_command(&mut self, cmd: Command) -> Flow {
        let state = self.surface.state();
        match cmd {
            Command::FullscreenEntered => {
                match state {
                    LifecycleState::AwaitingFullscreen => self.start_running(),
                    // Back in fullscreen after a failed submit; start a fresh
                    // grace window unless one is pending or already elapsed.
                    LifecycleState::Running
                        if self.grace.is_none() && !self.arbiter.is_armed() =>
                    {
                        self.grace = Some(Box::pin(sleep(self.config.grace_period())));
                    }
                    _ => tracing::debug!(state = state.as_str(), "fullscreen entry ignored"),
                }
                Flow::Continue
            }
            Command::FullscreenFailed(error) => {
                if state == LifecycleState::AwaitingFullscreen {
                    tracing::warn!(error = %error, "fullscreen request refused");
                    self.surface.emit(SessionEvent::FullscreenRejected(error));
                }
                Flow::Continue
            }
            Command::Submit => {
                if state != LifecycleState::Running {
                    tracing::debug!(state = state.as_str(), "submit ignored");
                    return Flow::Continue;
                }
                self.execute_submit(SubmitTrigger::Voluntary).await
            }
            Command::Terminate(decision) => {
                if state.is_terminal() {
                    return Flow::Continue;
                }
                self.execute_submit(SubmitTrigger::Violation(decision)).await
            }
            Command::RecordAnswer {
                question_id,
                answer,
            } => {
                self.record_answer(state, question_id, answer);
                Flow::Continue
            }
            Command::AcknowledgeMessage => {
                if let Err(e) = self.backend.acknowledge_message(&self.session_id).await {
                    tracing::warn!(error = %e, "failed to acknowledge proctor message");
                }
                Flow::Continue
            }
        }
    }

    fn start_running(&mut self) {
        self.surface.set_state(LifecycleState::Running);
        self.clock = Some(one_second_clock());
        self.grace = Some(Box::pin(sleep(self.config.grace_period())));
        tracing::info!(
            remaining = %format_countdown(self.timer.remaining_secs()),
            grace_ms = self.config.grace_period_ms,
            "exam running"
        );
    }

    fn record_answer(&mut self, state: LifecycleState, question_id: String, answer: Answer) {
        if !matches!(
            state,
            LifecycleState::AwaitingFullscreen | LifecycleState::Running
        ) {
            tracing::debug!(state = state.as_str(), question = %question_id, "answer ignored");
            return;
        }
        match self.questions.iter().find(|q| q.id == question_id) {
            Some(question) if question.accepts(&answer) => self.answers.set(question_id, answer),
            Some(_) => tracing::warn!(question = %question_id, "answer has the wrong shape, ignored"),
            None => tracing::warn!(question = %question_id, "answer for unknown question, ignored"),
        }
    }

    async fn on_clock(&mut self) -> Flow {
        if self.surface.state() != LifecycleState::Running {
            return Flow::Continue;
        }
        match self.timer.tick() {
            TimerTick::Running(remaining) => {
                self.publish_remaining(remaining);
                Flow::Continue
            }
            TimerTick::Expired => {
                self.publish_remaining(0);
                tracing::warn!(session = %self.session_id, "exam time expired");
                self.execute_submit(SubmitTrigger::TimeExpired).await
            }
            TimerTick::Idle => Flow::Continue,
        }
    }

    fn publish_remaining(&self, remaining: u64) {
        self.surface
            .metrics
            .time_remaining_seconds
            .set(i64::try_from(remaining).unwrap_or(i64::MAX));
        self.surface.emit(SessionEvent::Tick {
            remaining_secs: remaining,
            display: format_countdown(remaining),
        });
    }

    fn on_grace_elapsed(&mut self) -> Flow {
        self.grace = None;
        if self.surface.state() == LifecycleState::Running {
            self.arbiter.arm();
        }
        Flow::Continue
    }

    /// The single submission path. Every trigger goes through the latch, so
    /// concurrent triggers collapse into one backend call.
    async fn execute_submit(&mut self, trigger: SubmitTrigger) -> Flow {
        let acquired = match &trigger {
            // The arbiter already holds the latch for this one.
            SubmitTrigger::Violation(_) => true,
            SubmitTrigger::TimeExpired => {
                self.arbiter.force_terminate(TIME_EXPIRED_REASON).is_some()
            }
            SubmitTrigger::Voluntary => self.latch.try_acquire(),
        };
        if !acquired {
            tracing::debug!(?trigger, "submission already under way, trigger collapsed");
            return Flow::Continue;
        }

        // The submit flow leaves fullscreen on its own; that must not read
        // as a violation.
        self.arbiter.disarm();
        self.clock = None;
        self.grace = None;
        self.surface.set_state(LifecycleState::Submitting);

        if let SubmitTrigger::Voluntary = trigger {
            sleep(self.config.voluntary_submit_delay()).await;
        }

        self.surface.metrics.submissions.inc();
        tracing::info!(session = %self.session_id, answers = self.answers.len(), ?trigger, "submitting answers");
        let result = self
            .backend
            .submit_answers(&self.session_id, &self.answers)
            .await;
        if let Err(e) = &result {
            self.surface.metrics.submission_failures.inc();
            tracing::warn!(session = %self.session_id, error = %e, "submission failed");
        }

        match trigger {
            SubmitTrigger::Voluntary => match result {
                Ok(result) => {
                    self.arbiter.finish();
                    self.finish(SessionOutcome {
                        state: LifecycleState::Completed,
                        ended_by: EndedBy::Candidate,
                        reason: None,
                        result: Some(result),
                    })
                }
                Err(e) => {
                    self.latch.release();
                    self.surface.emit(SessionEvent::SubmitFailed(e.to_string()));
                    self.surface.set_state(LifecycleState::Running);
                    self.clock = Some(one_second_clock());
                    // The submit flow left fullscreen; arming waits for the
                    // host to confirm fullscreen again.
                    Flow::Continue
                }
            },
            SubmitTrigger::TimeExpired => {
                self.arbiter.finish();
                self.finish(SessionOutcome {
                    state: LifecycleState::Completed,
                    ended_by: EndedBy::TimeExpired,
                    reason: Some(TIME_EXPIRED_REASON.to_string()),
                    result: result.ok(),
                })
            }
            SubmitTrigger::Violation(decision) => {
                self.arbiter.finish();
                self.finish(SessionOutcome {
                    state: LifecycleState::Terminated,
                    ended_by: EndedBy::Violation,
                    reason: Some(decision.reason),
                    result: result.ok(),
                })
            }
        }
    }

    async fn poll_status(&mut self) -> Flow {
        let report = match self.backend.poll_session_status(&self.session_id).await {
            Ok(report) => report,
            Err(e) => {
                self.surface.metrics.poll_failures.inc();
                tracing::warn!(session = %self.session_id, error = %e, "status poll failed");
                return Flow::Continue;
            }
        };

        if let Some(message) = report.unread_message() {
            if self.last_message.as_deref() != Some(message) {
                tracing::info!("new proctor message");
                self.last_message = Some(message.to_string());
                self.surface
                    .emit(SessionEvent::ProctorMessage(message.to_string()));
            }
        }

        let state = match report.status {
            SessionStatus::Terminated => LifecycleState::Terminated,
            SessionStatus::Completed => LifecycleState::Completed,
            _ => return Flow::Continue,
        };
        tracing::warn!(session = %self.session_id, status = ?report.status, "session ended by server");
        // Claim the latch so no late trigger submits behind the server's back.
        let _ = self.latch.try_acquire();
        self.arbiter.finish();
        let reason = match state {
            LifecycleState::Terminated => Some(
                report
                    .termination_reason
                    .unwrap_or_else(|| SERVER_TERMINATED_REASON.to_string()),
            ),
            _ => report.termination_reason,
        };
        self.finish(SessionOutcome {
            state,
            ended_by: EndedBy::Server,
            reason,
            result: None,
        })
    }

    fn finish(&mut self, outcome: SessionOutcome) -> Flow {
        self.clock = None;
        self.grace = None;
        self.surface.finish(outcome);
        Flow::Done
    }

    async fn teardown(&mut self) {
        if let Some(mut pump) = self.pump.take() {
            pump.stop().await;
        }
        // Page exit mid-exam: nothing may terminate or submit from here on.
        self.arbiter.finish();
        tracing::debug!(session = %self.session_id, "session controller stopped");
    }
}

fn one_second_clock() -> Interval {
    let mut clock = interval_at(Instant::now() + CLOCK_PERIOD, CLOCK_PERIOD);
    clock.set_missed_tick_behavior(MissedTickBehavior::Delay);
    clock
}

async fn next_tick(clock: &mut Option<Interval>) {
    match clock {
        Some(clock) => {
            clock.tick().await;
        }
        None => pending().await,
    }
}

async fn grace_elapsed(grace: &mut Option<Pin<Box<Sleep>>>) {
    match grace {
        Some(deadline) => deadline.as_mut().await,
        None => pending().await,
    }
}
