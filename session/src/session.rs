//! [`ProctorSession`]: one proctored exam attempt, assembled and running.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;

use vigil_arbiter::{ArbiterState, SubmissionLatch, ViolationArbiter};
use vigil_client::{ExamBackend, SessionRecord};
use vigil_face::{
    analyze, Camera, EstimatorOptions, FaceAnalyzer, FramePump, LandmarkEstimator,
    LandmarkResult, ResultCallback, VideoSource,
};
use vigil_security::{BrowserEvent, Disposition, MonitorOutcome, SecurityMonitor};
use vigil_types::{
    Answer, FacePoseSignal, FaceStatus, Question, SessionId, SessionStatus, TerminationDecision,
};

use crate::controller::{Command, SessionController};
use crate::events::{EndedBy, LifecycleState, SessionEvent, SessionOutcome};
use crate::sinks::{BackendAuditSink, ControllerSink};
use crate::surface::SessionSurface;
use crate::{ProctorMetrics, SessionConfig, SessionError, ShutdownCause, ShutdownController};

const STOP_TIMEOUT: Duration = Duration::from_secs(5);

/// Camera and landmark model for local face monitoring.
pub struct FaceInputs {
    pub camera: Arc<dyn Camera>,
    pub estimator: Arc<dyn LandmarkEstimator>,
}

/// Routes face-pose signals to the arbiter and the status display.
struct FaceRouter {
    arbiter: Arc<ViolationArbiter>,
    surface: Arc<SessionSurface>,
    shown: Mutex<Option<(FaceStatus, String)>>,
}

impl FaceRouter {
    fn route(&self, signal: FacePoseSignal) {
        {
            // The display only needs changes, not every frame.
            let mut shown = self.shown.lock();
            let current = (signal.status, signal.message.clone());
            if shown.as_ref() != Some(&current) {
                *shown = Some(current);
                self.surface.emit(SessionEvent::FaceStatus(signal.clone()));
            }
        }
        if let Some(violation) = signal.to_violation() {
            let verdict = self.arbiter.report_violation(violation);
            self.surface.metrics.observe_verdict(&verdict);
        }
    }
}

/// A running exam attempt.
///
/// Owns the violation arbiter, the security monitor, the optional frame pump
/// and the lifecycle controller task. Host input goes in through the
/// methods; everything to render comes out through [`subscribe`].
///
/// [`subscribe`]: ProctorSession::subscribe
pub struct ProctorSession {
    session_id: SessionId,
    config: SessionConfig,
    exam_title: String,
    questions: Vec<Question>,
    arbiter: Arc<ViolationArbiter>,
    monitor: SecurityMonitor,
    faces: Arc<FaceRouter>,
    surface: Arc<SessionSurface>,
    commands: mpsc::UnboundedSender<Command>,
    shutdown: ShutdownController,
    controller: Option<JoinHandle<()>>,
    degraded: Option<String>,
}

impl ProctorSession {
    /// Load the session and start monitoring.
    ///
    /// On success the session is in `AwaitingFullscreen`, or already terminal
    /// when the backend reports the attempt as finished. A denied camera is
    /// fatal. A model that fails to load degrades to security-event
    /// monitoring unless `require_face_model` is set.
    pub async fn launch(
        session_id: SessionId,
        config: SessionConfig,
        backend: Arc<dyn ExamBackend>,
        face: Option<FaceInputs>,
    ) -> Result<Self, SessionError> {
        config.validate()?;

        let metrics = Arc::new(ProctorMetrics::new());
        let surface = Arc::new(SessionSurface::new(metrics));
        let (commands, commands_rx) = mpsc::unbounded_channel();
        let latch = Arc::new(SubmissionLatch::new());
        let arbiter = Arc::new(ViolationArbiter::new(
            Arc::clone(&latch),
            Arc::new(ControllerSink::new(commands.clone())),
            Arc::new(BackendAuditSink::new(
                Arc::clone(&backend),
                session_id.clone(),
                Handle::current(),
            )),
        ));
        let faces = Arc::new(FaceRouter {
            arbiter: Arc::clone(&arbiter),
            surface: Arc::clone(&surface),
            shown: Mutex::new(None),
        });

        tracing::info!(session = %session_id, "loading exam session");
        let record = backend.fetch_session_by_id(&session_id).await?;

        let mut session = Self {
            session_id: session_id.clone(),
            config: config.clone(),
            exam_title: record.exam_title.clone(),
            questions: Vec::new(),
            monitor: SecurityMonitor::new(Arc::clone(&arbiter)),
            arbiter: Arc::clone(&arbiter),
            faces,
            surface: Arc::clone(&surface),
            commands,
            shutdown: ShutdownController::new(),
            controller: None,
            degraded: None,
        };

        if record.status.is_terminal() {
            tracing::info!(session = %session_id, status = ?record.status, "session already finished");
            let _ = latch.try_acquire();
            arbiter.finish();
            let state = match record.status {
                SessionStatus::Terminated => LifecycleState::Terminated,
                _ => LifecycleState::Completed,
            };
            surface.finish(SessionOutcome {
                state,
                ended_by: EndedBy::Server,
                reason: record.termination_reason,
                result: None,
            });
            return Ok(session);
        }

        let answers = record.answers.clone();
        session.questions = load_questions(backend.as_ref(), record).await?;
        tracing::info!(
            session = %session_id,
            questions = session.questions.len(),
            restored_answers = answers.len(),
            "exam loaded"
        );

        let pump = match face {
            Some(inputs) => session.start_face_monitoring(inputs).await?,
            None => {
                tracing::info!("no local camera, face signals come from the host");
                None
            }
        };

        surface.set_state(LifecycleState::AwaitingFullscreen);
        let controller = SessionController::new(
            session_id,
            config,
            backend,
            arbiter,
            latch,
            surface,
            session.questions.clone(),
            answers,
            pump,
        );
        session.controller = Some(tokio::spawn(
            controller.run(commands_rx, session.shutdown.subscribe()),
        ));
        Ok(session)
    }

    async fn start_face_monitoring(
        &mut self,
        inputs: FaceInputs,
    ) -> Result<Option<FramePump>, SessionError> {
        let source = inputs
            .camera
            .open()
            .await
            .map_err(|e| SessionError::CameraUnavailable(e.to_string()))?;

        let analyzer = FaceAnalyzer::new(
            inputs.estimator,
            self.config.thresholds,
            EstimatorOptions::default(),
        );
        let faces = Arc::clone(&self.faces);
        let callback: ResultCallback = Arc::new(move |signal| faces.route(signal));

        match analyzer.initialize(callback).await {
            Ok(()) => Ok(Some(FramePump::start(
                source,
                analyzer,
                self.config.refresh_hz,
            ))),
            Err(e) => {
                source.stop();
                analyzer.dispose();
                if self.config.require_face_model {
                    return Err(SessionError::Face(e));
                }
                tracing::warn!(error = %e, "face model unavailable, monitoring browser events only");
                let reason = e.to_string();
                self.surface
                    .emit(SessionEvent::MonitoringDegraded(reason.clone()));
                self.degraded = Some(reason);
                Ok(None)
            }
        }
    }

    /// Report the outcome of the host's fullscreen request.
    pub fn enter_fullscreen(&self, result: Result<(), String>) -> Result<(), SessionError> {
        self.send(match result {
            Ok(()) => Command::FullscreenEntered,
            Err(e) => Command::FullscreenFailed(e),
        })
    }

    /// Classify a browser event. The host must suppress the event's default
    /// action when the outcome says so.
    pub fn handle_browser_event(&self, event: BrowserEvent) -> MonitorOutcome {
        let outcome = self.monitor.handle(event);
        let metrics = &self.surface.metrics;
        match &outcome.disposition {
            Disposition::Ignored => {}
            Disposition::Warned(signal) => {
                metrics.soft_warnings.inc();
                self.surface.emit(SessionEvent::Warning {
                    reason: signal.reason.clone(),
                    display_secs: self.config.warning_display_secs,
                });
            }
            Disposition::Discarded(_) => {
                metrics.hard_signals.inc();
                metrics.discarded_signals.inc();
            }
            Disposition::Forwarded(verdict) => metrics.observe_verdict(verdict),
        }
        outcome
    }

    /// Feed one face-pose signal computed elsewhere.
    pub fn handle_face_signal(&self, signal: FacePoseSignal) {
        self.faces.route(signal);
    }

    /// Classify raw landmark output with the configured thresholds and feed
    /// the result.
    pub fn handle_landmarks(&self, result: &LandmarkResult) -> FacePoseSignal {
        let signal = analyze(result, &self.config.thresholds);
        self.faces.route(signal.clone());
        signal
    }

    pub fn record_answer(
        &self,
        question_id: impl Into<String>,
        answer: Answer,
    ) -> Result<(), SessionError> {
        self.send(Command::RecordAnswer {
            question_id: question_id.into(),
            answer,
        })
    }

    /// Voluntary submission.
    pub fn submit(&self) -> Result<(), SessionError> {
        self.send(Command::Submit)
    }

    pub fn acknowledge_message(&self) -> Result<(), SessionError> {
        self.send(Command::AcknowledgeMessage)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.surface.subscribe()
    }

    /// Events describing where the session stands right now, for a host that
    /// subscribed after launch.
    pub fn snapshot(&self) -> Vec<SessionEvent> {
        let mut events = vec![SessionEvent::StateChanged(self.state())];
        if let Some(reason) = &self.degraded {
            events.push(SessionEvent::MonitoringDegraded(reason.clone()));
        }
        if let Some(outcome) = self.outcome() {
            events.push(SessionEvent::Finished(outcome));
        }
        events
    }

    pub fn state(&self) -> LifecycleState {
        self.surface.state()
    }

    pub fn arbiter_state(&self) -> ArbiterState {
        self.arbiter.state()
    }

    /// The decision that ended the session, if a violation or the clock did.
    pub fn termination_decision(&self) -> Option<TerminationDecision> {
        self.arbiter.decision().cloned()
    }

    pub fn outcome(&self) -> Option<SessionOutcome> {
        self.surface.outcome().cloned()
    }

    /// Resolves once the session is `Completed` or `Terminated`.
    pub async fn wait_until_finished(&self) -> LifecycleState {
        let mut state = self.surface.watch_state();
        let finished = match state.wait_for(LifecycleState::is_terminal).await {
            Ok(terminal) => *terminal,
            Err(_) => self.state(),
        };
        finished
    }

    pub fn metrics(&self) -> &ProctorMetrics {
        &self.surface.metrics
    }

    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    pub fn exam_title(&self) -> &str {
        &self.exam_title
    }

    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    /// Why face monitoring is off, if it is.
    pub fn monitoring_degraded(&self) -> Option<&str> {
        self.degraded.as_deref()
    }

    /// Page exit: stop the controller, the camera and the model. Nothing is
    /// submitted.
    pub async fn shutdown(mut self) {
        self.shutdown.shutdown(ShutdownCause::PageExit);
        if let Some(handle) = self.controller.take() {
            match tokio::time::timeout(STOP_TIMEOUT, handle).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => tracing::warn!(error = %e, "session controller task failed"),
                Err(_) => tracing::warn!("session controller did not stop in time"),
            }
        }
        self.arbiter.finish();
    }

    fn send(&self, command: Command) -> Result<(), SessionError> {
        self.commands
            .send(command)
            .map_err(|_| SessionError::AlreadyTerminal)
    }
}

impl Drop for ProctorSession {
    fn drop(&mut self) {
        self.shutdown.shutdown(ShutdownCause::PageExit);
    }
}

/// Questions from the session, or from its question paper when the session
/// carries none.
async fn load_questions(
    backend: &dyn ExamBackend,
    record: SessionRecord,
) -> Result<Vec<Question>, SessionError> {
    if !record.questions.is_empty() {
        return Ok(record.questions);
    }
    match record.question_paper_id {
        Some(paper_id) => {
            let paper = backend.fetch_question_paper(&paper_id).await?;
            tracing::debug!(paper = %paper_id, title = %paper.title, "questions loaded from paper");
            Ok(paper.questions)
        }
        None => Ok(Vec::new()),
    }
}
