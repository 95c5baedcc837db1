// src/engine/actor.rs

use std::{sync::Arc, time::Duration};

use serde::Serialize;
use tokio::{
    sync::{broadcast, mpsc, oneshot},
    task::JoinHandle,
    time::Instant,
};
use uuid::Uuid;

use crate::{
    engine::{
        gateway::ReportGateway,
        session::{ExamSession, SessionSnapshot, SubmitTrigger, View},
        timer::{CountdownTimer, TimerEvent},
    },
    error::{SessionError, StoreError, SubmissionError},
    models::{
        exam::{Exam, TestCase},
        report::{Learner, Report},
    },
    runner::TestRunner,
    store::ExamStore,
};

const COMMAND_BUFFER: usize = 32;
const EVENT_BUFFER: usize = 64;

/// Collaborators shared by every session.
#[derive(Clone)]
pub struct SessionContext {
    pub gateway: ReportGateway,
    pub runner: Arc<dyn TestRunner>,
    /// Real time one countdown second takes.
    pub tick_period: Duration,
    /// A session with no running countdown and no pending submission closes
    /// after this long without activity.
    pub idle_timeout: Duration,
}

/// Published on every state change of a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum SessionEvent {
    ViewChanged { view: View },
    Tick { remaining: u64 },
    Expired,
    SubmissionStarted { trigger: SubmitTrigger },
    SubmissionSucceeded { report_id: i64 },
    SubmissionFailed { trigger: SubmitTrigger, message: String },
    /// Automatic submission after expiry could not be stored.
    AttemptLost { message: String },
}

type Reply<T> = oneshot::Sender<Result<T, SessionError>>;

enum Command {
    Snapshot(Reply<SessionSnapshot>),
    Begin(Reply<SessionSnapshot>),
    Next(Reply<SessionSnapshot>),
    Previous(Reply<SessionSnapshot>),
    Select { option: String, reply: Reply<SessionSnapshot> },
    TestCases(Reply<(usize, Vec<TestCase>)>),
    RecordRun { index: usize, outcomes: Vec<bool>, reply: Reply<SessionSnapshot> },
    Submit(Reply<Report>),
    Abandon,
}

/// Cheap handle to a running session. The session task stops, and its timer
/// with it, on `abandon`, once every handle is dropped, or after sitting idle
/// for `SessionContext::idle_timeout`.
#[derive(Clone)]
pub struct SessionHandle {
    id: Uuid,
    learner_id: i64,
    commands: mpsc::Sender<Command>,
    events: broadcast::Sender<SessionEvent>,
    runner: Arc<dyn TestRunner>,
}

impl SessionHandle {
    /// Loads the exam and starts a session for `learner`.
    pub async fn open(
        ctx: SessionContext,
        store: &dyn ExamStore,
        exam_id: i64,
        learner: Learner,
    ) -> Result<Self, SessionError> {
        let exam = store.fetch_exam(exam_id).await.map_err(|e| {
            tracing::warn!("Cannot open session for exam {}: {}", exam_id, e);
            SessionError::Load(e)
        })?;
        Ok(Self::spawn(ctx, exam, learner))
    }

    /// Starts a session on an already loaded exam.
    pub fn spawn(ctx: SessionContext, exam: Exam, learner: Learner) -> Self {
        let id = Uuid::new_v4();
        let learner_id = learner.id;
        let session = ExamSession::new(exam, learner, &mut rand::thread_rng());
        let (commands, rx) = mpsc::channel(COMMAND_BUFFER);
        let (events, _) = broadcast::channel(EVENT_BUFFER);

        tracing::info!(
            "Session {} opened: exam {} for learner {}",
            id,
            session.exam().id,
            learner_id
        );

        let actor = SessionActor {
            id,
            session,
            timer: CountdownTimer::new(ctx.tick_period),
            gateway: ctx.gateway,
            events: events.clone(),
            in_flight: None,
            idle_timeout: ctx.idle_timeout,
        };
        tokio::spawn(actor.run(rx));

        Self { id, learner_id, commands, events, runner: ctx.runner }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn learner_id(&self) -> i64 {
        self.learner_id
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    /// True once the session task has stopped.
    pub fn is_closed(&self) -> bool {
        self.commands.is_closed()
    }

    async fn request<T>(&self, make: impl FnOnce(Reply<T>) -> Command) -> Result<T, SessionError> {
        let (tx, rx) = oneshot::channel();
        self.commands
            .send(make(tx))
            .await
            .map_err(|_| SessionError::Closed)?;
        rx.await.map_err(|_| SessionError::Closed)?
    }

    pub async fn snapshot(&self) -> Result<SessionSnapshot, SessionError> {
        self.request(Command::Snapshot).await
    }

    /// Leaves the instructions and starts the countdown.
    pub async fn begin(&self) -> Result<SessionSnapshot, SessionError> {
        self.request(Command::Begin).await
    }

    pub async fn next(&self) -> Result<SessionSnapshot, SessionError> {
        self.request(Command::Next).await
    }

    pub async fn previous(&self) -> Result<SessionSnapshot, SessionError> {
        self.request(Command::Previous).await
    }

    pub async fn select_option(&self, option: &str) -> Result<SessionSnapshot, SessionError> {
        let option = option.to_string();
        self.request(|reply| Command::Select { option, reply }).await
    }

    /// Runs `source_code` against the current question's test cases and
    /// records the outcome for grading. The sandbox call happens outside the
    /// session task so the countdown keeps running meanwhile.
    pub async fn run_code(&self, source_code: &str) -> Result<SessionSnapshot, SessionError> {
        let (index, test_cases) = self.request(Command::TestCases).await?;
        let outcomes = self.runner.run_test_cases(source_code, &test_cases).await?;
        self.request(|reply| Command::RecordRun { index, outcomes, reply }).await
    }

    /// Manual submission. Resolves once the report is stored or storing failed.
    pub async fn submit(&self) -> Result<Report, SessionError> {
        self.request(Command::Submit).await
    }

    pub async fn abandon(&self) {
        let _ = self.commands.send(Command::Abandon).await;
    }
}

struct InFlight {
    trigger: SubmitTrigger,
    task: JoinHandle<Result<Report, SubmissionError>>,
    reply: Option<Reply<Report>>,
}

/// Sole owner of a session's state. Learner commands, timer events and
/// submission completions are handled one at a time.
struct SessionActor {
    id: Uuid,
    session: ExamSession,
    timer: CountdownTimer,
    gateway: ReportGateway,
    events: broadcast::Sender<SessionEvent>,
    in_flight: Option<InFlight>,
    idle_timeout: Duration,
}

async fn join_submission(slot: &mut Option<InFlight>) -> Result<Report, SubmissionError> {
    match slot.as_mut() {
        Some(in_flight) => match (&mut in_flight.task).await {
            Ok(outcome) => outcome,
            Err(e) => Err(SubmissionError(StoreError::Database(format!(
                "submission task failed: {}",
                e
            )))),
        },
        None => std::future::pending().await,
    }
}

impl SessionActor {
    async fn run(mut self, mut commands: mpsc::Receiver<Command>) {
        let mut idle_deadline = Instant::now() + self.idle_timeout;
        loop {
            let dormant = !self.timer.is_running() && self.in_flight.is_none();
            tokio::select! {
                command = commands.recv() => match command {
                    Some(Command::Abandon) | None => break,
                    Some(command) => self.handle(command),
                },
                event = self.timer.next_event() => self.on_timer(event),
                outcome = join_submission(&mut self.in_flight) => self.on_submission_finished(outcome),
                _ = tokio::time::sleep_until(idle_deadline), if dormant => {
                    tracing::info!("Session {} idle for {:?}, closing", self.id, self.idle_timeout);
                    break;
                }
            }
            idle_deadline = Instant::now() + self.idle_timeout;
        }

        self.timer.cancel();
        tracing::info!("Session {} closed in view {}", self.id, self.session.view().as_str());
    }

    fn publish(&self, event: SessionEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    fn handle(&mut self, command: Command) {
        match command {
            Command::Snapshot(reply) => {
                let _ = reply.send(Ok(self.session.snapshot()));
            }
            Command::Begin(reply) => {
                let outcome = match self.session.begin() {
                    Ok(duration) => {
                        if let Err(e) = self.timer.start(duration) {
                            tracing::warn!("Session {}: {}", self.id, e);
                        }
                        self.publish(SessionEvent::ViewChanged { view: View::Questions });
                        Ok(self.session.snapshot())
                    }
                    Err(e) => Err(e),
                };
                let _ = reply.send(outcome);
            }
            Command::Next(reply) => {
                let outcome = self.session.next().map(|_| self.session.snapshot());
                let _ = reply.send(outcome);
            }
            Command::Previous(reply) => {
                let outcome = self.session.previous().map(|_| self.session.snapshot());
                let _ = reply.send(outcome);
            }
            Command::Select { option, reply } => {
                let outcome = self.session.select_option(&option).map(|_| self.session.snapshot());
                let _ = reply.send(outcome);
            }
            Command::TestCases(reply) => {
                let _ = reply.send(self.session.current_test_cases());
            }
            Command::RecordRun { index, outcomes, reply } => {
                let outcome = self
                    .session
                    .record_run(index, outcomes)
                    .map(|_| self.session.snapshot());
                let _ = reply.send(outcome);
            }
            Command::Submit(reply) => {
                if let Err(e) = self.session.ensure_can_submit(SubmitTrigger::Manual) {
                    let _ = reply.send(Err(e));
                    return;
                }
                // No tick may land between grading and the result view.
                self.timer.cancel();
                self.start_submission(SubmitTrigger::Manual, Some(reply));
            }
            Command::Abandon => {}
        }
    }

    fn on_timer(&mut self, event: TimerEvent) {
        match event {
            TimerEvent::Tick(remaining) => {
                self.session.on_tick(remaining);
                self.publish(SessionEvent::Tick { remaining });
            }
            TimerEvent::Expired => {
                self.session.on_expired();
                self.publish(SessionEvent::Expired);

                match self.session.ensure_can_submit(SubmitTrigger::Expiry) {
                    Ok(()) => {
                        tracing::info!("Session {}: time is up, submitting", self.id);
                        self.start_submission(SubmitTrigger::Expiry, None);
                    }
                    Err(e) => tracing::debug!("Session {}: expiry ignored: {}", self.id, e),
                }
            }
        }
    }

    fn start_submission(&mut self, trigger: SubmitTrigger, reply: Option<Reply<Report>>) {
        let result = match self.session.prepare_submission(trigger) {
            Ok(result) => result,
            Err(e) => {
                if let Some(reply) = reply {
                    let _ = reply.send(Err(e));
                }
                return;
            }
        };

        self.publish(SessionEvent::SubmissionStarted { trigger });

        let gateway = self.gateway.clone();
        let exam_id = self.session.exam().id;
        let learner = self.session.learner().clone();
        let task = tokio::spawn(async move { gateway.submit(exam_id, learner, result).await });

        self.in_flight = Some(InFlight { trigger, task, reply });
    }

    fn on_submission_finished(&mut self, outcome: Result<Report, SubmissionError>) {
        let Some(in_flight) = self.in_flight.take() else {
            return;
        };

        let outcome = self.session.finish_submission(outcome);
        match &outcome {
            Ok(report) => {
                self.publish(SessionEvent::SubmissionSucceeded { report_id: report.id });
                self.publish(SessionEvent::ViewChanged { view: View::Result });
            }
            Err(e) => {
                let message = e.to_string();
                self.publish(SessionEvent::SubmissionFailed {
                    trigger: in_flight.trigger,
                    message: message.clone(),
                });
                if in_flight.trigger == SubmitTrigger::Expiry {
                    tracing::error!("Session {}: attempt lost, {}", self.id, message);
                    self.publish(SessionEvent::AttemptLost { message });
                } else {
                    tracing::warn!("Session {}: {}", self.id, message);
                }
            }
        }

        if let Some(reply) = in_flight.reply {
            let _ = reply.send(outcome);
        }
    }
}
