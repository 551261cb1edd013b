// src/session/runtime.rs

//! Drives a [`SessionController`] on a tokio task.
//!
//! One task per session. It waits on four sources (intents from the
//! handle, the 1 s countdown interval, the grace sleep, and the background
//! submission) and feeds whichever fires first into the controller, one
//! event at a time. The effects returned by the controller are the only
//! place timers are created or dropped.

use std::pin::Pin;
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, Interval, Sleep, interval_at, sleep};
use tracing::Instrument;

use crate::session::{
    Capability, SessionError,
    controller::{DispatchStatus, Effect, Notice, PhaseKind, SessionController, SessionEvent, SessionSnapshot},
    integrity::{GRACE_PERIOD, GraceToken},
    participant::Participant,
    store::{QuizStore, StoreError},
    submission::Trigger,
    timer::TICK,
};

const COMMAND_BUFFER: usize = 32;

struct Command {
    event: SessionEvent,
    reply: oneshot::Sender<Result<(), SessionError>>,
}

/// Entry point for starting an attempt.
pub struct Session;

impl Session {
    /// Fetches the quiz and spawns the session task.
    ///
    /// A failed fetch returns `QuizUnavailable` and leaves nothing running.
    pub async fn open(
        store: Arc<dyn QuizStore>,
        quiz_id: i64,
        capability: Capability,
    ) -> Result<SessionHandle, SessionError> {
        let quiz = store.fetch_quiz(quiz_id).await.map_err(|err| {
            tracing::error!(quiz_id, error = %err, "failed to load quiz");
            SessionError::QuizUnavailable(err)
        })?;

        let mut controller = SessionController::new(capability);
        controller.handle(SessionEvent::QuizLoaded(quiz))?;
        tracing::info!(quiz_id, phase = ?controller.phase(), "session opened");

        let (command_tx, command_rx) = mpsc::channel(COMMAND_BUFFER);
        let (snapshot_tx, snapshot_rx) = watch::channel(controller.snapshot());
        let (notice_tx, notice_rx) = mpsc::unbounded_channel();

        let span = tracing::info_span!("session", quiz_id);
        let task = tokio::spawn(
            run(controller, store, command_rx, snapshot_tx, notice_tx).instrument(span),
        );

        Ok(SessionHandle {
            commands: command_tx,
            snapshots: snapshot_rx,
            notices: notice_rx,
            task,
        })
    }
}

/// The presentation layer's side of a session: intents in, state out.
///
/// Dropping the handle abandons the attempt. A submission already in
/// flight still completes.
pub struct SessionHandle {
    commands: mpsc::Sender<Command>,
    snapshots: watch::Receiver<SessionSnapshot>,
    notices: mpsc::UnboundedReceiver<Notice>,
    task: JoinHandle<()>,
}

impl SessionHandle {
    pub fn snapshot(&self) -> SessionSnapshot {
        self.snapshots.borrow().clone()
    }

    /// A receiver that observes every published snapshot.
    pub fn watch(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshots.clone()
    }

    pub async fn begin(&self, participant: Participant) -> Result<(), SessionError> {
        self.send(SessionEvent::Begin(participant)).await
    }

    pub async fn select_option(&self, value: impl Into<String>) -> Result<(), SessionError> {
        self.send(SessionEvent::SelectOption(value.into())).await
    }

    pub async fn submit_answer(&self) -> Result<(), SessionError> {
        self.send(SessionEvent::SubmitAnswer).await
    }

    pub async fn advance(&self) -> Result<(), SessionError> {
        self.send(SessionEvent::Advance).await
    }

    pub async fn force_submit(&self, reason: Trigger) -> Result<(), SessionError> {
        self.send(SessionEvent::ForceSubmit(reason)).await
    }

    /// Forwards a page visibility change.
    pub async fn set_visibility(&self, hidden: bool) -> Result<(), SessionError> {
        self.send(SessionEvent::VisibilityChanged { hidden }).await
    }

    pub async fn next_notice(&mut self) -> Option<Notice> {
        self.notices.recv().await
    }

    /// Drains notices that are already queued.
    pub fn pending_notices(&mut self) -> Vec<Notice> {
        let mut notices = Vec::new();
        while let Ok(notice) = self.notices.try_recv() {
            notices.push(notice);
        }
        notices
    }

    /// Waits until the attempt is completed and its submission has settled.
    pub async fn settled(&self) -> SessionSnapshot {
        let mut rx = self.snapshots.clone();
        let _ = rx
            .wait_for(|s| {
                s.phase == PhaseKind::Completed && s.dispatch != Some(DispatchStatus::Pending)
            })
            .await;
        self.snapshot()
    }

    /// Whether the session task has exited.
    pub fn is_closed(&self) -> bool {
        self.task.is_finished()
    }

    /// Sends an event and waits until the session task has applied it.
    async fn send(&self, event: SessionEvent) -> Result<(), SessionError> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(Command { event, reply })
            .await
            .map_err(|_| SessionError::Closed)?;
        response.await.map_err(|_| SessionError::Closed)?
    }
}

enum Wake {
    Command(Command),
    HandlesDropped,
    Tick,
    GraceElapsed(GraceToken),
    DispatchSettled(Result<(), String>),
}

async fn run(
    mut controller: SessionController,
    store: Arc<dyn QuizStore>,
    mut commands: mpsc::Receiver<Command>,
    snapshots: watch::Sender<SessionSnapshot>,
    notices: mpsc::UnboundedSender<Notice>,
) {
    let mut countdown: Option<Interval> = None;
    let mut grace: Option<(GraceToken, Pin<Box<Sleep>>)> = None;
    let mut dispatch: Option<JoinHandle<Result<(), StoreError>>> = None;

    loop {
        let wake = tokio::select! {
            biased;
            command = commands.recv() => match command {
                Some(command) => Wake::Command(command),
                None => Wake::HandlesDropped,
            },
            _ = next_tick(&mut countdown) => Wake::Tick,
            token = grace_elapsed(&mut grace) => Wake::GraceElapsed(token),
            result = dispatch_settled(&mut dispatch) => Wake::DispatchSettled(result),
        };

        let (event, reply) = match wake {
            Wake::Command(Command { event, reply }) => (event, Some(reply)),
            Wake::HandlesDropped => {
                tracing::info!(phase = ?controller.phase(), "session abandoned");
                break;
            }
            Wake::Tick => (SessionEvent::Tick, None),
            Wake::GraceElapsed(token) => {
                grace = None;
                (SessionEvent::GraceElapsed(token), None)
            }
            Wake::DispatchSettled(result) => {
                dispatch = None;
                (SessionEvent::DispatchSettled(result), None)
            }
        };

        let outcome = controller.handle(event).map(|effects| {
            for effect in effects {
                match effect {
                    Effect::StartCountdown => {
                        countdown = Some(interval_at(Instant::now() + TICK, TICK));
                    }
                    Effect::StopCountdown => countdown = None,
                    Effect::ArmGrace(token) => {
                        grace = Some((token, Box::pin(sleep(GRACE_PERIOD))));
                    }
                    Effect::CancelGrace => grace = None,
                    Effect::Dispatch(record) => {
                        let store = Arc::clone(&store);
                        dispatch = Some(tokio::spawn(
                            async move { store.submit_result(&record).await }.in_current_span(),
                        ));
                    }
                    Effect::Notify(notice) => {
                        // The receiver is gone only if the handle was dropped.
                        let _ = notices.send(notice);
                    }
                }
            }
        });

        snapshots.send_replace(controller.snapshot());
        if let Some(reply) = reply {
            let _ = reply.send(outcome);
        }

        if controller.is_settled() {
            tracing::debug!("session settled");
            break;
        }
    }
}

async fn next_tick(countdown: &mut Option<Interval>) {
    match countdown {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending().await,
    }
}

async fn grace_elapsed(grace: &mut Option<(GraceToken, Pin<Box<Sleep>>)>) -> GraceToken {
    match grace {
        Some((token, sleep)) => {
            sleep.as_mut().await;
            *token
        }
        None => std::future::pending().await,
    }
}

async fn dispatch_settled(
    dispatch: &mut Option<JoinHandle<Result<(), StoreError>>>,
) -> Result<(), String> {
    match dispatch {
        Some(handle) => match handle.await {
            Ok(result) => result.map_err(|err| err.to_string()),
            Err(err) => Err(err.to_string()),
        },
        None => std::future::pending().await,
    }
}
