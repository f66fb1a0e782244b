//! Single-owner task driving a [`TrackTracker`].
//!
//! Position events and control commands are merged into one task, so path
//! order and distance accumulation never race. Commands are answered over
//! oneshot channels. Queued position events are drained before the next
//! command, so a `stop` never overtakes positions delivered ahead of it.

use futures::{Stream, StreamExt};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use super::error::{Result, TrackingError};
use super::source::PositionEvent;
use super::tracker::TrackTracker;
use super::types::{TrackSession, TrackerState, TrackingMode};

/// Capacity of the command channel.
const COMMAND_BUFFER: usize = 32;

/// Point-in-time view of the tracker.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackingStatus {
    /// Tracker state.
    pub state: TrackerState,
    /// Session in progress, if any.
    pub session: Option<TrackSession>,
}

enum Command {
    Start {
        mode: TrackingMode,
        reply: oneshot::Sender<Result<()>>,
    },
    StartEmergency {
        reply: oneshot::Sender<Result<()>>,
    },
    Pause {
        reply: oneshot::Sender<Result<()>>,
    },
    Resume {
        reply: oneshot::Sender<Result<()>>,
    },
    Stop {
        reply: oneshot::Sender<Result<TrackSession>>,
    },
    Status {
        reply: oneshot::Sender<TrackingStatus>,
    },
}

/// Handle to a running tracking task.
///
/// Dropping every handle shuts the task down.
#[derive(Debug, Clone)]
pub struct TrackingHandle {
    commands: mpsc::Sender<Command>,
}

impl TrackingHandle {
    /// Spawns the tracking task on the current Tokio runtime.
    ///
    /// Returns the handle and the task's join handle, which resolves to the
    /// tracker once every handle is dropped.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    pub fn spawn<S>(tracker: TrackTracker, events: S) -> (Self, JoinHandle<TrackTracker>)
    where
        S: Stream<Item = PositionEvent> + Send + Unpin + 'static,
    {
        let (commands, receiver) = mpsc::channel(COMMAND_BUFFER);
        let task = tokio::spawn(run(tracker, receiver, events));
        (Self { commands }, task)
    }

    /// Starts a session.
    ///
    /// # Errors
    ///
    /// Returns the tracker's error, or [`TrackingError::ActorClosed`].
    pub async fn start(&self, mode: TrackingMode) -> Result<()> {
        self.request(|reply| Command::Start { mode, reply }).await?
    }

    /// Starts an emergency session.
    ///
    /// # Errors
    ///
    /// Returns the tracker's error, or [`TrackingError::ActorClosed`].
    pub async fn start_emergency(&self) -> Result<()> {
        self.request(|reply| Command::StartEmergency { reply }).await?
    }

    /// Pauses the session.
    ///
    /// # Errors
    ///
    /// Returns the tracker's error, or [`TrackingError::ActorClosed`].
    pub async fn pause(&self) -> Result<()> {
        self.request(|reply| Command::Pause { reply }).await?
    }

    /// Resumes the session.
    ///
    /// # Errors
    ///
    /// Returns the tracker's error, or [`TrackingError::ActorClosed`].
    pub async fn resume(&self) -> Result<()> {
        self.request(|reply| Command::Resume { reply }).await?
    }

    /// Stops the session and returns it.
    ///
    /// # Errors
    ///
    /// Returns the tracker's error, or [`TrackingError::ActorClosed`].
    pub async fn stop(&self) -> Result<TrackSession> {
        self.request(|reply| Command::Stop { reply }).await?
    }

    /// Returns the current state and session.
    ///
    /// # Errors
    ///
    /// Returns [`TrackingError::ActorClosed`] if the task has exited.
    pub async fn status(&self) -> Result<TrackingStatus> {
        self.request(|reply| Command::Status { reply }).await
    }

    async fn request<T>(
        &self,
        command: impl FnOnce(oneshot::Sender<T>) -> Command,
    ) -> Result<T> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(command(reply))
            .await
            .map_err(|_| TrackingError::ActorClosed)?;
        response.await.map_err(|_| TrackingError::ActorClosed)
    }
}

async fn run<S>(
    mut tracker: TrackTracker,
    mut commands: mpsc::Receiver<Command>,
    mut events: S,
) -> TrackTracker
where
    S: Stream<Item = PositionEvent> + Unpin,
{
    let mut events_open = true;

    loop {
        tokio::select! {
            biased;

            event = events.next(), if events_open => match event {
                Some(event) => {
                    if let Err(e) = tracker.handle_event(&event) {
                        tracing::debug!(error = %e, "Ignoring position event");
                    }
                }
                None => {
                    tracing::debug!("Position event stream closed");
                    events_open = false;
                }
            },
            command = commands.recv() => match command {
                Some(command) => apply(&mut tracker, command),
                None => break,
            },
        }
    }

    tracing::debug!("Tracking task shut down");
    tracker
}

// A dropped reply receiver means the caller gave up waiting; nothing to do.
fn apply(tracker: &mut TrackTracker, command: Command) {
    match command {
        Command::Start { mode, reply } => {
            let _ = reply.send(tracker.start(mode));
        }
        Command::StartEmergency { reply } => {
            let _ = reply.send(tracker.start_emergency());
        }
        Command::Pause { reply } => {
            let _ = reply.send(tracker.pause());
        }
        Command::Resume { reply } => {
            let _ = reply.send(tracker.resume());
        }
        Command::Stop { reply } => {
            let _ = reply.send(tracker.stop());
        }
        Command::Status { reply } => {
            let _ = reply.send(TrackingStatus {
                state: tracker.state(),
                session: tracker.session().cloned(),
            });
        }
    }
}
