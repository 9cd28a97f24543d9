//! The per-user reconciliation session.
//!
//! A session is the explicit context object for one identified user: it owns
//! the polling task, the local board snapshot, and the command channel for
//! user actions. Before a session exists the client is anonymous and nothing
//! polls; shutting the session down cancels the timer and awaits the poll
//! task's exit, so no fetch ever runs against a stale identity.

use std::time::Duration;

use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

use super::{ApiClient, ClientError};
use crate::api::types::TaskView;
use crate::lifecycle::TaskAction;

/// Fixed polling interval of the observed contract. Not configurable.
pub const POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Local last-fetch-wins copies of both server views.
#[derive(Debug, Clone, Default)]
pub struct BoardSnapshot {
    /// Fetch sequence that produced this snapshot.
    pub seq: u64,
    /// The unclaimed queue.
    pub queue: Vec<TaskView>,
    /// This user's kept/running/completed tasks.
    pub mine: Vec<TaskView>,
}

enum Command {
    Act {
        action: TaskAction,
        task_id: i64,
        respond: oneshot::Sender<Result<TaskView, ClientError>>,
    },
}

/// Handle to a running session (the IDENTIFIED state).
pub struct Session {
    username: String,
    cmd_tx: mpsc::Sender<Command>,
    snapshot_rx: watch::Receiver<BoardSnapshot>,
    shutdown_tx: watch::Sender<bool>,
    handle: Option<JoinHandle<()>>,
}

impl Session {
    /// Enter the identified state: fetch both views immediately, then keep
    /// polling every [`POLL_INTERVAL`] until [`Session::shutdown`].
    pub fn start(api: ApiClient, username: impl Into<String>) -> Self {
        let username = username.into();
        let (cmd_tx, mut cmd_rx) = mpsc::channel::<Command>(16);
        let (snapshot_tx, snapshot_rx) = watch::channel(BoardSnapshot::default());
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);

        let mut worker = Worker {
            api,
            username: username.clone(),
            next_seq: 0,
            snapshots: SnapshotCell {
                last_applied: 0,
                tx: snapshot_tx,
            },
        };

        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(POLL_INTERVAL);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = shutdown_rx.changed() => break,
                    // First tick fires immediately: the fetch on entering
                    // the identified state.
                    _ = interval.tick() => worker.reconcile().await,
                    cmd = cmd_rx.recv() => match cmd {
                        Some(Command::Act { action, task_id, respond }) => {
                            let result = worker.dispatch(action, task_id).await;
                            // Forced out-of-cycle refetch, success or
                            // failure, so the snapshot converges to the
                            // authoritative outcome. Runs only after the
                            // action request itself completed.
                            worker.reconcile().await;
                            let _ = respond.send(result);
                        }
                        None => break,
                    },
                }
            }
            debug!(user = %worker.username, "session poll loop ended");
        });

        Self {
            username,
            cmd_tx,
            snapshot_rx,
            shutdown_tx,
            handle: Some(handle),
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    /// Watch the board snapshot; the receiver sees every applied fetch.
    /// The channel closes when the session ends.
    pub fn snapshots(&self) -> watch::Receiver<BoardSnapshot> {
        self.snapshot_rx.clone()
    }

    /// Issue a transition for this user, then refetch both views before
    /// returning. Fails with [`ClientError::SessionClosed`] after shutdown.
    pub async fn act(&self, action: TaskAction, task_id: i64) -> Result<TaskView, ClientError> {
        let (respond, rx) = oneshot::channel();
        self.cmd_tx
            .send(Command::Act {
                action,
                task_id,
                respond,
            })
            .await
            .map_err(|_| ClientError::SessionClosed)?;
        rx.await.map_err(|_| ClientError::SessionClosed)?
    }

    /// Leave the identified state: cancel the periodic timer and wait for
    /// the poll task to finish its in-flight work and exit.
    pub async fn shutdown(mut self) {
        let _ = self.shutdown_tx.send(true);
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        // Backstop for handles dropped without shutdown().
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

struct Worker {
    api: ApiClient,
    username: String,
    next_seq: u64,
    snapshots: SnapshotCell,
}

impl Worker {
    /// One reconcile: fetch both views and replace the local snapshot
    /// wholesale. Fetch failures are non-fatal; the next trigger retries.
    async fn reconcile(&mut self) {
        self.next_seq += 1;
        let seq = self.next_seq;
        let (queue, mine) = tokio::join!(
            self.api.fetch_queue(),
            self.api.fetch_my_tasks(&self.username)
        );
        match (queue, mine) {
            (Ok(queue), Ok(mine)) => {
                if !self.snapshots.apply(seq, queue, mine) {
                    debug!(seq, "discarded stale fetch result");
                }
            }
            (Err(e), _) | (_, Err(e)) => {
                warn!(user = %self.username, "reconcile fetch failed: {}", e);
            }
        }
    }

    async fn dispatch(&self, action: TaskAction, task_id: i64) -> Result<TaskView, ClientError> {
        match self.api.transition(action, task_id, &self.username).await {
            Ok(resp) => Ok(resp.task),
            Err(e) => {
                warn!(user = %self.username, action = %action, task_id, "action failed: {}", e);
                Err(e)
            }
        }
    }
}

/// Publishes snapshots in arrival order, discarding responses that lost the
/// race against a newer fetch. Ordering is decided here at apply time, not
/// when the fetch was sent, so overlapping triggers need no mutual exclusion.
struct SnapshotCell {
    last_applied: u64,
    tx: watch::Sender<BoardSnapshot>,
}

impl SnapshotCell {
    fn apply(&mut self, seq: u64, queue: Vec<TaskView>, mine: Vec<TaskView>) -> bool {
        if seq <= self.last_applied {
            return false;
        }
        self.last_applied = seq;
        self.tx.send_replace(BoardSnapshot { seq, queue, mine });
        true
    }
}
