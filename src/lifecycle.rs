//! Transition rules for the task lifecycle.
//!
//! [`apply`] is the single pure state machine: it checks the precondition for
//! an action against the current task fields and either mutates the task or
//! returns a [`TransitionError`] leaving it untouched. Atomicity is the
//! store's job — each backend calls `apply` inside its own per-task
//! serialization, so conflicting transitions become compare-and-set: the
//! first writer wins and the loser sees the precondition failure.

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::task::{Task, TaskStatus};

/// The four client-issued transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskAction {
    /// Claim a queued task without starting it (QUEUED -> KEPT).
    Keep,
    /// Claim and start in one step (QUEUED -> RUNNING).
    ClaimAndStart,
    /// Start a kept task (KEPT -> RUNNING), owner only.
    Start,
    /// Stop a running task (RUNNING -> COMPLETED), owner only.
    Stop,
}

impl TaskAction {
    /// Wire name; doubles as the POST path segment of the HTTP contract.
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskAction::Keep => "keep",
            TaskAction::ClaimAndStart => "assign",
            TaskAction::Start => "start",
            TaskAction::Stop => "stop",
        }
    }
}

impl std::fmt::Display for TaskAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a transition was refused. The task is unchanged in every case.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransitionError {
    /// Claim attempted on a task that is no longer queued (e.g. another
    /// user won the race).
    #[error("task is not queued")]
    NotQueued,
    /// Acting user does not own the task.
    #[error("task is owned by another user")]
    NotOwner,
    /// The task's current state does not permit this transition.
    #[error("transition not valid in state {0}")]
    InvalidState(TaskStatus),
}

impl TransitionError {
    /// Stable machine-readable code, used in HTTP error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            TransitionError::NotQueued => "not_queued",
            TransitionError::NotOwner => "not_owner",
            TransitionError::InvalidState(_) => "invalid_state",
        }
    }
}

/// Check the precondition for `action` by `user` and apply the mutation.
pub fn apply(
    task: &mut Task,
    action: TaskAction,
    user: &str,
    now: DateTime<Utc>,
) -> Result<(), TransitionError> {
    let status = task.status();
    match action {
        TaskAction::Keep => {
            if status != TaskStatus::Queued {
                return Err(TransitionError::NotQueued);
            }
            task.owner = Some(user.to_string());
        }
        TaskAction::ClaimAndStart => {
            if status != TaskStatus::Queued {
                return Err(TransitionError::NotQueued);
            }
            task.owner = Some(user.to_string());
            task.start_time = Some(now);
        }
        TaskAction::Start => {
            if let Some(owner) = task.owner.as_deref() {
                if owner != user {
                    return Err(TransitionError::NotOwner);
                }
            }
            if status != TaskStatus::Kept {
                return Err(TransitionError::InvalidState(status));
            }
            task.start_time = Some(now);
        }
        TaskAction::Stop => {
            if let Some(owner) = task.owner.as_deref() {
                if owner != user {
                    return Err(TransitionError::NotOwner);
                }
            }
            if status != TaskStatus::Running {
                return Err(TransitionError::InvalidState(status));
            }
            task.stop_time = Some(now);
        }
    }
    Ok(())
}
