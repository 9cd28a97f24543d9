//! API request and response types.
//!
//! Shared between the server handlers and the polling client, so both sides
//! of the wire contract live in one place.

use serde::{Deserialize, Serialize};

use crate::task::{Task, TaskStatus};

/// Wire representation of a task.
///
/// `start_time`/`stop_time` are nullable ISO-8601 strings; `status` is the
/// derived lifecycle state, included so clients never recompute it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TaskView {
    pub id: i64,
    pub title: String,
    pub owner: Option<String>,
    pub start_time: Option<chrono::DateTime<chrono::Utc>>,
    pub stop_time: Option<chrono::DateTime<chrono::Utc>>,
    pub status: TaskStatus,
}

impl From<&Task> for TaskView {
    fn from(task: &Task) -> Self {
        Self {
            id: task.id,
            title: task.title.clone(),
            owner: task.owner.clone(),
            start_time: task.start_time,
            stop_time: task.stop_time,
            status: task.status(),
        }
    }
}

impl From<Task> for TaskView {
    fn from(task: Task) -> Self {
        Self::from(&task)
    }
}

/// Body of the four transition POSTs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionRequest {
    /// Free-form identity; not a verified credential.
    pub username: String,
}

/// Response of a successful transition POST.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionResponse {
    pub message: String,
    /// The task after the transition was applied.
    pub task: TaskView,
}

/// Error body with a stable machine-readable code.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    /// One of: `not_queued`, `not_owner`, `invalid_state`, `task_not_found`,
    /// `bad_request`, `internal`.
    pub error: String,
    pub message: String,
}

/// Query parameters for `GET /my_tasks`.
#[derive(Debug, Deserialize)]
pub struct MyTasksQuery {
    pub username: String,
}

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    /// Configured storage backend (`memory` or `sqlite`).
    pub store_backend: String,
    /// Whether the task store survives restarts.
    pub persistent_store: bool,
}
