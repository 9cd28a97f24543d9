//! Task record and derived lifecycle status.
//!
//! A task stores three optional fields (`owner`, `start_time`, `stop_time`)
//! and its status is always derived from them, never stored. All status
//! checks in the crate go through [`Task::status`] so the queue view and the
//! per-user view can never disagree.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single work item in the shared queue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    /// Unique, immutable identifier (insertion order).
    pub id: i64,
    /// Display text, immutable after creation.
    pub title: String,
    /// Username of the claimant; `None` while queued.
    pub owner: Option<String>,
    /// Set exactly once, when the owner starts the task.
    pub start_time: Option<DateTime<Utc>>,
    /// Set exactly once, when the owner stops the task. Requires `start_time`.
    pub stop_time: Option<DateTime<Utc>>,
}

/// Derived lifecycle status. Exactly one holds at any instant.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Unclaimed, waiting in the shared queue.
    Queued,
    /// Claimed but not started.
    Kept,
    /// Started and not yet stopped.
    Running,
    /// Started and stopped.
    Completed,
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TaskStatus::Queued => "queued",
            TaskStatus::Kept => "kept",
            TaskStatus::Running => "running",
            TaskStatus::Completed => "completed",
        };
        f.write_str(s)
    }
}

impl Task {
    /// Create a fresh queued task.
    pub fn new(id: i64, title: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            owner: None,
            start_time: None,
            stop_time: None,
        }
    }

    /// Derive the status from the stored fields.
    ///
    /// The four cases are exhaustive and mutually exclusive: `owner` unset
    /// means queued (an unowned task can never have timestamps), and the two
    /// timestamps split the owned states.
    pub fn status(&self) -> TaskStatus {
        match (&self.owner, &self.start_time, &self.stop_time) {
            (None, _, _) => TaskStatus::Queued,
            (Some(_), None, _) => TaskStatus::Kept,
            (Some(_), Some(_), None) => TaskStatus::Running,
            (Some(_), Some(_), Some(_)) => TaskStatus::Completed,
        }
    }

    /// Whether `user` is the current owner.
    pub fn is_owned_by(&self, user: &str) -> bool {
        self.owner.as_deref() == Some(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    #[test]
    fn status_is_derived_from_fields() {
        let mut task = Task::new(1, "Write report");
        assert_eq!(task.status(), TaskStatus::Queued);

        task.owner = Some("alice".to_string());
        assert_eq!(task.status(), TaskStatus::Kept);

        task.start_time = Some(ts(100));
        assert_eq!(task.status(), TaskStatus::Running);

        task.stop_time = Some(ts(200));
        assert_eq!(task.status(), TaskStatus::Completed);
    }

    #[test]
    fn stop_implies_start_and_ordering() {
        let task = Task {
            id: 1,
            title: "t".to_string(),
            owner: Some("alice".to_string()),
            start_time: Some(ts(100)),
            stop_time: Some(ts(250)),
        };
        assert!(task.start_time.is_some());
        assert!(task.stop_time.unwrap() >= task.start_time.unwrap());
    }

    #[test]
    fn ownership_check() {
        let mut task = Task::new(7, "t");
        assert!(!task.is_owned_by("alice"));
        task.owner = Some("alice".to_string());
        assert!(task.is_owned_by("alice"));
        assert!(!task.is_owned_by("bob"));
    }

    #[test]
    fn status_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&TaskStatus::Completed).unwrap(),
            "\"completed\""
        );
        assert_eq!(format!("{}", TaskStatus::Kept), "kept");
    }
}
