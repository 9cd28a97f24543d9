//! Task storage with pluggable backends.
//!
//! Supports:
//! - `memory`: In-memory storage (non-persistent, for testing)
//! - `sqlite`: SQLite database file
//!
//! Both backends expose the same [`TaskStore`] trait: two read-only views
//! (the unclaimed queue and one user's tasks, both in insertion order) and an
//! atomic [`TaskStore::transition`] that applies the lifecycle rules
//! compare-and-set style. Conflicting transitions on the same task serialize
//! inside the backend; exactly one writer wins.

mod memory;
mod sqlite;

pub use memory::MemoryTaskStore;
pub use sqlite::SqliteTaskStore;

use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

use crate::lifecycle::{TaskAction, TransitionError};
use crate::task::Task;

/// Storage failure taxonomy surfaced to the HTTP layer.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    #[error("task {0} not found")]
    TaskNotFound(i64),

    #[error(transparent)]
    Transition(#[from] TransitionError),

    #[error("storage backend error: {0}")]
    Backend(String),
}

impl StoreError {
    /// Stable machine-readable code, used in HTTP error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            StoreError::TaskNotFound(_) => "task_not_found",
            StoreError::Transition(e) => e.code(),
            StoreError::Backend(_) => "internal",
        }
    }
}

/// Task store trait - implemented by all storage backends.
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Whether this store persists data across restarts.
    fn is_persistent(&self) -> bool;

    /// Insert a new queued task. Used by startup seeding and tests; task
    /// ingestion has no HTTP surface.
    async fn create_task(&self, title: &str) -> Result<Task, StoreError>;

    /// Get a single task by id.
    async fn get_task(&self, id: i64) -> Result<Option<Task>, StoreError>;

    /// All queued (unclaimed) tasks, in insertion order.
    async fn unclaimed_queue(&self) -> Result<Vec<Task>, StoreError>;

    /// All tasks owned by `user` (kept, running or completed), in insertion
    /// order.
    async fn tasks_for_user(&self, user: &str) -> Result<Vec<Task>, StoreError>;

    /// Total number of tasks, regardless of state.
    async fn count_tasks(&self) -> Result<usize, StoreError>;

    /// Atomically check and apply a lifecycle transition, returning the
    /// updated task. The precondition is verified against stored state under
    /// the backend's per-task serialization, so two conflicting transitions
    /// cannot both succeed.
    async fn transition(
        &self,
        id: i64,
        action: TaskAction,
        user: &str,
    ) -> Result<Task, StoreError>;
}

/// Task store backend selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TaskStoreKind {
    Memory,
    #[default]
    Sqlite,
}

impl TaskStoreKind {
    /// Parse from environment variable value.
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "memory" => Self::Memory,
            "sqlite" | "db" => Self::Sqlite,
            _ => Self::default(),
        }
    }

    /// Canonical name, as accepted by [`TaskStoreKind::parse`].
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Memory => "memory",
            Self::Sqlite => "sqlite",
        }
    }
}

/// Create a task store based on kind and configuration.
pub async fn create_task_store(
    kind: TaskStoreKind,
    data_dir: PathBuf,
) -> Result<Arc<dyn TaskStore>, StoreError> {
    match kind {
        TaskStoreKind::Memory => Ok(Arc::new(MemoryTaskStore::new())),
        TaskStoreKind::Sqlite => {
            let store = SqliteTaskStore::new(data_dir).await?;
            Ok(Arc::new(store))
        }
    }
}

/// Seed "Task 1".."Task N" into an empty store. A store that already holds
/// tasks is left alone, so restarts of the sqlite backend do not duplicate
/// the sample queue.
pub async fn seed_initial_tasks(store: &dyn TaskStore, count: usize) -> Result<usize, StoreError> {
    if count == 0 || store.count_tasks().await? > 0 {
        return Ok(0);
    }
    for n in 1..=count {
        store.create_task(&format!("Task {}", n)).await?;
    }
    tracing::info!("Seeded {} initial tasks", count);
    Ok(count)
}
