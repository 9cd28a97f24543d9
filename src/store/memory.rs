//! In-memory task store (non-persistent).
//!
//! Each task lives behind its own lock inside the outer map, so a transition
//! only serializes against other writers of the same task; reads and writes
//! on unrelated tasks proceed in parallel.

use super::{StoreError, TaskStore};
use crate::lifecycle::{self, TaskAction};
use crate::task::Task;
use async_trait::async_trait;
use chrono::Utc;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Clone)]
pub struct MemoryTaskStore {
    // BTreeMap keyed by sequential id keeps insertion order for the views.
    tasks: Arc<RwLock<BTreeMap<i64, Arc<RwLock<Task>>>>>,
    next_id: Arc<AtomicI64>,
}

impl MemoryTaskStore {
    pub fn new() -> Self {
        Self {
            tasks: Arc::new(RwLock::new(BTreeMap::new())),
            next_id: Arc::new(AtomicI64::new(1)),
        }
    }

    async fn snapshot_where<F>(&self, keep: F) -> Vec<Task>
    where
        F: Fn(&Task) -> bool,
    {
        let map = self.tasks.read().await;
        let mut out = Vec::new();
        for row in map.values() {
            let task = row.read().await;
            if keep(&task) {
                out.push(task.clone());
            }
        }
        out
    }
}

impl Default for MemoryTaskStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TaskStore for MemoryTaskStore {
    fn is_persistent(&self) -> bool {
        false
    }

    async fn create_task(&self, title: &str) -> Result<Task, StoreError> {
        let mut map = self.tasks.write().await;
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let task = Task::new(id, title);
        map.insert(id, Arc::new(RwLock::new(task.clone())));
        Ok(task)
    }

    async fn get_task(&self, id: i64) -> Result<Option<Task>, StoreError> {
        let row = self.tasks.read().await.get(&id).cloned();
        match row {
            Some(row) => Ok(Some(row.read().await.clone())),
            None => Ok(None),
        }
    }

    async fn unclaimed_queue(&self) -> Result<Vec<Task>, StoreError> {
        Ok(self.snapshot_where(|t| t.owner.is_none()).await)
    }

    async fn tasks_for_user(&self, user: &str) -> Result<Vec<Task>, StoreError> {
        Ok(self.snapshot_where(|t| t.is_owned_by(user)).await)
    }

    async fn count_tasks(&self) -> Result<usize, StoreError> {
        Ok(self.tasks.read().await.len())
    }

    async fn transition(
        &self,
        id: i64,
        action: TaskAction,
        user: &str,
    ) -> Result<Task, StoreError> {
        // Fetch the row handle under the outer read lock, then write-lock
        // only that task. A concurrent transition on the same task waits
        // here and re-checks its precondition against the updated fields.
        let row = self
            .tasks
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or(StoreError::TaskNotFound(id))?;

        let mut task = row.write().await;
        lifecycle::apply(&mut task, action, user, Utc::now())?;
        Ok(task.clone())
    }
}
