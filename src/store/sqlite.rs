//! SQLite-based task store.

use super::{StoreError, TaskStore};
use crate::lifecycle::{self, TaskAction};
use crate::task::Task;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;

const SCHEMA: &str = r#"
PRAGMA journal_mode = WAL;

CREATE TABLE IF NOT EXISTS tasks (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    title TEXT NOT NULL,
    owner TEXT,
    start_time TEXT,
    stop_time TEXT,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_tasks_owner ON tasks(owner);
"#;

pub struct SqliteTaskStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteTaskStore {
    pub async fn new(data_dir: PathBuf) -> Result<Self, StoreError> {
        tokio::fs::create_dir_all(&data_dir)
            .await
            .map_err(|e| StoreError::Backend(format!("failed to create data dir: {}", e)))?;
        let db_path = data_dir.join("tasks.db");

        let conn = tokio::task::spawn_blocking(move || {
            let conn = Connection::open(&db_path)
                .map_err(|e| StoreError::Backend(format!("failed to open database: {}", e)))?;
            conn.execute_batch(SCHEMA)
                .map_err(|e| StoreError::Backend(format!("failed to run schema: {}", e)))?;
            Ok::<_, StoreError>(conn)
        })
        .await
        .map_err(|e| StoreError::Backend(format!("task join error: {}", e)))??;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn task_from_row(row: &Row<'_>) -> rusqlite::Result<Task> {
        Ok(Task {
            id: row.get(0)?,
            title: row.get(1)?,
            owner: row.get(2)?,
            start_time: row.get::<_, Option<DateTime<Utc>>>(3)?,
            stop_time: row.get::<_, Option<DateTime<Utc>>>(4)?,
        })
    }

    async fn select_tasks(
        &self,
        where_clause: &'static str,
        user: Option<String>,
    ) -> Result<Vec<Task>, StoreError> {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let conn = conn.blocking_lock();
            let sql = format!(
                "SELECT id, title, owner, start_time, stop_time FROM tasks {} ORDER BY id ASC",
                where_clause
            );
            let mut stmt = conn
                .prepare(&sql)
                .map_err(|e| StoreError::Backend(e.to_string()))?;

            let map_err = |e: rusqlite::Error| StoreError::Backend(e.to_string());
            let tasks = match user {
                Some(user) => stmt
                    .query_map(params![user], Self::task_from_row)
                    .map_err(map_err)?
                    .collect::<Result<Vec<_>, _>>()
                    .map_err(map_err)?,
                None => stmt
                    .query_map([], Self::task_from_row)
                    .map_err(map_err)?
                    .collect::<Result<Vec<_>, _>>()
                    .map_err(map_err)?,
            };
            Ok(tasks)
        })
        .await
        .map_err(|e| StoreError::Backend(format!("task join error: {}", e)))?
    }
}

#[async_trait]
impl TaskStore for SqliteTaskStore {
    fn is_persistent(&self) -> bool {
        true
    }

    async fn create_task(&self, title: &str) -> Result<Task, StoreError> {
        let conn = self.conn.clone();
        let title = title.to_string();
        tokio::task::spawn_blocking(move || {
            let conn = conn.blocking_lock();
            conn.execute(
                "INSERT INTO tasks (title, created_at) VALUES (?1, ?2)",
                params![title, Utc::now()],
            )
            .map_err(|e| StoreError::Backend(e.to_string()))?;
            let id = conn.last_insert_rowid();
            Ok(Task::new(id, title))
        })
        .await
        .map_err(|e| StoreError::Backend(format!("task join error: {}", e)))?
    }

    async fn get_task(&self, id: i64) -> Result<Option<Task>, StoreError> {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let conn = conn.blocking_lock();
            conn.query_row(
                "SELECT id, title, owner, start_time, stop_time FROM tasks WHERE id = ?1",
                params![id],
                Self::task_from_row,
            )
            .optional()
            .map_err(|e| StoreError::Backend(e.to_string()))
        })
        .await
        .map_err(|e| StoreError::Backend(format!("task join error: {}", e)))?
    }

    async fn unclaimed_queue(&self) -> Result<Vec<Task>, StoreError> {
        self.select_tasks("WHERE owner IS NULL", None).await
    }

    async fn tasks_for_user(&self, user: &str) -> Result<Vec<Task>, StoreError> {
        self.select_tasks("WHERE owner = ?1", Some(user.to_string()))
            .await
    }

    async fn count_tasks(&self) -> Result<usize, StoreError> {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let conn = conn.blocking_lock();
            let count: i64 = conn
                .query_row("SELECT COUNT(*) FROM tasks", [], |row| row.get(0))
                .map_err(|e| StoreError::Backend(e.to_string()))?;
            Ok(count as usize)
        })
        .await
        .map_err(|e| StoreError::Backend(format!("task join error: {}", e)))?
    }

    async fn transition(
        &self,
        id: i64,
        action: TaskAction,
        user: &str,
    ) -> Result<Task, StoreError> {
        let conn = self.conn.clone();
        let user = user.to_string();
        tokio::task::spawn_blocking(move || {
            let mut conn = conn.blocking_lock();
            // Read, check and write inside a single transaction on the
            // mutex-guarded connection: the precondition is re-verified
            // against committed state, never against a stale snapshot.
            let tx = conn
                .transaction()
                .map_err(|e| StoreError::Backend(e.to_string()))?;

            let mut task = tx
                .query_row(
                    "SELECT id, title, owner, start_time, stop_time FROM tasks WHERE id = ?1",
                    params![id],
                    Self::task_from_row,
                )
                .optional()
                .map_err(|e| StoreError::Backend(e.to_string()))?
                .ok_or(StoreError::TaskNotFound(id))?;

            lifecycle::apply(&mut task, action, &user, Utc::now())?;

            tx.execute(
                "UPDATE tasks SET owner = ?1, start_time = ?2, stop_time = ?3 WHERE id = ?4",
                params![task.owner, task.start_time, task.stop_time, id],
            )
            .map_err(|e| StoreError::Backend(e.to_string()))?;
            tx.commit().map_err(|e| StoreError::Backend(e.to_string()))?;

            Ok(task)
        })
        .await
        .map_err(|e| StoreError::Backend(format!("task join error: {}", e)))?
    }
}
