//! HTTP API for the task coordinator.
//!
//! ## Endpoints
//!
//! - `GET /queue` - Queued (unclaimed) tasks, insertion order
//! - `GET /my_tasks?username=U` - Tasks owned by `U`
//! - `POST /keep/{task_id}` - Claim without starting
//! - `POST /assign/{task_id}` - Claim and start in one step
//! - `POST /start/{task_id}` - Start a kept task (owner only)
//! - `POST /stop/{task_id}` - Stop a running task (owner only)
//! - `GET /health` - Health check
//!
//! Transition bodies carry `{"username": ...}`. Failed preconditions come
//! back as 409 (`not_queued`, `invalid_state`), ownership violations as 403
//! (`not_owner`), unknown ids as 404.

mod routes;
pub mod types;

pub use routes::{router, serve, AppState};
pub use types::*;
