//! # taskboard
//!
//! Multi-user task queue coordinator with polling clients.
//!
//! A shared queue of work items that any identified user may claim, start,
//! and stop. The server is the single authority over each task's lifecycle;
//! clients observe it by periodic polling and converge after every action
//! with a forced refetch.
//!
//! ## Lifecycle
//!
//! ```text
//!              keep
//!   QUEUED ───────────► KEPT ───start──► RUNNING ──stop──► COMPLETED
//!      │                                    ▲
//!      └───────────── assign ───────────────┘
//!            (claim and start in one step)
//! ```
//!
//! Status is never stored: it is derived from `owner`, `start_time` and
//! `stop_time` in exactly one place ([`task::Task::status`]).
//!
//! ## Modules
//! - `task`: task record and derived status
//! - `lifecycle`: transition rules and error taxonomy
//! - `store`: pluggable task storage (memory, sqlite)
//! - `api`: axum HTTP binding of the contract
//! - `client`: reqwest client and the polling reconciliation session
//! - `config`: environment configuration

pub mod api;
pub mod client;
pub mod config;
pub mod lifecycle;
pub mod store;
pub mod task;

pub use config::Config;
pub use lifecycle::{TaskAction, TransitionError};
pub use task::{Task, TaskStatus};
