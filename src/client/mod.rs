//! Polling client for the task coordinator.
//!
//! [`ApiClient`] wraps the HTTP contract; [`Session`] runs the
//! reconciliation loop that keeps a local [`BoardSnapshot`] converged with
//! the server through fixed-interval polling and post-action refetches.

mod session;

pub use session::{BoardSnapshot, Session, POLL_INTERVAL};

use serde::de::DeserializeOwned;
use std::time::Duration;
use thiserror::Error;

use crate::api::types::{ActionRequest, ActionResponse, ErrorBody, HealthResponse, TaskView};
use crate::lifecycle::TaskAction;

/// Per-request timeout so every call resolves to a terminal outcome and the
/// loop never stalls on one fetch.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Why a client call failed.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Network or server failure, opaque to the caller.
    #[error("transport failure: {0}")]
    Transport(#[from] reqwest::Error),

    /// The server refused the request; `code` is the taxonomy code from the
    /// error body (`not_queued`, `not_owner`, `invalid_state`, ...).
    #[error("rejected ({code}): {message}")]
    Rejected { code: String, message: String },

    /// The session was shut down; no identity is set any more.
    #[error("session has ended")]
    SessionClosed,
}

impl ClientError {
    pub fn is_not_queued(&self) -> bool {
        matches!(self, ClientError::Rejected { code, .. } if code == "not_queued")
    }

    pub fn is_not_owner(&self) -> bool {
        matches!(self, ClientError::Rejected { code, .. } if code == "not_owner")
    }

    pub fn is_invalid_state(&self) -> bool {
        matches!(self, ClientError::Rejected { code, .. } if code == "invalid_state")
    }
}

/// Thin typed wrapper over the six contract endpoints.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub async fn health(&self) -> Result<HealthResponse, ClientError> {
        let resp = self
            .http
            .get(format!("{}/health", self.base_url))
            .send()
            .await?;
        Self::decode(resp).await
    }

    /// `GET /queue` — the unclaimed queue.
    pub async fn fetch_queue(&self) -> Result<Vec<TaskView>, ClientError> {
        let resp = self
            .http
            .get(format!("{}/queue", self.base_url))
            .send()
            .await?;
        Self::decode(resp).await
    }

    /// `GET /my_tasks?username=U` — tasks owned by `username`.
    pub async fn fetch_my_tasks(&self, username: &str) -> Result<Vec<TaskView>, ClientError> {
        let resp = self
            .http
            .get(format!("{}/my_tasks", self.base_url))
            .query(&[("username", username)])
            .send()
            .await?;
        Self::decode(resp).await
    }

    /// POST one of the four transitions.
    pub async fn transition(
        &self,
        action: TaskAction,
        task_id: i64,
        username: &str,
    ) -> Result<ActionResponse, ClientError> {
        let resp = self
            .http
            .post(format!("{}/{}/{}", self.base_url, action.as_str(), task_id))
            .json(&ActionRequest {
                username: username.to_string(),
            })
            .send()
            .await?;
        Self::decode(resp).await
    }

    async fn decode<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, ClientError> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp.json().await?);
        }
        let body = match resp.json::<ErrorBody>().await {
            Ok(body) => body,
            // Non-JSON error (proxy, panic page): keep the status as context.
            Err(_) => ErrorBody {
                error: "http_error".to_string(),
                message: format!("HTTP {}", status),
            },
        };
        Err(ClientError::Rejected {
            code: body.error,
            message: body.message,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejection_codes_map_to_taxonomy_helpers() {
        let err = ClientError::Rejected {
            code: "not_owner".to_string(),
            message: "task is owned by another user".to_string(),
        };
        assert!(err.is_not_owner());
        assert!(!err.is_not_queued());
        assert!(!err.is_invalid_state());
    }

    #[test]
    fn base_url_is_normalized() {
        let client = ApiClient::new("http://127.0.0.1:8000/").expect("client");
        assert_eq!(client.base_url, "http://127.0.0.1:8000");
    }
}
