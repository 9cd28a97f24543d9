//! HTTP route handlers.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::lifecycle::TaskAction;
use crate::store::{StoreError, TaskStore};

use super::types::*;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub store: Arc<dyn TaskStore>,
}

type ApiError = (StatusCode, Json<ErrorBody>);

fn error_response(status: StatusCode, code: &str, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorBody {
            error: code.to_string(),
            message: message.into(),
        }),
    )
}

fn store_error_response(err: StoreError) -> ApiError {
    use crate::lifecycle::TransitionError;
    let status = match &err {
        StoreError::TaskNotFound(_) => StatusCode::NOT_FOUND,
        StoreError::Transition(TransitionError::NotOwner) => StatusCode::FORBIDDEN,
        // A lost race or a wrong-state request is a conflict with current
        // server state; the client's forced refetch resolves it.
        StoreError::Transition(_) => StatusCode::CONFLICT,
        StoreError::Backend(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if status == StatusCode::INTERNAL_SERVER_ERROR {
        tracing::error!("store error: {}", err);
    }
    error_response(status, err.code(), err.to_string())
}

/// Build the application router. Exposed separately from [`serve`] so tests
/// can drive the real routes on an ephemeral port.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/queue", get(get_queue))
        .route("/my_tasks", get(get_my_tasks))
        .route("/keep/:task_id", post(keep_task))
        .route("/assign/:task_id", post(assign_task))
        .route("/start/:task_id", post(start_task))
        .route("/stop/:task_id", post(stop_task))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the HTTP server.
pub async fn serve(config: Config, store: Arc<dyn TaskStore>) -> anyhow::Result<()> {
    let addr = format!("{}:{}", config.host, config.port);
    let state = Arc::new(AppState { config, store });
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

/// Wait for ctrl-c or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}

/// Health check endpoint.
async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        store_backend: state.config.store_kind.as_str().to_string(),
        persistent_store: state.store.is_persistent(),
    })
}

/// List queued (unclaimed) tasks.
async fn get_queue(State(state): State<Arc<AppState>>) -> Result<Json<Vec<TaskView>>, ApiError> {
    let tasks = state
        .store
        .unclaimed_queue()
        .await
        .map_err(store_error_response)?;
    Ok(Json(tasks.iter().map(TaskView::from).collect()))
}

/// List tasks owned by the given user.
async fn get_my_tasks(
    State(state): State<Arc<AppState>>,
    Query(query): Query<MyTasksQuery>,
) -> Result<Json<Vec<TaskView>>, ApiError> {
    let username = validate_username(&query.username)?;
    let tasks = state
        .store
        .tasks_for_user(username)
        .await
        .map_err(store_error_response)?;
    Ok(Json(tasks.iter().map(TaskView::from).collect()))
}

async fn keep_task(
    State(state): State<Arc<AppState>>,
    Path(task_id): Path<i64>,
    Json(req): Json<ActionRequest>,
) -> Result<Json<ActionResponse>, ApiError> {
    apply_action(&state, task_id, TaskAction::Keep, &req.username).await
}

async fn assign_task(
    State(state): State<Arc<AppState>>,
    Path(task_id): Path<i64>,
    Json(req): Json<ActionRequest>,
) -> Result<Json<ActionResponse>, ApiError> {
    apply_action(&state, task_id, TaskAction::ClaimAndStart, &req.username).await
}

async fn start_task(
    State(state): State<Arc<AppState>>,
    Path(task_id): Path<i64>,
    Json(req): Json<ActionRequest>,
) -> Result<Json<ActionResponse>, ApiError> {
    apply_action(&state, task_id, TaskAction::Start, &req.username).await
}

async fn stop_task(
    State(state): State<Arc<AppState>>,
    Path(task_id): Path<i64>,
    Json(req): Json<ActionRequest>,
) -> Result<Json<ActionResponse>, ApiError> {
    apply_action(&state, task_id, TaskAction::Stop, &req.username).await
}

/// Shared handler body for the four transition endpoints.
async fn apply_action(
    state: &AppState,
    task_id: i64,
    action: TaskAction,
    username: &str,
) -> Result<Json<ActionResponse>, ApiError> {
    let username = validate_username(username)?;
    let task = state
        .store
        .transition(task_id, action, username)
        .await
        .map_err(store_error_response)?;

    tracing::debug!(task_id, action = %action, user = username, status = %task.status(), "transition applied");
    Ok(Json(ActionResponse {
        message: format!("task {} {}", task_id, verbed(action)),
        task: TaskView::from(task),
    }))
}

fn verbed(action: TaskAction) -> &'static str {
    match action {
        TaskAction::Keep => "kept",
        TaskAction::ClaimAndStart => "assigned and started",
        TaskAction::Start => "started",
        TaskAction::Stop => "stopped",
    }
}

fn validate_username(username: &str) -> Result<&str, ApiError> {
    let trimmed = username.trim();
    if trimmed.is_empty() {
        return Err(error_response(
            StatusCode::BAD_REQUEST,
            "bad_request",
            "username must not be empty",
        ));
    }
    Ok(trimmed)
}
