//! HTTP control and inspection surface over a single hosted run.

use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use contracts::{AgentSnapshot, ApiError, ErrorCode, Event, RunConfig, RunStatus, Snapshot};
use serde::Deserialize;
use tokio::net::TcpListener;
use tokio::sync::Mutex;

use crate::EngineApi;

const DEFAULT_PAGE_SIZE: usize = 500;
const MAX_PAGE_SIZE: usize = 5_000;

#[derive(Debug)]
pub enum ServerError {
    Io(std::io::Error),
}

impl fmt::Display for ServerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(err) => write!(f, "server io error: {err}"),
        }
    }
}

impl std::error::Error for ServerError {}

impl From<std::io::Error> for ServerError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

#[derive(Clone, Default)]
struct AppState {
    engine: Arc<Mutex<Option<EngineApi>>>,
}

pub async fn serve(addr: SocketAddr) -> Result<(), ServerError> {
    let app = router(AppState::default());
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/v1/runs", post(create_run))
        .route("/api/v1/runs/{run_id}/status", get(get_status))
        .route("/api/v1/runs/{run_id}/start", post(start_run))
        .route("/api/v1/runs/{run_id}/pause", post(pause_run))
        .route("/api/v1/runs/{run_id}/step", post(step_run))
        .route("/api/v1/runs/{run_id}/run_to_tick", post(run_to_tick))
        .route("/api/v1/runs/{run_id}/snapshot", get(get_snapshot))
        .route("/api/v1/runs/{run_id}/agents", get(get_agents))
        .route("/api/v1/runs/{run_id}/events", get(get_events))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug)]
struct HttpApiError {
    status: StatusCode,
    error: ApiError,
}

impl HttpApiError {
    fn run_not_found(requested_run_id: &str, active_run_id: Option<&str>) -> Self {
        let details = active_run_id
            .map(|active| format!("requested_run_id={requested_run_id} active_run_id={active}"));
        Self {
            status: StatusCode::NOT_FOUND,
            error: ApiError::new(
                ErrorCode::RunNotFound,
                "run_id does not match the hosted run",
                details,
            ),
        }
    }

    fn invalid_command(message: impl Into<String>, details: Option<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            error: ApiError::new(ErrorCode::InvalidCommand, message, details),
        }
    }

    fn internal(message: impl Into<String>, details: Option<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            error: ApiError::new(ErrorCode::InternalError, message, details),
        }
    }
}

impl IntoResponse for HttpApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.error)).into_response()
    }
}

fn require_run<'a>(
    slot: &'a mut Option<EngineApi>,
    run_id: &str,
) -> Result<&'a mut EngineApi, HttpApiError> {
    match slot {
        Some(api) => {
            if api.config().run_id == run_id {
                Ok(api)
            } else {
                let active = api.config().run_id.clone();
                Err(HttpApiError::run_not_found(run_id, Some(&active)))
            }
        }
        None => Err(HttpApiError::run_not_found(run_id, None)),
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn create_run(
    State(state): State<AppState>,
    Json(config): Json<RunConfig>,
) -> Result<Json<RunStatus>, HttpApiError> {
    let api = EngineApi::from_config(config).map_err(|err| {
        HttpApiError::invalid_command("run configuration rejected", Some(err.to_string()))
    })?;
    let status = api.status();
    *state.engine.lock().await = Some(api);
    Ok(Json(status))
}

async fn get_status(
    State(state): State<AppState>,
    Path(run_id): Path<String>,
) -> Result<Json<RunStatus>, HttpApiError> {
    let mut slot = state.engine.lock().await;
    let api = require_run(&mut slot, &run_id)?;
    Ok(Json(api.status()))
}

async fn start_run(
    State(state): State<AppState>,
    Path(run_id): Path<String>,
) -> Result<Json<RunStatus>, HttpApiError> {
    let mut slot = state.engine.lock().await;
    let api = require_run(&mut slot, &run_id)?;
    Ok(Json(api.start()))
}

async fn pause_run(
    State(state): State<AppState>,
    Path(run_id): Path<String>,
) -> Result<Json<RunStatus>, HttpApiError> {
    let mut slot = state.engine.lock().await;
    let api = require_run(&mut slot, &run_id)?;
    Ok(Json(api.pause()))
}

#[derive(Debug, Deserialize)]
struct StepRequest {
    #[serde(default)]
    steps: Option<u64>,
}

#[derive(Debug, serde::Serialize)]
struct StepResponse {
    status: RunStatus,
    committed: u64,
}

async fn step_run(
    State(state): State<AppState>,
    Path(run_id): Path<String>,
    Json(request): Json<StepRequest>,
) -> Result<Json<StepResponse>, HttpApiError> {
    let mut slot = state.engine.lock().await;
    let api = require_run(&mut slot, &run_id)?;
    let (status, committed) = api
        .step(request.steps.unwrap_or(1))
        .map_err(|err| HttpApiError::internal("step failed", Some(err.to_string())))?;
    Ok(Json(StepResponse { status, committed }))
}

#[derive(Debug, Deserialize)]
struct RunToTickRequest {
    target_tick: u64,
}

async fn run_to_tick(
    State(state): State<AppState>,
    Path(run_id): Path<String>,
    Json(request): Json<RunToTickRequest>,
) -> Result<Json<StepResponse>, HttpApiError> {
    let mut slot = state.engine.lock().await;
    let api = require_run(&mut slot, &run_id)?;
    let (status, committed) = api
        .run_to_tick(request.target_tick)
        .map_err(|err| HttpApiError::internal("run_to_tick failed", Some(err.to_string())))?;
    Ok(Json(StepResponse { status, committed }))
}

async fn get_snapshot(
    State(state): State<AppState>,
    Path(run_id): Path<String>,
) -> Result<Json<Snapshot>, HttpApiError> {
    let mut slot = state.engine.lock().await;
    let api = require_run(&mut slot, &run_id)?;
    let snapshot = api
        .snapshot()
        .map_err(|err| HttpApiError::internal("snapshot failed", Some(err.to_string())))?;
    Ok(Json(snapshot))
}

async fn get_agents(
    State(state): State<AppState>,
    Path(run_id): Path<String>,
) -> Result<Json<Vec<AgentSnapshot>>, HttpApiError> {
    let mut slot = state.engine.lock().await;
    let api = require_run(&mut slot, &run_id)?;
    let snapshot = api
        .snapshot()
        .map_err(|err| HttpApiError::internal("snapshot failed", Some(err.to_string())))?;
    Ok(Json(snapshot.agents))
}

#[derive(Debug, Deserialize)]
struct EventsQuery {
    #[serde(default)]
    offset: Option<usize>,
    #[serde(default)]
    limit: Option<usize>,
}

async fn get_events(
    State(state): State<AppState>,
    Path(run_id): Path<String>,
    Query(query): Query<EventsQuery>,
) -> Result<Json<Vec<Event>>, HttpApiError> {
    let mut slot = state.engine.lock().await;
    let api = require_run(&mut slot, &run_id)?;
    let events = api.events();
    let offset = query.offset.unwrap_or(0).min(events.len());
    let limit = query
        .limit
        .unwrap_or(DEFAULT_PAGE_SIZE)
        .min(MAX_PAGE_SIZE);
    let end = offset.saturating_add(limit).min(events.len());
    Ok(Json(events[offset..end].to_vec()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> RunConfig {
        RunConfig {
            agent_count: 4,
            max_ticks: 8,
            ..RunConfig::default()
        }
    }

    #[tokio::test]
    async fn create_step_and_inspect_round_trip() {
        let state = AppState::default();

        let created = create_run(State(state.clone()), Json(config()))
            .await
            .expect("create");
        assert_eq!(created.0.current_tick, 0);

        let run_id = created.0.run_id.clone();
        let stepped = step_run(
            State(state.clone()),
            Path(run_id.clone()),
            Json(StepRequest { steps: Some(3) }),
        )
        .await
        .expect("step");
        assert_eq!(stepped.0.committed, 3);
        assert_eq!(stepped.0.status.current_tick, 3);

        let agents = get_agents(State(state.clone()), Path(run_id.clone()))
            .await
            .expect("agents");
        assert_eq!(agents.0.len(), 4);

        let events = get_events(
            State(state),
            Path(run_id),
            Query(EventsQuery {
                offset: None,
                limit: Some(2),
            }),
        )
        .await
        .expect("events");
        assert!(events.0.len() <= 2);
    }

    #[tokio::test]
    async fn unknown_run_id_is_not_found() {
        let state = AppState::default();
        create_run(State(state.clone()), Json(config()))
            .await
            .expect("create");

        let err = get_status(State(state), Path("run_other".to_string()))
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::NOT_FOUND);
        assert_eq!(err.error.code, ErrorCode::RunNotFound);
    }

    #[tokio::test]
    async fn malformed_topology_rejects_the_create() {
        let state = AppState::default();
        let mut bad = config();
        bad.topology = Some("not-a-count\n".to_string());
        let err = create_run(State(state), Json(bad)).await.unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert_eq!(err.error.code, ErrorCode::InvalidCommand);
    }
}
