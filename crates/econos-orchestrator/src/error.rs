use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use econos_auth::AuthError;
use econos_chain::ChainError;
use econos_core::TaskManagerError;
use econos_directory::DirectoryError;
use econos_planner::PlannerError;

/// Failures talking to a worker sidecar's own HTTP surface
/// (`/authorize`, `/proof`, `/result`). Distinct from `OrchestratorError`
/// so a dispatch failure and a planning/state failure never collapse into
/// the same `match` arm at the boundary.
#[derive(Debug, thiserror::Error)]
pub enum WorkerError {
    #[error("worker manifest unavailable: {0}")]
    ManifestUnavailable(String),

    #[error("worker dispatch to {endpoint} failed with HTTP status {status}")]
    DispatchFailed { endpoint: String, status: u16 },

    #[error("failed to reach worker: {0}")]
    Unreachable(String),

    #[error("worker reported failure fetching result: {0}")]
    ResultFetchFailed(String),

    #[error("timed out waiting for worker proof of task {0}")]
    ProofTimeout(String),
}

/// Orchestration-level failures that are neither a sub-collaborator's
/// error nor a worker-dispatch error: a plan referencing work the
/// orchestrator itself cannot carry out.
#[derive(Debug, thiserror::Error)]
pub enum OrchestratorError {
    #[error("task deadline exceeded before the plan completed")]
    DeadlineExceeded,

    #[error("step {step_index} has no worker binding")]
    UnboundStep { step_index: usize },

    #[error("step {step_index} input mapping could not be resolved: {reason}")]
    UnresolvedInput { step_index: usize, reason: String },

    #[error("request declared an unsupported task type: {0}")]
    UnsupportedTaskType(String),
}

/// Top-level error every `econos-*` crate error converts into at the
/// orchestrator/binary boundary, with each crate's `thiserror`-based
/// error sitting underneath an `anyhow::Error` edge at the binary.
#[derive(Debug, thiserror::Error)]
pub enum EconosError {
    #[error(transparent)]
    Chain(#[from] ChainError),

    #[error(transparent)]
    Directory(#[from] DirectoryError),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Planner(#[from] PlannerError),

    #[error(transparent)]
    Task(#[from] TaskManagerError),

    #[error(transparent)]
    Worker(#[from] WorkerError),

    #[error(transparent)]
    Orchestrator(#[from] OrchestratorError),
}

impl EconosError {
    fn status_code(&self) -> StatusCode {
        match self {
            EconosError::Directory(DirectoryError::NoEligibleWorker) => StatusCode::SERVICE_UNAVAILABLE,
            EconosError::Planner(PlannerError::NoWorkerForService(_)) => StatusCode::SERVICE_UNAVAILABLE,
            EconosError::Planner(PlannerError::BudgetExceeded { .. }) => StatusCode::PAYMENT_REQUIRED,
            EconosError::Planner(_) | EconosError::Task(TaskManagerError::Validation(_)) => {
                StatusCode::BAD_REQUEST
            }
            EconosError::Orchestrator(OrchestratorError::UnsupportedTaskType(_)) => StatusCode::BAD_REQUEST,
            EconosError::Orchestrator(OrchestratorError::DeadlineExceeded)
            | EconosError::Worker(WorkerError::ProofTimeout(_)) => StatusCode::GATEWAY_TIMEOUT,
            EconosError::Chain(_) | EconosError::Worker(_) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for EconosError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}
