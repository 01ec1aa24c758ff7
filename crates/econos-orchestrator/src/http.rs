use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use tower_http::cors::{Any, CorsLayer};

use econos_capability::CapabilityIndex;
use econos_planner::{PlanAnalyzer, PlanOptions, PipelinePlanner, StubAnalyzer};
use econos_types::{now_unix_secs, TaskId, TaskType};
use econos_wire::{ChatRequest, HireRequest, PipelineExecutionResult};

use crate::error::{EconosError, OrchestratorError};
use crate::orchestrator::Orchestrator;

const DEFAULT_TASK_DEADLINE_SECS: u64 = 1800;

/// Shared state for the `/hire`/`/chat`/`/healthz` surface, assembled once
/// at process start and cloned per request (an `Arc` under the hood).
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<Orchestrator>,
    pub capability_index: Arc<CapabilityIndex>,
    pub chat_analyzer: Arc<dyn PlanAnalyzer>,
    pub max_budget_wei: Option<u128>,
    pub default_task_deadline_secs: u64,
}

impl AppState {
    pub fn new(
        orchestrator: Arc<Orchestrator>,
        capability_index: Arc<CapabilityIndex>,
        chat_analyzer: Arc<dyn PlanAnalyzer>,
    ) -> Self {
        Self {
            orchestrator,
            capability_index,
            chat_analyzer,
            max_budget_wei: None,
            default_task_deadline_secs: DEFAULT_TASK_DEADLINE_SECS,
        }
    }
}

async fn healthz() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

async fn hire(
    State(state): State<AppState>,
    Json(request): Json<HireRequest>,
) -> Result<Json<PipelineExecutionResult>, EconosError> {
    let task_type = TaskType::from_label(&request.task_type)
        .map_err(|_| OrchestratorError::UnsupportedTaskType(request.task_type.clone()))?;

    let analyzer = Arc::new(StubAnalyzer::new(task_type));
    let planner = PipelinePlanner::new(Arc::clone(&state.capability_index), analyzer);
    let options = PlanOptions {
        max_budget_wei: request.max_budget_wei.or(state.max_budget_wei),
    };

    let plan = planner
        .plan(TaskId::random(), &request.task_type, &options)
        .await?;
    let deadline = now_unix_secs() + state.default_task_deadline_secs;

    let result = state
        .orchestrator
        .execute(plan, request.params, deadline)
        .await?;
    Ok(Json(result))
}

async fn chat(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<PipelineExecutionResult>, EconosError> {
    let planner = PipelinePlanner::new(
        Arc::clone(&state.capability_index),
        Arc::clone(&state.chat_analyzer),
    );
    let options = PlanOptions {
        max_budget_wei: request.max_budget_wei.or(state.max_budget_wei),
    };

    let plan = planner
        .plan(TaskId::random(), &request.message, &options)
        .await?;
    let deadline = now_unix_secs() + state.default_task_deadline_secs;

    let result = state
        .orchestrator
        .execute(plan, chat_message_to_params(&request.message), deadline)
        .await?;
    Ok(Json(result))
}

/// The planner's analyzer only reports a step's service type and input
/// source, never its structured parameters — extracting those from free
/// text is the external analyzer's job, out of scope here. The first
/// step's `Direct` input mapping is handed this instead: the same message
/// under every field name any `TaskInput` variant might read, so whichever
/// one the resolved task type actually needs is present.
fn chat_message_to_params(message: &str) -> Value {
    json!({
        "prompt": message,
        "text": message,
        "query": message,
        "brief": message,
        "sector": message,
    })
}

pub fn app_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/healthz", get(healthz))
        .route("/hire", post(hire))
        .route("/chat", post(chat))
        .layer(cors)
        .with_state(state)
}

/// Binds the listener, serves with graceful shutdown on Ctrl-C, and
/// returns once the listener stops.
pub async fn serve(addr: SocketAddr, state: AppState) -> anyhow::Result<()> {
    let app = app_router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if tokio::signal::ctrl_c().await.is_err() {
                std::future::pending::<()>().await;
            }
        })
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::signers::local::PrivateKeySigner;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use econos_auth::AuthorizationSigner;
    use econos_chain::{Address, ChainGateway, FakeChainGateway};
    use econos_core::TaskManager;
    use econos_directory::WorkerDirectory;
    use econos_store::InMemoryTaskStore;
    use std::time::Duration;
    use tower::ServiceExt;

    fn test_state() -> AppState {
        let chain: Arc<dyn ChainGateway> = Arc::new(FakeChainGateway::new());
        let tasks = Arc::new(TaskManager::new(Arc::new(InMemoryTaskStore::new())));
        let directory = Arc::new(WorkerDirectory::new(Arc::clone(&chain)));
        let capability_index = Arc::new(CapabilityIndex::new(vec![], Duration::from_secs(60)));
        let signer = Arc::new(AuthorizationSigner::new(
            PrivateKeySigner::random(),
            10,
            Address::repeat_byte(0xAA),
        ));
        let orchestrator = Arc::new(Orchestrator::new(
            tasks,
            chain,
            directory,
            Arc::clone(&capability_index),
            signer,
        ));
        let analyzer = Arc::new(StubAnalyzer::new(TaskType::Writer));
        AppState::new(orchestrator, capability_index, analyzer)
    }

    #[tokio::test]
    async fn healthz_reports_ok() {
        let app = app_router(test_state());
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/healthz")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn hire_with_unsupported_task_type_is_bad_request() {
        let app = app_router(test_state());
        let body = json!({"task_type": "not-a-real-type", "params": {}}).to_string();
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/hire")
                    .header("content-type", "application/json")
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn hire_with_no_worker_available_is_service_unavailable() {
        let app = app_router(test_state());
        let body = json!({
            "task_type": "summary-generation",
            "params": {"text": "hi", "max_sentences": 2},
        })
        .to_string();
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/hire")
                    .header("content-type", "application/json")
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
