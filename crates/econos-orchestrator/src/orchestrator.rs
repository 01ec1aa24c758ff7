use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;

use econos_auth::{AuthorizationSigner, SignedAuthorization};
use econos_capability::CapabilityIndex;
use econos_chain::ChainGateway;
use econos_core::TaskManager;
use econos_directory::{SelectionStrategy, WorkerDirectory};
use econos_types::{
    now_unix_secs, Address, AuthorizationRecord, ExecutionPlan, InputMapping, PlanStep, Task,
    TaskId, TaskInput, TaskStatus, TaskType, B256,
};
use econos_wire::{
    AuthorizeRequest, PipelineExecutionResult, ProofResponse, ResultResponse,
    SignedAuthorizationWire, StepResult,
};

use crate::error::{EconosError, OrchestratorError, WorkerError};

const DEFAULT_VALIDITY_SECS: u64 = 3600;
const DEFAULT_PROOF_POLL_INTERVAL: Duration = Duration::from_secs(3);

/// Drives every step of an `ExecutionPlan` through deposit, authorization,
/// dispatch, and result collection (C10). The only component that calls
/// C1, C3, C4 and a worker's own HTTP surface within a single operation.
pub struct Orchestrator {
    tasks: Arc<TaskManager>,
    chain: Arc<dyn ChainGateway>,
    directory: Arc<WorkerDirectory>,
    capability_index: Arc<CapabilityIndex>,
    signer: Arc<AuthorizationSigner>,
    http: reqwest::Client,
    default_validity_secs: u64,
    proof_poll_interval: Duration,
}

impl Orchestrator {
    pub fn new(
        tasks: Arc<TaskManager>,
        chain: Arc<dyn ChainGateway>,
        directory: Arc<WorkerDirectory>,
        capability_index: Arc<CapabilityIndex>,
        signer: Arc<AuthorizationSigner>,
    ) -> Self {
        Self {
            tasks,
            chain,
            directory,
            capability_index,
            signer,
            http: reqwest::Client::new(),
            default_validity_secs: DEFAULT_VALIDITY_SECS,
            proof_poll_interval: DEFAULT_PROOF_POLL_INTERVAL,
        }
    }

    pub fn with_proof_poll_interval(mut self, interval: Duration) -> Self {
        self.proof_poll_interval = interval;
        self
    }

    /// Overrides the default authorization validity window (`expiresAt -
    /// now`) handed to `AuthorizationSigner::generate` for steps whose
    /// plan does not otherwise constrain it. Configurable via
    /// `ECONOS_AUTHORIZATION_DEFAULT_VALIDITY_SECS`.
    pub fn with_default_validity_secs(mut self, secs: u64) -> Self {
        self.default_validity_secs = secs;
        self
    }

    /// `spec.md` §4.9: walks `plan.steps` in index order, which is always a
    /// valid topological order for a well-formed plan. On any step failure
    /// the plan fails immediately; escrow already deposited for that step
    /// is left for the lifecycle monitor (C9) to refund at its deadline
    /// rather than reclaimed here.
    pub async fn execute(
        &self,
        plan: ExecutionPlan,
        original_request: Value,
        deadline: u64,
    ) -> Result<PipelineExecutionResult, EconosError> {
        let mut step_outputs: Vec<Option<Value>> = Vec::with_capacity(plan.steps.len());
        let mut step_results: Vec<StepResult> = Vec::with_capacity(plan.steps.len());
        let mut final_result = None;

        for (idx, step) in plan.steps.iter().enumerate() {
            if now_unix_secs() >= deadline {
                return Err(OrchestratorError::DeadlineExceeded.into());
            }

            let input_value = resolve_input(&step.input_mapping, &original_request, &step_outputs)
                .map_err(|reason| OrchestratorError::UnresolvedInput {
                    step_index: idx,
                    reason,
                })?;

            let task_input = build_task_input(step.task_type, &input_value).map_err(|reason| {
                OrchestratorError::UnresolvedInput {
                    step_index: idx,
                    reason,
                }
            })?;

            let (worker_address, worker_endpoint, price) =
                self.resolve_worker(step, &task_input).await?;

            let task_id = TaskId::random();
            let now = now_unix_secs();
            self.tasks
                .create(task_id, task_input, None, deadline, price, now)
                .await?;

            let duration_secs = deadline.saturating_sub(now);
            self.chain
                .deposit_task(task_id, worker_address, duration_secs, price)
                .await?;
            self.tasks
                .record_escrow_deposit(task_id, worker_address, B256::ZERO, now_unix_secs())
                .await?;

            let validity = self
                .default_validity_secs
                .min(deadline.saturating_sub(now_unix_secs()));
            let auth_payload = self
                .signer
                .generate(task_id, worker_address, validity, now_unix_secs());
            let signed = self.signer.sign(auth_payload).await?;

            self.dispatch_authorization(task_id, &worker_endpoint, &input_value, &signed)
                .await?;

            self.tasks
                .record_authorization(
                    task_id,
                    AuthorizationRecord {
                        signature: signed.signature.clone(),
                        nonce: signed.payload.nonce,
                        expires_at: signed.payload.expires_at,
                    },
                    now_unix_secs(),
                )
                .await?;
            self.tasks.mark_running(task_id, now_unix_secs()).await?;

            self.await_completion(task_id, &worker_endpoint, deadline)
                .await?;
            let result_value = self.fetch_result(task_id, &worker_endpoint).await?;

            step_outputs.push(Some(result_value.clone()));
            step_results.push(StepResult {
                task_id,
                status: TaskStatus::Completed,
                result: Some(result_value.clone()),
                error: None,
            });
            final_result = Some(result_value);
        }

        Ok(PipelineExecutionResult {
            root_task_id: plan.root_task_id,
            steps: step_results,
            final_result,
        })
    }

    /// Trusts the plan's pre-resolved binding while its worker is still
    /// active on-chain; re-selects through the directory (C3) otherwise.
    async fn resolve_worker(
        &self,
        step: &PlanStep,
        task_input: &TaskInput,
    ) -> Result<(Address, String, u128), EconosError> {
        if let (Some(address), Some(endpoint), Some(price)) = (
            step.assigned_worker,
            step.worker_endpoint.clone(),
            step.price_wei,
        ) {
            if self.chain.is_worker_active(address).await.unwrap_or(false) {
                return Ok((address, endpoint, price));
            }
        }

        let summary = self.capability_index.discover().await;
        let offers = summary
            .offers_by_task_type
            .get(step.task_type.label())
            .cloned()
            .unwrap_or_default();

        let budget = step.price_wei.unwrap_or(u128::MAX).max(1);
        let probe = Task::new(
            TaskId::random(),
            task_input.clone(),
            None,
            now_unix_secs() + 1,
            budget,
            now_unix_secs(),
        )
        .map_err(econos_core::TaskManagerError::from)?;

        let offer = self
            .directory
            .select_worker(&probe, &offers, SelectionStrategy::Cheapest, None)
            .await?;
        Ok((offer.address, offer.endpoint, offer.pricing_wei_per_task))
    }

    async fn dispatch_authorization(
        &self,
        task_id: TaskId,
        worker_endpoint: &str,
        payload: &Value,
        signed: &SignedAuthorization,
    ) -> Result<(), EconosError> {
        let body = AuthorizeRequest {
            payload: payload.clone(),
            authorization: to_wire(signed),
        };
        let response = self
            .http
            .post(format!("{worker_endpoint}/authorize/{task_id}"))
            .json(&body)
            .send()
            .await
            .map_err(|err| WorkerError::Unreachable(err.to_string()))?;

        if !response.status().is_success() {
            return Err(WorkerError::DispatchFailed {
                endpoint: worker_endpoint.to_string(),
                status: response.status().as_u16(),
            }
            .into());
        }
        Ok(())
    }

    /// Polls `GET {endpoint}/proof/:taskId` as a fallback probe while the
    /// lifecycle monitor (C9) races to observe the on-chain `TaskCompleted`
    /// event off the same deposit; whichever notices completion first
    /// wins, the other's check is simply a no-op on its next iteration.
    async fn await_completion(
        &self,
        task_id: TaskId,
        worker_endpoint: &str,
        deadline: u64,
    ) -> Result<(), EconosError> {
        loop {
            if let Some(task) = self.tasks.get(task_id).await? {
                match task.status {
                    TaskStatus::Completed => return Ok(()),
                    TaskStatus::Refunded | TaskStatus::Failed => {
                        return Err(WorkerError::ProofTimeout(task_id.to_string()).into());
                    }
                    _ => {}
                }
            }

            if now_unix_secs() >= deadline {
                return Err(WorkerError::ProofTimeout(task_id.to_string()).into());
            }

            if let Ok(response) = self
                .http
                .get(format!("{worker_endpoint}/proof/{task_id}"))
                .send()
                .await
            {
                if response.status().is_success() {
                    if let Ok(body) = response.json::<ProofResponse>().await {
                        if body.success {
                            tracing::debug!(
                                %task_id,
                                "worker proof received, awaiting on-chain completion"
                            );
                        }
                    }
                }
            }

            tokio::time::sleep(self.proof_poll_interval).await;
        }
    }

    async fn fetch_result(
        &self,
        task_id: TaskId,
        worker_endpoint: &str,
    ) -> Result<Value, EconosError> {
        let response = self
            .http
            .get(format!("{worker_endpoint}/result/{task_id}"))
            .send()
            .await
            .map_err(|err| WorkerError::Unreachable(err.to_string()))?;

        if !response.status().is_success() {
            return Err(WorkerError::ResultFetchFailed(format!("HTTP {}", response.status())).into());
        }

        let body: ResultResponse = response
            .json()
            .await
            .map_err(|err| WorkerError::ResultFetchFailed(err.to_string()))?;

        if !body.success {
            return Err(WorkerError::ResultFetchFailed("worker reported failure".to_string()).into());
        }

        Ok(body.data.unwrap_or(Value::Null))
    }
}

fn to_wire(sa: &SignedAuthorization) -> SignedAuthorizationWire {
    SignedAuthorizationWire {
        task_id: sa.payload.task_id.to_string(),
        worker: sa.payload.worker.to_string(),
        expires_at: sa.payload.expires_at,
        nonce: sa.payload.nonce,
        signature: format!("0x{}", hex::encode(&sa.signature)),
    }
}

/// Injects the closed `taskType` tag the resolved-input JSON lacks — it is
/// opaque parameter data, not a self-describing `TaskInput` — then
/// deserializes and validates it through the real type.
fn build_task_input(task_type: TaskType, params: &Value) -> Result<TaskInput, String> {
    let mut tagged = params.clone();
    let Value::Object(ref mut map) = tagged else {
        return Err("step input must resolve to a JSON object".to_string());
    };
    map.insert(
        "taskType".to_string(),
        Value::String(task_type.label().to_string()),
    );
    serde_json::from_value(tagged).map_err(|err| err.to_string())
}

fn resolve_input(
    mapping: &InputMapping,
    original_request: &Value,
    step_outputs: &[Option<Value>],
) -> Result<Value, String> {
    match mapping {
        InputMapping::Direct => Ok(original_request.clone()),
        InputMapping::FromPrevious { step_index, field } => {
            let prior = step_outputs
                .get(*step_index)
                .and_then(|v| v.clone())
                .ok_or_else(|| format!("no output recorded for step {step_index}"))?;
            match field {
                Some(name) => Ok(prior.get(name).cloned().unwrap_or(Value::Null)),
                None => Ok(prior),
            }
        }
        InputMapping::Transform {
            step_index,
            transform,
        } => Err(format!(
            "transform {transform:?} on step {step_index} has no registered implementation"
        )),
        InputMapping::Merge { step_indices } => {
            let mut merged = serde_json::Map::new();
            for index in step_indices {
                if let Some(Some(Value::Object(obj))) = step_outputs.get(*index) {
                    merged.extend(obj.clone());
                }
            }
            Ok(Value::Object(merged))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::signers::local::PrivateKeySigner;
    use econos_chain::FakeChainGateway;
    use econos_monitor::LifecycleMonitor;
    use econos_store::InMemoryTaskStore;
    use serde_json::json;
    use wiremock::matchers::{method, path_regex};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn execute_single_step_happy_path() {
        let chain = Arc::new(FakeChainGateway::new());
        let worker = Address::repeat_byte(7);
        chain.activate_worker(worker);

        let tasks = Arc::new(TaskManager::new(Arc::new(InMemoryTaskStore::new())));
        let monitor = Arc::new(LifecycleMonitor::with_interval(
            Arc::clone(&chain) as Arc<dyn ChainGateway>,
            Arc::clone(&tasks),
            Duration::from_secs(3600),
        ));
        monitor.start().await;

        let directory = Arc::new(WorkerDirectory::new(
            Arc::clone(&chain) as Arc<dyn ChainGateway>
        ));
        let capability_index = Arc::new(CapabilityIndex::new(vec![], Duration::from_secs(60)));
        let signer = Arc::new(AuthorizationSigner::new(
            PrivateKeySigner::random(),
            10,
            Address::repeat_byte(0xAA),
        ));

        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path_regex(r"^/authorize/.*$"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path_regex(r"^/proof/.*$"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true})))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path_regex(r"^/result/.*$"))
            .respond_with(ResponseTemplate::new(200).set_body_json(
                json!({"success": true, "data": {"text": "done"}}),
            ))
            .mount(&server)
            .await;

        let orchestrator = Orchestrator::new(
            Arc::clone(&tasks),
            Arc::clone(&chain) as Arc<dyn ChainGateway>,
            directory,
            capability_index,
            signer,
        )
        .with_proof_poll_interval(Duration::from_millis(20));

        let mut step = PlanStep::new(TaskType::SummaryGeneration, InputMapping::Direct);
        step.assigned_worker = Some(worker);
        step.worker_endpoint = Some(server.uri());
        step.price_wei = Some(10);
        let plan = ExecutionPlan::new(TaskId::random(), vec![step]);

        let request = json!({"text": "hello world", "max_sentences": 2});
        let deadline = now_unix_secs() + 3600;

        let completion_tasks = Arc::clone(&tasks);
        let completion_chain = Arc::clone(&chain);
        let completer = tokio::spawn(async move {
            loop {
                let running = completion_tasks
                    .get_by_status(TaskStatus::Running)
                    .await
                    .unwrap();
                if let Some(task) = running.into_iter().next() {
                    completion_chain.complete_task(task.task_id, b"done".to_vec());
                    break;
                }
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        });

        let result = orchestrator
            .execute(plan, request, deadline)
            .await
            .unwrap();
        completer.await.unwrap();
        monitor.stop().await;

        assert_eq!(result.steps.len(), 1);
        assert_eq!(result.steps[0].status, TaskStatus::Completed);
        assert_eq!(result.final_result, Some(json!({"text": "done"})));
    }

    #[tokio::test]
    async fn execute_fails_closed_when_no_worker_binding_and_none_available() {
        let chain = Arc::new(FakeChainGateway::new());
        let tasks = Arc::new(TaskManager::new(Arc::new(InMemoryTaskStore::new())));
        let directory = Arc::new(WorkerDirectory::new(
            Arc::clone(&chain) as Arc<dyn ChainGateway>
        ));
        let capability_index = Arc::new(CapabilityIndex::new(vec![], Duration::from_secs(60)));
        let signer = Arc::new(AuthorizationSigner::new(
            PrivateKeySigner::random(),
            10,
            Address::repeat_byte(0xAA),
        ));

        let orchestrator = Orchestrator::new(
            tasks,
            Arc::clone(&chain) as Arc<dyn ChainGateway>,
            directory,
            capability_index,
            signer,
        );

        let step = PlanStep::new(TaskType::Writer, InputMapping::Direct);
        let plan = ExecutionPlan::new(TaskId::random(), vec![step]);
        let err = orchestrator
            .execute(plan, json!({"brief": "x"}), now_unix_secs() + 60)
            .await
            .unwrap_err();
        assert!(matches!(err, EconosError::Directory(_)));
    }
}
