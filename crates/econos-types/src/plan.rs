use serde::{Deserialize, Serialize};

use crate::task::{TaskId, TaskType};
use alloy_primitives::Address;

/// How a step's input is assembled from the plan's own input and the
/// outputs of steps that ran before it. The pipeline planner (C7) only
/// ever emits DAGs where `FromPrevious`/`Merge` reference step indices
/// strictly less than their own.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InputMapping {
    /// Use the plan's original input verbatim.
    Direct,
    /// Use the named step's output, or a single named field of it.
    FromPrevious {
        step_index: usize,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        field: Option<String>,
    },
    /// Use the named step's output after applying a named transform.
    Transform { step_index: usize, transform: String },
    /// Concatenate/merge several prior steps' outputs.
    Merge { step_indices: Vec<usize> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Pending,
    Dispatched,
    Completed,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanStep {
    pub task_type: TaskType,
    pub input_mapping: InputMapping,
    pub status: StepStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_task_id: Option<TaskId>,
    /// The offer this step is currently bound to. Set by the planner at
    /// `plan`/`optimize` time; re-resolved (not trusted) by the
    /// orchestrator if it has gone stale by the time the step runs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_worker: Option<Address>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub worker_endpoint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_wei: Option<u128>,
}

impl PlanStep {
    pub fn new(task_type: TaskType, input_mapping: InputMapping) -> Self {
        Self {
            task_type,
            input_mapping,
            status: StepStatus::Pending,
            sub_task_id: None,
            assigned_worker: None,
            worker_endpoint: None,
            price_wei: None,
        }
    }
}

/// A DAG of sub-tasks the pipeline planner decomposed a composite request
/// into. Steps execute in index order; each step's `InputMapping` names
/// only indices strictly before it, so a simple forward scan is always a
/// valid topological walk — no separate sort is needed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionPlan {
    pub root_task_id: TaskId,
    pub steps: Vec<PlanStep>,
    #[serde(default)]
    pub estimated_budget: u128,
    #[serde(default)]
    pub reasoning: String,
}

impl ExecutionPlan {
    pub fn new(root_task_id: TaskId, steps: Vec<PlanStep>) -> Self {
        Self {
            root_task_id,
            steps,
            estimated_budget: 0,
            reasoning: String::new(),
        }
    }

    /// Validates that every `InputMapping` only references earlier steps.
    pub fn is_well_formed(&self) -> bool {
        self.steps.iter().enumerate().all(|(idx, step)| {
            match &step.input_mapping {
                InputMapping::Direct => true,
                InputMapping::FromPrevious { step_index, .. } => *step_index < idx,
                InputMapping::Transform { step_index, .. } => *step_index < idx,
                InputMapping::Merge { step_indices } => step_indices.iter().all(|i| *i < idx),
            }
        })
    }

    /// Recomputes `estimated_budget` from each step's currently bound price.
    /// A step with no bound price yet does not contribute.
    pub fn recompute_estimated_budget(&mut self) {
        self.estimated_budget = self.steps.iter().filter_map(|s| s.price_wei).sum();
    }

    pub fn is_complete(&self) -> bool {
        self.steps.iter().all(|s| s.status == StepStatus::Completed)
    }

    pub fn has_failed_step(&self) -> bool {
        self.steps.iter().any(|s| s.status == StepStatus::Failed)
    }

    pub fn next_pending(&self) -> Option<usize> {
        self.steps
            .iter()
            .position(|s| s.status == StepStatus::Pending)
    }
}
