use serde::{Deserialize, Serialize};

use econos_types::{TaskId, TaskStatus};

/// `POST /hire` body: a single-task request bound to one of the closed
/// `taskType` labels.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HireRequest {
    pub task_type: String,
    pub params: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_budget_wei: Option<u128>,
}

/// `POST /chat` body: a free-form request the pipeline planner decomposes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_budget_wei: Option<u128>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepResult {
    pub task_id: TaskId,
    pub status: TaskStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Response body for both `/hire` and `/chat`: the outcome of driving a
/// plan's steps through deposit/authorize/dispatch/await.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineExecutionResult {
    pub root_task_id: TaskId,
    pub steps: Vec<StepResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_result: Option<serde_json::Value>,
}
