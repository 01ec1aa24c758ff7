use econos_types::TaskType;

#[derive(Debug, thiserror::Error)]
pub enum PlannerError {
    #[error("analyzer produced an unsupported task type: {0}")]
    UnsupportedTaskType(String),

    #[error(transparent)]
    Validation(#[from] econos_types::TaskError),

    #[error("no worker currently offers service {0:?}")]
    NoWorkerForService(TaskType),

    #[error("estimated budget {estimate} wei exceeds max budget {max} wei")]
    BudgetExceeded { estimate: u128, max: u128 },

    #[error("external analyzer failed: {0}")]
    AnalyzerFailed(String),

    #[error("plan is not a well-formed DAG: step {step_index} references a non-prior step")]
    MalformedPlan { step_index: usize },
}
