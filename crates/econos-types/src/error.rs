use crate::TaskType;

/// Validation errors raised while forming or mutating a [`crate::Task`].
///
/// These are the "Validation" kind from the error taxonomy: synchronous,
/// surfaced to the caller before any side effect, never retried.
#[derive(Debug, Clone, thiserror::Error)]
pub enum TaskError {
    #[error("unsupported task type: {0}")]
    UnsupportedTaskType(String),

    #[error("schema violation for {task_type:?}: {reason}")]
    SchemaViolation {
        task_type: TaskType,
        reason: String,
    },

    #[error("budget must be a positive number of wei, got {0}")]
    NonPositiveBudget(u128),

    #[error("duration {got}s out of range [{min}s, {max}s]")]
    DurationOutOfRange { got: u64, min: u64, max: u64 },

    #[error("deadline {deadline} is not after createdAt {created_at}")]
    DeadlineNotAfterCreation { deadline: u64, created_at: u64 },
}
