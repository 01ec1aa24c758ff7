use econos_types::{TaskError, TaskStatus};

#[derive(Debug, thiserror::Error)]
pub enum TaskManagerError {
    #[error(transparent)]
    Validation(#[from] TaskError),

    #[error("illegal transition from {from:?} to {to:?}")]
    InvalidTransition { from: TaskStatus, to: TaskStatus },

    #[error(transparent)]
    Store(#[from] econos_store::StoreError),
}
