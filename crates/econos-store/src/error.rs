use econos_types::TaskId;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("task {0} not found")]
    NotFound(TaskId),

    #[error("task {0} already exists")]
    AlreadyExists(TaskId),

    #[error("persistence error: {0}")]
    Persistence(String),
}
