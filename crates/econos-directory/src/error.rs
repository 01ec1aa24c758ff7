#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    #[error("no eligible worker for the requested task")]
    NoEligibleWorker,
}
