#[derive(Debug, thiserror::Error)]
pub enum ChainError {
    #[error("chain unavailable after retries: {0}")]
    ChainUnavailable(String),

    #[error("transaction reverted: {0}")]
    TxReverted(String),

    #[error("insufficient confirmations: wanted {wanted}, got {got}")]
    InsufficientConfirmations { wanted: u64, got: u64 },

    #[error("task {0} already exists on-chain")]
    TaskAlreadyExists(String),
}
