use alloy::primitives::{Address, B256};
use async_trait::async_trait;
use econos_types::TaskId;
use tokio::sync::broadcast;

use crate::contracts::OnChainStatus;
use crate::error::ChainError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OnChainTask {
    pub master: Address,
    pub worker: Address,
    pub amount: u128,
    pub deadline: u64,
    pub status: OnChainStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Receipt {
    pub tx_hash: B256,
    pub block_number: u64,
    pub confirmations: u64,
}

#[derive(Debug, Clone)]
pub enum ChainEvent {
    TaskCreated {
        task_id: TaskId,
        master: Address,
        worker: Address,
        amount: u128,
    },
    TaskCompleted {
        task_id: TaskId,
        result: Vec<u8>,
    },
    TaskRefunded {
        task_id: TaskId,
    },
}

/// Typed read/write access to the escrow and registry contracts (C1).
/// One production implementation (`AlloyChainGateway`) and one in-memory
/// fake (`FakeChainGateway`) shared by every other crate's tests.
#[async_trait]
pub trait ChainGateway: Send + Sync {
    async fn get_task(&self, id: TaskId) -> Result<Option<OnChainTask>, ChainError>;

    async fn deposit_task(
        &self,
        id: TaskId,
        worker: Address,
        duration_secs: u64,
        amount_wei: u128,
    ) -> Result<Receipt, ChainError>;

    async fn refund_and_slash(&self, id: TaskId) -> Result<Receipt, ChainError>;

    async fn is_worker_active(&self, addr: Address) -> Result<bool, ChainError>;

    /// Subscribes to `TaskCreated`/`TaskCompleted`/`TaskRefunded`. Each
    /// call gets its own receiver off a shared broadcast channel; dropping
    /// the receiver is the unsubscribe.
    fn subscribe(&self) -> broadcast::Receiver<ChainEvent>;
}
