use std::collections::HashSet;
use std::sync::Mutex;

use alloy::primitives::Address;
use async_trait::async_trait;
use econos_types::TaskId;
use tokio::sync::broadcast;

use crate::contracts::OnChainStatus;
use crate::error::ChainError;
use crate::gateway::{ChainEvent, ChainGateway, OnChainTask, Receipt};

/// In-memory `ChainGateway` used by every other crate's tests. Active
/// workers and deposited tasks are preloaded by the test; `refund_and_slash`
/// and `deposit_task` update local state and publish the matching event so
/// lifecycle-monitor tests can exercise the demultiplexer end to end.
pub struct FakeChainGateway {
    tasks: Mutex<std::collections::HashMap<TaskId, OnChainTask>>,
    active_workers: Mutex<HashSet<Address>>,
    event_tx: broadcast::Sender<ChainEvent>,
    next_block: Mutex<u64>,
}

impl Default for FakeChainGateway {
    fn default() -> Self {
        let (event_tx, _) = broadcast::channel(256);
        Self {
            tasks: Mutex::new(std::collections::HashMap::new()),
            active_workers: Mutex::new(HashSet::new()),
            event_tx,
            next_block: Mutex::new(1),
        }
    }
}

impl FakeChainGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn activate_worker(&self, addr: Address) {
        self.active_workers.lock().unwrap().insert(addr);
    }

    /// Test hook: simulate the worker submitting a result on-chain.
    pub fn complete_task(&self, id: TaskId, result: Vec<u8>) {
        if let Some(task) = self.tasks.lock().unwrap().get_mut(&id) {
            task.status = OnChainStatus::Completed;
        }
        let _ = self.event_tx.send(ChainEvent::TaskCompleted { task_id: id, result });
    }

    fn next_block_number(&self) -> u64 {
        let mut guard = self.next_block.lock().unwrap();
        let n = *guard;
        *guard += 1;
        n
    }
}

#[async_trait]
impl ChainGateway for FakeChainGateway {
    async fn get_task(&self, id: TaskId) -> Result<Option<OnChainTask>, ChainError> {
        Ok(self.tasks.lock().unwrap().get(&id).copied())
    }

    async fn deposit_task(
        &self,
        id: TaskId,
        worker: Address,
        duration_secs: u64,
        amount_wei: u128,
    ) -> Result<Receipt, ChainError> {
        let mut tasks = self.tasks.lock().unwrap();
        if tasks.contains_key(&id) {
            return Err(ChainError::TaskAlreadyExists(id.to_string()));
        }
        let deadline = duration_secs;
        tasks.insert(
            id,
            OnChainTask {
                master: Address::ZERO,
                worker,
                amount: amount_wei,
                deadline,
                status: OnChainStatus::Created,
            },
        );
        drop(tasks);

        let _ = self.event_tx.send(ChainEvent::TaskCreated {
            task_id: id,
            master: Address::ZERO,
            worker,
            amount: amount_wei,
        });

        Ok(Receipt {
            tx_hash: econos_types::B256::ZERO,
            block_number: self.next_block_number(),
            confirmations: 2,
        })
    }

    async fn refund_and_slash(&self, id: TaskId) -> Result<Receipt, ChainError> {
        let mut tasks = self.tasks.lock().unwrap();
        let task = tasks.get_mut(&id).ok_or_else(|| ChainError::TxReverted("no such task".to_string()))?;
        task.status = OnChainStatus::Refunded;
        drop(tasks);

        let _ = self.event_tx.send(ChainEvent::TaskRefunded { task_id: id });

        Ok(Receipt {
            tx_hash: econos_types::B256::ZERO,
            block_number: self.next_block_number(),
            confirmations: 2,
        })
    }

    async fn is_worker_active(&self, addr: Address) -> Result<bool, ChainError> {
        Ok(self.active_workers.lock().unwrap().contains(&addr))
    }

    fn subscribe(&self) -> broadcast::Receiver<ChainEvent> {
        self.event_tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn deposit_then_get_task_round_trips() {
        let gateway = FakeChainGateway::new();
        let id = TaskId::random();
        let worker = Address::repeat_byte(0x11);
        gateway.deposit_task(id, worker, 7200, 1_000).await.unwrap();

        let task = gateway.get_task(id).await.unwrap().unwrap();
        assert_eq!(task.worker, worker);
        assert_eq!(task.status, OnChainStatus::Created);
    }

    #[tokio::test]
    async fn deposit_task_fails_fast_if_already_exists() {
        let gateway = FakeChainGateway::new();
        let id = TaskId::random();
        let worker = Address::repeat_byte(0x11);
        gateway.deposit_task(id, worker, 7200, 1_000).await.unwrap();
        let err = gateway.deposit_task(id, worker, 7200, 1_000).await.unwrap_err();
        assert!(matches!(err, ChainError::TaskAlreadyExists(_)));
    }

    #[tokio::test]
    async fn refund_and_slash_publishes_task_refunded() {
        let gateway = FakeChainGateway::new();
        let id = TaskId::random();
        let worker = Address::repeat_byte(0x22);
        let mut sub = gateway.subscribe();
        gateway.deposit_task(id, worker, 7200, 1_000).await.unwrap();
        gateway.refund_and_slash(id).await.unwrap();

        let event = sub.recv().await.unwrap();
        assert!(matches!(event, ChainEvent::TaskCreated { .. }));
        let event = sub.recv().await.unwrap();
        assert!(matches!(event, ChainEvent::TaskRefunded { task_id } if task_id == id));
    }
}
