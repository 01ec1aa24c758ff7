use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex};

use econos_store::TaskStore;
use econos_types::{
    Address, AuthorizationRecord, Task, TaskId, TaskInput, TaskStatus, B256,
};
use tokio::sync::Mutex as AsyncMutex;

use crate::error::TaskManagerError;
use crate::state_machine::is_legal_transition;

/// CRUD over canonical tasks (C6). The only component that mutates a
/// `Task`; every other reader holds a point-in-time clone. Writes for a
/// given `taskId` are serialized through a per-task mutex so the sequence
/// of statuses any reader observes is always a legal walk of the state
/// machine, even under concurrent `Execute` calls.
pub struct TaskManager {
    store: Arc<dyn TaskStore>,
    locks: StdMutex<HashMap<TaskId, Arc<AsyncMutex<()>>>>,
}

impl TaskManager {
    pub fn new(store: Arc<dyn TaskStore>) -> Self {
        Self {
            store,
            locks: StdMutex::new(HashMap::new()),
        }
    }

    fn lock_for(&self, id: TaskId) -> Arc<AsyncMutex<()>> {
        Arc::clone(
            self.locks
                .lock()
                .unwrap()
                .entry(id)
                .or_insert_with(|| Arc::new(AsyncMutex::new(()))),
        )
    }

    pub async fn create(
        &self,
        task_id: TaskId,
        input: TaskInput,
        required_capabilities: Option<std::collections::BTreeSet<String>>,
        deadline: u64,
        budget: u128,
        now: u64,
    ) -> Result<Task, TaskManagerError> {
        let task = Task::new(task_id, input, required_capabilities, deadline, budget, now)?;
        self.store.create(task.clone()).await?;
        Ok(task)
    }

    pub async fn get(&self, id: TaskId) -> Result<Option<Task>, TaskManagerError> {
        Ok(self.store.get(id).await?)
    }

    pub async fn get_by_status(&self, status: TaskStatus) -> Result<Vec<Task>, TaskManagerError> {
        Ok(self.store.get_by_status(status).await?)
    }

    pub async fn get_expired_tasks(&self, now: u64) -> Result<Vec<Task>, TaskManagerError> {
        Ok(self.store.get_expired(now).await?)
    }

    async fn transition(
        &self,
        id: TaskId,
        to: TaskStatus,
        now: u64,
        mutate: impl FnOnce(&mut Task),
    ) -> Result<Task, TaskManagerError> {
        let lock = self.lock_for(id);
        let _guard = lock.lock().await;

        let mut task = self
            .store
            .get(id)
            .await?
            .ok_or(econos_store::StoreError::NotFound(id))?;

        if !is_legal_transition(task.status, to) {
            return Err(TaskManagerError::InvalidTransition {
                from: task.status,
                to,
            });
        }

        mutate(&mut task);
        task.status = to;
        task.updated_at = now;
        self.store.replace(task.clone()).await?;
        Ok(task)
    }

    pub async fn record_escrow_deposit(
        &self,
        id: TaskId,
        worker: Address,
        escrow_tx_hash: B256,
        now: u64,
    ) -> Result<Task, TaskManagerError> {
        self.transition(id, TaskStatus::Created, now, |task| {
            task.assigned_worker = Some(worker);
            task.escrow_tx_hash = Some(escrow_tx_hash);
        })
        .await
    }

    pub async fn record_authorization(
        &self,
        id: TaskId,
        authorization: AuthorizationRecord,
        now: u64,
    ) -> Result<Task, TaskManagerError> {
        self.transition(id, TaskStatus::Authorized, now, |task| {
            task.authorization = Some(authorization);
        })
        .await
    }

    pub async fn mark_running(&self, id: TaskId, now: u64) -> Result<Task, TaskManagerError> {
        self.transition(id, TaskStatus::Running, now, |_| {}).await
    }

    pub async fn record_completion(
        &self,
        id: TaskId,
        result_hash: Vec<u8>,
        now: u64,
    ) -> Result<Task, TaskManagerError> {
        self.transition(id, TaskStatus::Completed, now, |task| {
            task.result_hash = Some(result_hash);
        })
        .await
    }

    pub async fn record_refund(&self, id: TaskId, now: u64) -> Result<Task, TaskManagerError> {
        self.transition(id, TaskStatus::Refunded, now, |_| {}).await
    }

    pub async fn record_failure(&self, id: TaskId, now: u64) -> Result<Task, TaskManagerError> {
        self.transition(id, TaskStatus::Failed, now, |_| {}).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use econos_store::InMemoryTaskStore;

    fn manager() -> TaskManager {
        TaskManager::new(Arc::new(InMemoryTaskStore::new()))
    }

    fn input() -> TaskInput {
        TaskInput::SummaryGeneration {
            text: "hi".to_string(),
            max_sentences: 1,
        }
    }

    #[tokio::test]
    async fn create_then_record_escrow_deposit_transitions_to_created() {
        let mgr = manager();
        let id = TaskId::random();
        mgr.create(id, input(), None, 1000, 10, 0).await.unwrap();

        let task = mgr
            .record_escrow_deposit(id, Address::ZERO, B256::ZERO, 1)
            .await
            .unwrap();
        assert_eq!(task.status, TaskStatus::Created);
        assert_eq!(task.assigned_worker, Some(Address::ZERO));
    }

    #[tokio::test]
    async fn illegal_transition_is_rejected() {
        let mgr = manager();
        let id = TaskId::random();
        mgr.create(id, input(), None, 1000, 10, 0).await.unwrap();

        let err = mgr.mark_running(id, 1).await.unwrap_err();
        assert!(matches!(
            err,
            TaskManagerError::InvalidTransition {
                from: TaskStatus::Pending,
                to: TaskStatus::Running
            }
        ));
    }

    #[tokio::test]
    async fn full_happy_path_walk() {
        let mgr = manager();
        let id = TaskId::random();
        mgr.create(id, input(), None, 1000, 10, 0).await.unwrap();
        mgr.record_escrow_deposit(id, Address::ZERO, B256::ZERO, 1)
            .await
            .unwrap();
        mgr.record_authorization(
            id,
            AuthorizationRecord {
                signature: vec![1],
                nonce: 0,
                expires_at: 500,
            },
            2,
        )
        .await
        .unwrap();
        mgr.mark_running(id, 3).await.unwrap();
        let task = mgr.record_completion(id, vec![0xab], 4).await.unwrap();
        assert_eq!(task.status, TaskStatus::Completed);
        assert_eq!(task.result_hash, Some(vec![0xab]));
    }
}
