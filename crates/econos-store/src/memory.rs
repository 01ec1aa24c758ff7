use std::collections::HashMap;

use async_trait::async_trait;
use econos_types::{Task, TaskId, TaskStatus};
use tokio::sync::RwLock;

use crate::error::StoreError;
use crate::store::TaskStore;

/// Process-local `TaskStore`. Sufficient for the indexed lookups the
/// sweeper needs without reaching for a SQL dependency the core has no
/// other use for; the persistent store proper is an external collaborator.
#[derive(Default)]
pub struct InMemoryTaskStore {
    tasks: RwLock<HashMap<TaskId, Task>>,
}

impl InMemoryTaskStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TaskStore for InMemoryTaskStore {
    async fn create(&self, task: Task) -> Result<(), StoreError> {
        let mut tasks = self.tasks.write().await;
        if tasks.contains_key(&task.task_id) {
            return Err(StoreError::AlreadyExists(task.task_id));
        }
        tasks.insert(task.task_id, task);
        Ok(())
    }

    async fn get(&self, id: TaskId) -> Result<Option<Task>, StoreError> {
        Ok(self.tasks.read().await.get(&id).cloned())
    }

    async fn replace(&self, task: Task) -> Result<(), StoreError> {
        let mut tasks = self.tasks.write().await;
        if !tasks.contains_key(&task.task_id) {
            return Err(StoreError::NotFound(task.task_id));
        }
        tasks.insert(task.task_id, task);
        Ok(())
    }

    async fn get_by_status(&self, status: TaskStatus) -> Result<Vec<Task>, StoreError> {
        Ok(self
            .tasks
            .read()
            .await
            .values()
            .filter(|t| t.status == status)
            .cloned()
            .collect())
    }

    async fn get_expired(&self, now: u64) -> Result<Vec<Task>, StoreError> {
        Ok(self
            .tasks
            .read()
            .await
            .values()
            .filter(|t| {
                t.deadline < now
                    && matches!(
                        t.status,
                        TaskStatus::Created | TaskStatus::Authorized | TaskStatus::Running
                    )
            })
            .cloned()
            .collect())
    }
}
