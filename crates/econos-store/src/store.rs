use async_trait::async_trait;
use econos_types::{Task, TaskId, TaskStatus};

use crate::error::StoreError;

/// CRUD over the canonical task record, indexed for the two queries the
/// lifecycle monitor's sweeper needs: by status, and by "expired".
#[async_trait]
pub trait TaskStore: Send + Sync {
    async fn create(&self, task: Task) -> Result<(), StoreError>;

    async fn get(&self, id: TaskId) -> Result<Option<Task>, StoreError>;

    /// Replaces the stored record wholesale. Callers (the task manager)
    /// are responsible for having read-modify-written under their own
    /// per-task serialization.
    async fn replace(&self, task: Task) -> Result<(), StoreError>;

    async fn get_by_status(&self, status: TaskStatus) -> Result<Vec<Task>, StoreError>;

    /// Tasks with `deadline < now` and `status` in
    /// `{Created, Authorized, Running}`.
    async fn get_expired(&self, now: u64) -> Result<Vec<Task>, StoreError>;
}
