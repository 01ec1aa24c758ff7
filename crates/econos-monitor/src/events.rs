use econos_types::{Task, TaskId};

/// Replaces the source's event-emitter callbacks (`onTaskComplete`,
/// `onTaskRefund`, `onTaskFail`) with a typed broadcast channel every
/// interested component can subscribe to independently.
#[derive(Debug, Clone)]
pub enum LifecycleEvent {
    /// The on-chain `TaskCreated` log was observed and the local record
    /// caught up to `Created`.
    Created { task_id: TaskId },
    Completed { task: Task },
    Refunded { task: Task },
    /// Emitted whenever the monitor drives a task to `Failed`, whether
    /// because a chain call could not be recorded locally or because
    /// `refund_and_slash` itself failed.
    Failed { task_id: TaskId, reason: String },
}
