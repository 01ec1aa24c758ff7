use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use econos_chain::{ChainEvent, ChainGateway};
use econos_core::{can_refund, TaskManager};
use econos_types::{now_unix_secs, Address, TaskId, TaskStatus, B256};
use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;

use crate::events::LifecycleEvent;

const DEFAULT_EXPIRATION_CHECK_INTERVAL: Duration = Duration::from_secs(60);
const EVENT_CHANNEL_CAPACITY: usize = 1024;

/// Event demultiplexer + deadline sweeper (C9): the only component that
/// drives a task to `Completed`/`Refunded`/`Failed` off-chain observation
/// rather than direct orchestrator action. Never propagates its own
/// errors -- every failure becomes a `Failed` transition plus a
/// `LifecycleEvent::Failed`, per `spec.md` §7's propagation policy.
pub struct LifecycleMonitor {
    chain: Arc<dyn ChainGateway>,
    tasks: Arc<TaskManager>,
    expiration_check_interval: Duration,
    event_tx: broadcast::Sender<LifecycleEvent>,
    demux_handle: Mutex<Option<JoinHandle<()>>>,
    sweeper_handle: Mutex<Option<JoinHandle<()>>>,
    running: AtomicBool,
}

impl LifecycleMonitor {
    pub fn new(chain: Arc<dyn ChainGateway>, tasks: Arc<TaskManager>) -> Self {
        Self::with_interval(chain, tasks, DEFAULT_EXPIRATION_CHECK_INTERVAL)
    }

    pub fn with_interval(
        chain: Arc<dyn ChainGateway>,
        tasks: Arc<TaskManager>,
        expiration_check_interval: Duration,
    ) -> Self {
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            chain,
            tasks,
            expiration_check_interval,
            event_tx,
            demux_handle: Mutex::new(None),
            sweeper_handle: Mutex::new(None),
            running: AtomicBool::new(false),
        }
    }

    /// Each call gets its own receiver off a shared broadcast channel;
    /// dropping the receiver is the unsubscribe.
    pub fn subscribe(&self) -> broadcast::Receiver<LifecycleEvent> {
        self.event_tx.subscribe()
    }

    /// Spawns the event demultiplexer and deadline sweeper as independent
    /// `tokio::spawn` loops. Idempotent: a second `start` on an already
    /// running monitor is a no-op.
    pub async fn start(self: &Arc<Self>) {
        if self.running.swap(true, Ordering::SeqCst) {
            return;
        }

        let demux_this = Arc::clone(self);
        let mut chain_events = self.chain.subscribe();
        let demux = tokio::spawn(async move {
            loop {
                match chain_events.recv().await {
                    Ok(event) => demux_this.handle_chain_event(event).await,
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(
                            skipped,
                            "lifecycle monitor demultiplexer lagged behind chain event stream"
                        );
                    }
                    Err(broadcast::error::RecvError::Closed) => return,
                }
            }
        });

        let sweeper_this = Arc::clone(self);
        let interval = self.expiration_check_interval;
        let sweeper = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                sweeper_this.sweep_expired().await;
            }
        });

        *self.demux_handle.lock().await = Some(demux);
        *self.sweeper_handle.lock().await = Some(sweeper);
    }

    /// Idempotent: stopping an already-stopped monitor is a no-op.
    /// Aborting a `tokio::spawn` loop only takes effect at its next
    /// `.await` suspension point, so the in-flight iteration (a chain call
    /// or a sweep pass already under way) runs to completion before the
    /// loop actually stops -- awaiting the handle here blocks until that
    /// happens, draining any pending callback before `stop` returns.
    pub async fn stop(&self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            return;
        }
        if let Some(handle) = self.demux_handle.lock().await.take() {
            handle.abort();
            let _ = handle.await;
        }
        if let Some(handle) = self.sweeper_handle.lock().await.take() {
            handle.abort();
            let _ = handle.await;
        }
    }

    async fn handle_chain_event(&self, event: ChainEvent) {
        match event {
            ChainEvent::TaskCreated {
                task_id, worker, ..
            } => self.handle_task_created(task_id, worker).await,
            ChainEvent::TaskCompleted { task_id, result } => {
                self.handle_task_completed(task_id, result).await
            }
            ChainEvent::TaskRefunded { task_id } => self.handle_task_refunded(task_id).await,
        }
    }

    async fn handle_task_created(&self, task_id: TaskId, worker: Address) {
        let now = now_unix_secs();
        match self.tasks.get(task_id).await {
            Ok(Some(task)) if task.status == TaskStatus::Pending => {
                // The escrow tx hash is not carried on the event itself;
                // the orchestrator's own deposit call already recorded
                // it on the happy path. This path exists so a crash
                // between deposit and local recording still catches up.
                if let Err(err) = self
                    .tasks
                    .record_escrow_deposit(task_id, worker, B256::ZERO, now)
                    .await
                {
                    tracing::warn!(%task_id, %err, "failed to record on-chain TaskCreated locally");
                    return;
                }
                let _ = self.event_tx.send(LifecycleEvent::Created { task_id });
            }
            Ok(_) => {}
            Err(err) => {
                tracing::warn!(%task_id, %err, "TaskCreated event for an unknown local task");
            }
        }
    }

    async fn handle_task_completed(&self, task_id: TaskId, result: Vec<u8>) {
        let now = now_unix_secs();
        match self.tasks.record_completion(task_id, result, now).await {
            Ok(task) => {
                let _ = self.event_tx.send(LifecycleEvent::Completed { task });
            }
            Err(err) => {
                tracing::warn!(%task_id, %err, "could not record TaskCompleted");
                self.fail(task_id, err.to_string()).await;
            }
        }
    }

    async fn handle_task_refunded(&self, task_id: TaskId) {
        let now = now_unix_secs();
        match self.tasks.record_refund(task_id, now).await {
            Ok(task) => {
                let _ = self.event_tx.send(LifecycleEvent::Refunded { task });
            }
            Err(err) => {
                tracing::warn!(%task_id, %err, "could not record TaskRefunded");
            }
        }
    }

    /// `spec.md` §4.8(b): every `expirationCheckInterval`, reclaim funds
    /// for every task past its deadline. The actual `Refunded` transition
    /// happens when the resulting on-chain event reaches the
    /// demultiplexer, not here -- this only triggers the chain call.
    async fn sweep_expired(&self) {
        let now = now_unix_secs();
        let expired = match self.tasks.get_expired_tasks(now).await {
            Ok(tasks) => tasks,
            Err(err) => {
                tracing::error!(%err, "failed to list expired tasks");
                return;
            }
        };

        for task in expired {
            if !can_refund(task.status) {
                continue;
            }
            if let Err(err) = self.chain.refund_and_slash(task.task_id).await {
                tracing::warn!(task_id = %task.task_id, %err, "refund_and_slash failed, marking task failed");
                self.fail(task.task_id, err.to_string()).await;
            }
        }
    }

    async fn fail(&self, task_id: TaskId, reason: String) {
        let _ = self.tasks.record_failure(task_id, now_unix_secs()).await;
        let _ = self.event_tx.send(LifecycleEvent::Failed { task_id, reason });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use econos_chain::FakeChainGateway;
    use econos_store::InMemoryTaskStore;
    use econos_types::{AuthorizationRecord, TaskInput};

    fn input() -> TaskInput {
        TaskInput::SummaryGeneration {
            text: "hi".to_string(),
            max_sentences: 1,
        }
    }

    #[tokio::test]
    async fn sweeper_triggers_refund_and_demux_observes_refunded() {
        let chain = Arc::new(FakeChainGateway::new());
        let tasks = Arc::new(TaskManager::new(Arc::new(InMemoryTaskStore::new())));

        let id = TaskId::random();
        let worker = Address::repeat_byte(1);
        chain.activate_worker(worker);

        let now = now_unix_secs();
        let created_at = now.saturating_sub(100);
        let deadline = now.saturating_sub(50);
        tasks
            .create(id, input(), None, deadline, 100, created_at)
            .await
            .unwrap();
        chain.deposit_task(id, worker, 1, 100).await.unwrap();
        tasks
            .record_escrow_deposit(id, worker, B256::ZERO, created_at + 1)
            .await
            .unwrap();

        let monitor = Arc::new(LifecycleMonitor::with_interval(
            chain,
            Arc::clone(&tasks),
            Duration::from_millis(15),
        ));
        let mut sub = monitor.subscribe();
        monitor.start().await;

        let event = tokio::time::timeout(Duration::from_secs(2), sub.recv())
            .await
            .expect("sweeper should fire within the timeout")
            .unwrap();
        assert!(matches!(event, LifecycleEvent::Refunded { .. }));

        let task = tasks.get(id).await.unwrap().unwrap();
        assert_eq!(task.status, TaskStatus::Refunded);

        monitor.stop().await;
    }

    #[tokio::test]
    async fn demux_records_task_completed_from_chain_event() {
        let chain = Arc::new(FakeChainGateway::new());
        let tasks = Arc::new(TaskManager::new(Arc::new(InMemoryTaskStore::new())));

        let id = TaskId::random();
        let worker = Address::repeat_byte(2);
        let now = now_unix_secs();
        tasks
            .create(id, input(), None, now + 10_000, 100, now)
            .await
            .unwrap();
        tasks
            .record_escrow_deposit(id, worker, B256::ZERO, now)
            .await
            .unwrap();
        tasks
            .record_authorization(
                id,
                AuthorizationRecord {
                    signature: vec![1],
                    nonce: 0,
                    expires_at: now + 5_000,
                },
                now,
            )
            .await
            .unwrap();
        tasks.mark_running(id, now).await.unwrap();

        let monitor = Arc::new(LifecycleMonitor::with_interval(
            Arc::clone(&chain) as Arc<dyn ChainGateway>,
            Arc::clone(&tasks),
            Duration::from_secs(3600),
        ));
        let mut sub = monitor.subscribe();
        monitor.start().await;

        chain.complete_task(id, vec![0xab]);

        let event = tokio::time::timeout(Duration::from_secs(2), sub.recv())
            .await
            .expect("completion event should arrive")
            .unwrap();
        assert!(matches!(event, LifecycleEvent::Completed { .. }));

        let task = tasks.get(id).await.unwrap().unwrap();
        assert_eq!(task.status, TaskStatus::Completed);
        assert_eq!(task.result_hash, Some(vec![0xab]));

        monitor.stop().await;
    }

    #[tokio::test]
    async fn start_and_stop_are_idempotent() {
        let chain = Arc::new(FakeChainGateway::new());
        let tasks = Arc::new(TaskManager::new(Arc::new(InMemoryTaskStore::new())));
        let monitor = Arc::new(LifecycleMonitor::with_interval(
            chain,
            tasks,
            Duration::from_secs(3600),
        ));

        monitor.start().await;
        monitor.start().await;
        monitor.stop().await;
        monitor.stop().await;
    }
}
