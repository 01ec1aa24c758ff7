use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use econos_chain::ChainGateway;
use econos_types::{Offer, Task};

use crate::error::DirectoryError;
use crate::strategy::{rank, SelectionStrategy};

const DEFAULT_MIN_REPUTATION: u32 = 50;

/// Resolves active workers from the registry plus a capability snapshot,
/// filtering by reputation/capabilities/budget and applying a selection
/// strategy over the survivors (C3).
pub struct WorkerDirectory {
    chain: Arc<dyn ChainGateway>,
    min_reputation: u32,
    round_robin_state: Mutex<HashMap<String, usize>>,
}

impl WorkerDirectory {
    pub fn new(chain: Arc<dyn ChainGateway>) -> Self {
        Self::with_min_reputation(chain, DEFAULT_MIN_REPUTATION)
    }

    pub fn with_min_reputation(chain: Arc<dyn ChainGateway>, min_reputation: u32) -> Self {
        Self {
            chain,
            min_reputation,
            round_robin_state: Mutex::new(HashMap::new()),
        }
    }

    pub async fn select_worker(
        &self,
        task: &Task,
        offers: &[Offer],
        strategy: SelectionStrategy,
        group_key: Option<&str>,
    ) -> Result<Offer, DirectoryError> {
        let mut required = task.required_capabilities.clone();
        required.insert(task.task_type.label().to_string());

        let mut survivors = Vec::new();
        for offer in offers {
            if !self
                .chain
                .is_worker_active(offer.address)
                .await
                .unwrap_or(false)
            {
                continue;
            }
            if offer.reputation < self.min_reputation {
                continue;
            }
            if !required.is_subset(&offer.capabilities) {
                continue;
            }
            if offer.pricing_wei_per_task > task.budget {
                continue;
            }
            survivors.push(offer.clone());
        }

        let round_robin_index = if matches!(strategy, SelectionStrategy::RoundRobin) {
            let key = group_key.unwrap_or_else(|| task.task_type.label()).to_string();
            let mut state = self.round_robin_state.lock().unwrap();
            let counter = state.entry(key).or_insert(0);
            let index = *counter;
            *counter += 1;
            index
        } else {
            0
        };

        rank(strategy, &survivors, round_robin_index)
            .cloned()
            .ok_or(DirectoryError::NoEligibleWorker)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use econos_chain::FakeChainGateway;
    use econos_types::{Address, TaskId, TaskInput};

    fn offer(address: Address, reputation: u32, price: u128, caps: &[&str]) -> Offer {
        Offer {
            address,
            endpoint: "https://worker.example/run".to_string(),
            reputation,
            capabilities: caps.iter().map(|c| c.to_string()).collect(),
            pricing_wei_per_task: price,
            is_active: true,
        }
    }

    fn task(budget: u128) -> Task {
        let input = TaskInput::SummaryGeneration {
            text: "hi".to_string(),
            max_sentences: 1,
        };
        Task::new(TaskId::random(), input, None, 100, budget, 0).unwrap()
    }

    #[tokio::test]
    async fn drops_worker_below_min_reputation() {
        let chain = Arc::new(FakeChainGateway::new());
        let active = Address::repeat_byte(1);
        chain.activate_worker(active);
        let directory = WorkerDirectory::new(chain);

        let offers = vec![offer(active, 40, 10, &["summary-generation"])];
        let t = task(100);
        let err = directory
            .select_worker(&t, &offers, SelectionStrategy::Reputation, None)
            .await
            .unwrap_err();
        assert!(matches!(err, DirectoryError::NoEligibleWorker));
    }

    #[tokio::test]
    async fn drops_inactive_worker() {
        let chain = Arc::new(FakeChainGateway::new());
        let directory = WorkerDirectory::new(chain);
        let offers = vec![offer(Address::repeat_byte(2), 80, 10, &["summary-generation"])];
        let t = task(100);
        let err = directory
            .select_worker(&t, &offers, SelectionStrategy::Reputation, None)
            .await
            .unwrap_err();
        assert!(matches!(err, DirectoryError::NoEligibleWorker));
    }

    #[tokio::test]
    async fn selects_eligible_worker_by_strategy() {
        let chain = Arc::new(FakeChainGateway::new());
        let active = Address::repeat_byte(3);
        chain.activate_worker(active);
        let directory = WorkerDirectory::new(chain);
        let offers = vec![offer(active, 80, 10, &["summary-generation"])];
        let t = task(100);
        let selected = directory
            .select_worker(&t, &offers, SelectionStrategy::Cheapest, None)
            .await
            .unwrap();
        assert_eq!(selected.address, active);
    }
}
