use std::collections::BTreeSet;

use alloy_primitives::Address;
use serde::{Deserialize, Serialize};

/// A worker's advertised willingness to perform work, as held by the
/// capability index (C2) and consulted by the worker directory (C3).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Offer {
    pub address: Address,
    pub endpoint: String,
    pub reputation: u32,
    pub capabilities: BTreeSet<String>,
    pub pricing_wei_per_task: u128,
    pub is_active: bool,
}

impl Offer {
    pub fn covers(&self, required: &BTreeSet<String>) -> bool {
        self.is_active && required.is_subset(&self.capabilities)
    }

    pub fn affordable(&self, budget: u128) -> bool {
        self.pricing_wei_per_task <= budget
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn offer(caps: &[&str], active: bool) -> Offer {
        Offer {
            address: Address::ZERO,
            endpoint: "https://worker.example/run".to_string(),
            reputation: 10,
            capabilities: caps.iter().map(|c| c.to_string()).collect(),
            pricing_wei_per_task: 100,
            is_active: active,
        }
    }

    #[test]
    fn covers_requires_superset_and_active() {
        let required: BTreeSet<String> = ["writer".to_string()].into_iter().collect();
        assert!(offer(&["writer", "researcher"], true).covers(&required));
        assert!(!offer(&["writer"], false).covers(&required));
        assert!(!offer(&["researcher"], true).covers(&required));
    }

    #[test]
    fn affordable_checks_price_against_budget() {
        let o = offer(&["writer"], true);
        assert!(o.affordable(100));
        assert!(!o.affordable(99));
    }
}
