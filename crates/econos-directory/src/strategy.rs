use econos_types::{Address, Offer};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SelectionStrategy {
    Reputation,
    Cheapest,
    RoundRobin,
    Direct(Address),
    Weighted { reputation_weight: f64, price_weight: f64 },
}

impl SelectionStrategy {
    pub const DEFAULT_WEIGHTED: SelectionStrategy = SelectionStrategy::Weighted {
        reputation_weight: 0.7,
        price_weight: 0.3,
    };
}

/// Pure rank over a slice of already-filtered candidates. `round_robin_index`
/// is the caller-managed process-local counter for `RoundRobin`; every other
/// variant ignores it.
pub fn rank<'a>(
    strategy: SelectionStrategy,
    candidates: &'a [Offer],
    round_robin_index: usize,
) -> Option<&'a Offer> {
    if candidates.is_empty() {
        return None;
    }
    match strategy {
        SelectionStrategy::Reputation => candidates.iter().max_by(|a, b| {
            a.reputation
                .cmp(&b.reputation)
                .then_with(|| b.pricing_wei_per_task.cmp(&a.pricing_wei_per_task))
                .then_with(|| b.address.cmp(&a.address))
        }),
        SelectionStrategy::Cheapest => candidates.iter().min_by(|a, b| {
            a.pricing_wei_per_task
                .cmp(&b.pricing_wei_per_task)
                .then_with(|| b.reputation.cmp(&a.reputation))
        }),
        SelectionStrategy::RoundRobin => {
            candidates.get(round_robin_index % candidates.len())
        }
        SelectionStrategy::Direct(address) => candidates.iter().find(|o| o.address == address),
        SelectionStrategy::Weighted {
            reputation_weight,
            price_weight,
        } => rank_weighted(candidates, reputation_weight, price_weight),
    }
}

fn rank_weighted(candidates: &[Offer], w_r: f64, w_p: f64) -> Option<&Offer> {
    let min_price = candidates.iter().map(|o| o.pricing_wei_per_task).min()?;
    let max_price = candidates.iter().map(|o| o.pricing_wei_per_task).max()?;
    let price_span = (max_price - min_price) as f64;

    candidates
        .iter()
        .map(|o| {
            let r = o.reputation as f64 / 100.0;
            let p = if price_span == 0.0 {
                1.0
            } else {
                (max_price - o.pricing_wei_per_task) as f64 / price_span
            };
            (o, w_r * r + w_p * p)
        })
        .max_by(|(_, a), (_, b)| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal))
        .map(|(o, _)| o)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    fn offer(address: u8, reputation: u32, price: u128) -> Offer {
        Offer {
            address: Address::repeat_byte(address),
            endpoint: "https://worker.example/run".to_string(),
            reputation,
            capabilities: BTreeSet::new(),
            pricing_wei_per_task: price,
            is_active: true,
        }
    }

    #[test]
    fn reputation_tie_breaks_on_price_then_address() {
        let candidates = vec![offer(1, 80, 100), offer(2, 80, 50), offer(3, 60, 10)];
        let chosen = rank(SelectionStrategy::Reputation, &candidates, 0).unwrap();
        assert_eq!(chosen.address, Address::repeat_byte(2));
    }

    #[test]
    fn cheapest_tie_breaks_on_reputation() {
        let candidates = vec![offer(1, 80, 50), offer(2, 90, 50)];
        let chosen = rank(SelectionStrategy::Cheapest, &candidates, 0).unwrap();
        assert_eq!(chosen.address, Address::repeat_byte(2));
    }

    #[test]
    fn round_robin_rotates_by_index() {
        let candidates = vec![offer(1, 80, 50), offer(2, 80, 50), offer(3, 80, 50)];
        assert_eq!(
            rank(SelectionStrategy::RoundRobin, &candidates, 0).unwrap().address,
            Address::repeat_byte(1)
        );
        assert_eq!(
            rank(SelectionStrategy::RoundRobin, &candidates, 1).unwrap().address,
            Address::repeat_byte(2)
        );
        assert_eq!(
            rank(SelectionStrategy::RoundRobin, &candidates, 3).unwrap().address,
            Address::repeat_byte(1)
        );
    }

    #[test]
    fn direct_returns_none_when_address_absent() {
        let candidates = vec![offer(1, 80, 50)];
        assert!(rank(SelectionStrategy::Direct(Address::repeat_byte(9)), &candidates, 0).is_none());
    }

    #[test]
    fn weighted_prefers_cheaper_reputable_offer() {
        let candidates = vec![offer(1, 100, 100), offer(2, 90, 10)];
        let chosen = rank(SelectionStrategy::DEFAULT_WEIGHTED, &candidates, 0).unwrap();
        assert_eq!(chosen.address, Address::repeat_byte(2));
    }
}
