use std::collections::HashMap;

use econos_types::Offer;

/// A point-in-time snapshot of every worker's offers, grouped by the task
/// type they serve. Consulted by the pipeline planner and worker
/// directory; never mutated in place.
#[derive(Debug, Clone, Default)]
pub struct CapabilitySummary {
    pub offers_by_task_type: HashMap<String, Vec<Offer>>,
}

impl CapabilitySummary {
    pub fn cheapest(&self, task_type: &str) -> Option<&Offer> {
        self.offers_by_task_type
            .get(task_type)?
            .iter()
            .filter(|o| o.is_active)
            .min_by_key(|o| o.pricing_wei_per_task)
    }

    pub fn price_range(&self, task_type: &str) -> Option<(u128, u128)> {
        let offers = self.offers_by_task_type.get(task_type)?;
        let mut prices = offers.iter().filter(|o| o.is_active).map(|o| o.pricing_wei_per_task);
        let first = prices.next()?;
        Some(prices.fold((first, first), |(lo, hi), p| (lo.min(p), hi.max(p))))
    }

    pub fn is_available(&self, task_type: &str) -> bool {
        self.offers_by_task_type
            .get(task_type)
            .is_some_and(|offers| offers.iter().any(|o| o.is_active))
    }
}
