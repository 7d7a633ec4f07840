// src/strategy/implementations.rs

use std::collections::BTreeMap;

use tracing::debug;

use crate::allocation::config::PolicyKind;
use crate::allocation::state::AllocationState;
use crate::model::types::{Period, ProductCode, Quantity};
use crate::strategy::traits::{AllocationPolicy, PeriodReport};

/// Builds the policy selected in the configuration.
pub fn build_policy(kind: PolicyKind) -> Box<dyn AllocationPolicy> {
    match kind {
        PolicyKind::CarriedFlow => Box::new(CarriedFlowPolicy::new()),
        PolicyKind::PushOverflow => Box::new(PushOverflowPolicy::new()),
    }
}

// =========================================================================
// 1. Carried Flow Policy
// =========================================================================

/// Banks unconsumed stock per product and lets it serve later periods.
///
/// Only the current period's demand is served; a line left short stays
/// pending and is not retried in later periods.
#[derive(Debug, Clone, Default)]
pub struct CarriedFlowPolicy {
    flow: BTreeMap<ProductCode, Quantity>,
}

impl CarriedFlowPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current running balance of a product.
    pub fn balance(&self, product: &str) -> Quantity {
        self.flow.get(product).copied().unwrap_or(0)
    }
}

impl AllocationPolicy for CarriedFlowPolicy {
    fn kind(&self) -> PolicyKind {
        PolicyKind::CarriedFlow
    }

    fn allocate_period(&mut self, period: Period, state: &mut AllocationState) -> PeriodReport {
        // 1. Inflow: this period's supply joins the running balance
        // (bounded by the ledger total checked at load)
        for entry in state.stock.entries_in(period) {
            let balance = self.flow.entry(entry.product.clone()).or_insert(0);
            *balance = balance.saturating_add(entry.available());
        }

        // 2. Serve this period's pending demand, best rank first
        let mut granted = 0;
        for line in state.demand.pending_in(period, &state.priorities) {
            let product = state.demand.line(line).key.product.clone();
            let balance = self.balance(&product);
            if balance == 0 {
                continue;
            }

            let take = state.grant(line, period, balance);
            // Keep the ledger in step with the balance, oldest stock first.
            let consumed = state.stock.consume_oldest_first(&product, period, take);
            debug_assert_eq!(consumed, take);

            if let Some(balance) = self.flow.get_mut(&product) {
                *balance -= take;
            }
            granted += take;
        }

        debug!("period {}: granted {} from carried flow", period, granted);

        // 3. Snapshot of what is banked for the next period
        PeriodReport {
            period,
            granted,
            swept: 0,
            closing: self.flow.clone(),
        }
    }
}

// =========================================================================
// 2. Push Overflow Policy
// =========================================================================

/// Moves leftovers into the next period's ledger, retries all older unmet
/// demand each period, and reports what is still unclaimed at period end
/// under the `PUSH` column.
///
/// The sweep only records the leftover; the units stay on the ledger and are
/// moved forward by the next period's fold.
#[derive(Debug, Clone, Default)]
pub struct PushOverflowPolicy {
    previous: Option<Period>,
}

impl PushOverflowPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Moves whatever the previous period left onto this period's entries.
    fn fold_previous(&self, period: Period, state: &mut AllocationState) {
        let Some(previous) = self.previous else {
            return;
        };

        let leftovers: Vec<(ProductCode, Quantity)> = state
            .stock
            .entries_in(previous)
            .filter(|e| e.remaining > 0)
            .map(|e| (e.product.clone(), e.remaining))
            .collect();

        for (product, quantity) in leftovers {
            if let Some(old) = state.stock.get_mut(previous, &product) {
                old.remaining = 0;
            }
            let entry = state.stock.entry_mut(period, &product);
            entry.carried_in = entry.carried_in.saturating_add(quantity);
            entry.remaining = entry.remaining.saturating_add(quantity);
            debug!(
                "carried {} of {} from period {} into {}",
                quantity, product, previous, period
            );
        }
    }
}

impl AllocationPolicy for PushOverflowPolicy {
    fn kind(&self) -> PolicyKind {
        PolicyKind::PushOverflow
    }

    fn allocate_period(&mut self, period: Period, state: &mut AllocationState) -> PeriodReport {
        // 1. Carry the previous period's remainder forward
        self.fold_previous(period, state);

        // 2. Retry every pending line up to this period, best rank first
        let mut granted = 0;
        for line in state.demand.pending_up_to(period, &state.priorities) {
            let product = state.demand.line(line).key.product.clone();
            let remaining = state.stock.get(period, &product).map_or(0, |e| e.remaining);
            if remaining == 0 {
                continue;
            }

            let take = state.grant(line, period, remaining);
            if let Some(entry) = state.stock.get_mut(period, &product) {
                entry.remaining -= take;
            }
            granted += take;
        }

        // 3. Whatever nobody claimed goes to the sink
        let leftovers: Vec<(ProductCode, Quantity)> = state
            .stock
            .entries_in(period)
            .map(|e| (e.product.clone(), e.remaining))
            .collect();

        let mut swept = 0;
        for (product, quantity) in &leftovers {
            state.sweep(period, product, *quantity);
            swept += quantity;
        }

        debug!(
            "period {}: granted {}, {} left unclaimed",
            period, granted, swept
        );

        self.previous = Some(period);
        PeriodReport {
            period,
            granted,
            swept,
            closing: leftovers.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::demand::DemandLedger;
    use crate::model::priority::PriorityTable;
    use crate::model::stock::StockLedger;
    use crate::model::types::{DemandKey, DEFAULT_RANK};

    fn state(stock: Vec<(Period, &str, i64)>, demand: Vec<(Period, &str, &str, i64)>) -> AllocationState {
        AllocationState::new(
            StockLedger::from_rows(stock.into_iter().map(|(p, c, q)| (p, c.to_string(), q))).unwrap(),
            DemandLedger::from_rows(
                demand
                    .into_iter()
                    .map(|(p, c, k, q)| (p, c.to_string(), k.to_string(), q)),
            )
            .unwrap(),
            PriorityTable::from_raw(vec![("A", "1"), ("B", "2")], DEFAULT_RANK),
        )
    }

    #[test]
    fn carried_flow_banks_leftovers_for_later_demand() {
        let mut state = state(
            vec![(1, "P1", 10), (2, "P1", 1)],
            vec![(1, "P1", "A", 4), (2, "P1", "B", 8)],
        );
        let mut policy = CarriedFlowPolicy::new();

        let first = policy.allocate_period(1, &mut state);
        assert_eq!(first.granted, 4);
        assert_eq!(first.closing.get("P1"), Some(&6));

        let second = policy.allocate_period(2, &mut state);
        assert_eq!(second.granted, 7);
        assert_eq!(second.closing.get("P1"), Some(&0));
        assert_eq!(state.table.cell(2, "P1", "B"), 7);
        assert_eq!(state.stock.remaining_up_to(2).get("P1"), Some(&0));
    }

    #[test]
    fn carried_flow_does_not_retry_older_demand() {
        let mut state = state(
            vec![(1, "P1", 2), (2, "P1", 10)],
            vec![(1, "P1", "A", 5), (2, "P1", "B", 1)],
        );
        let mut policy = CarriedFlowPolicy::new();
        policy.allocate_period(1, &mut state);
        let report = policy.allocate_period(2, &mut state);

        assert_eq!(state.demand.get(&DemandKey::new(1, "P1", "A")).unwrap().pending, 3);
        assert_eq!(report.closing.get("P1"), Some(&9));
    }

    #[test]
    fn push_overflow_retries_older_demand_and_sweeps_leftovers() {
        let mut state = state(
            vec![(1, "P1", 2), (2, "P1", 10)],
            vec![(1, "P1", "A", 5), (2, "P1", "B", 1)],
        );
        let mut policy = PushOverflowPolicy::new();

        let first = policy.allocate_period(1, &mut state);
        assert_eq!((first.granted, first.swept), (2, 0));

        let second = policy.allocate_period(2, &mut state);
        assert_eq!(second.granted, 4);
        assert_eq!(second.swept, 6);
        // The retried line keeps its own period in the allocation table.
        assert_eq!(state.table.cell(1, "P1", "A"), 5);
        assert_eq!(state.table.cell(2, "P1", "B"), 1);
        assert_eq!(state.table.pushed(2, "P1"), 6);
    }

    #[test]
    fn push_overflow_folds_remainder_into_next_period() {
        let mut state = state(
            vec![(1, "P1", 10), (3, "P1", 1)],
            vec![(1, "P1", "A", 4), (2, "P1", "B", 3)],
        );
        let mut policy = PushOverflowPolicy::new();
        policy.allocate_period(1, &mut state);
        let second = policy.allocate_period(2, &mut state);

        let carried = state.stock.get(2, "P1").unwrap();
        assert_eq!(carried.carried_in, 6);
        assert_eq!(carried.remaining, 3);
        assert_eq!(state.stock.get(1, "P1").unwrap().remaining, 0);
        assert_eq!(second.closing.get("P1"), Some(&3));
        assert_eq!(state.table.pushed(1, "P1"), 6);
    }
}
