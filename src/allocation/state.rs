// src/allocation/state.rs

use std::collections::BTreeSet;

use tracing::info;

use crate::allocation::config::AllocationConfig;
use crate::error::Result;
use crate::io::schema::InputTables;
use crate::model::allocation::{AllocationEvent, AllocationTable};
use crate::model::demand::DemandLedger;
use crate::model::priority::PriorityTable;
use crate::model::stock::StockLedger;
use crate::model::types::{Period, ProductCode, Quantity};

/// Everything one run mutates, owned by the run and handed to the policy
/// one period at a time.
#[derive(Debug, Clone)]
pub struct AllocationState {
    pub stock: StockLedger,
    pub demand: DemandLedger,
    pub priorities: PriorityTable,
    pub table: AllocationTable,
    pub events: Vec<AllocationEvent>,
}

impl AllocationState {
    /// Assembles the ledgers and keeps only products present in both stock and demand.
    pub fn new(mut stock: StockLedger, mut demand: DemandLedger, priorities: PriorityTable) -> Self {
        let valid: BTreeSet<ProductCode> = stock
            .products()
            .intersection(&demand.products())
            .cloned()
            .collect();

        let stock_excluded = stock.retain_products(&valid);
        let demand_excluded = demand.retain_products(&valid);

        info!(
            "{} products in both stock and demand; excluded {} stock entries and {} demand lines",
            valid.len(),
            stock_excluded,
            demand_excluded
        );

        Self {
            stock,
            demand,
            priorities,
            table: AllocationTable::default(),
            events: Vec::new(),
        }
    }

    /// Builds the ledgers from raw input rows.
    pub fn from_tables(tables: &InputTables, config: &AllocationConfig) -> Result<Self> {
        let stock = StockLedger::from_rows(
            tables
                .stock
                .iter()
                .map(|r| (r.period, r.product.clone(), r.quantity)),
        )?;
        let demand = DemandLedger::from_rows(
            tables
                .minimums
                .iter()
                .map(|r| (r.period, r.product.clone(), r.client.clone(), r.minimum)),
        )?;
        let priorities = PriorityTable::from_raw(
            tables
                .priorities
                .iter()
                .map(|r| (r.client.clone(), r.raw_rank.clone())),
            config.default_rank,
        );

        info!(
            "loaded {} stock entries ({} rows without supply dropped), {} demand lines ({} clamped to zero), {} clients ({} without a numeric rank)",
            stock.len(),
            stock.dropped(),
            demand.len(),
            demand.clamped(),
            priorities.len(),
            priorities.defaulted()
        );

        Ok(Self::new(stock, demand, priorities))
    }

    /// Periods to walk: every period with stock or demand, ascending.
    pub fn periods(&self) -> Vec<Period> {
        self.stock
            .periods()
            .union(&self.demand.periods())
            .copied()
            .collect()
    }

    /// Hands up to `limit` units to demand line `line` and books the grant.
    ///
    /// The cell written is the demand line's own key, so a retried line from
    /// an earlier period still accumulates in its original cell.
    pub fn grant(&mut self, line: usize, served_period: Period, limit: Quantity) -> Quantity {
        let granted = self.demand.record(line, limit);
        if granted == 0 {
            return 0;
        }

        let key = self.demand.line(line).key.clone();
        self.events.push(AllocationEvent::grant(served_period, &key, granted));
        self.table.add(key, granted);
        granted
    }

    /// Records `quantity` of `product` left over at the end of `period` in the overflow sink.
    pub fn sweep(&mut self, period: Period, product: &str, quantity: Quantity) {
        if quantity == 0 {
            return;
        }
        self.table.add_pushed(period, product, quantity);
        self.events
            .push(AllocationEvent::sweep(period, product, quantity));
    }
}
