// src/model/stock.rs

use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use crate::error::{AllocationError, Result};
use crate::io::schema::{STOCK_DISPONIBLE, STOCK_TABLE};
use crate::model::types::{Period, ProductCode, Quantity};

/// Physical supply of one product in one period.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockEntry {
    pub period: Period,
    pub product: ProductCode,
    /// Quantity read from the input table.
    pub supplied: Quantity,
    /// Units moved in from the previous period (push-overflow only).
    pub carried_in: Quantity,
    /// Units not yet handed out. Never exceeds `available()`.
    pub remaining: Quantity,
}

impl StockEntry {
    fn new(period: Period, product: ProductCode, supplied: Quantity) -> Self {
        Self {
            period,
            product,
            supplied,
            carried_in: 0,
            remaining: supplied,
        }
    }

    pub fn available(&self) -> Quantity {
        self.supplied + self.carried_in
    }
}

/// Per `(period, product)` supply, the source of truth for physical stock.
#[derive(Debug, Clone, Default)]
pub struct StockLedger {
    entries: BTreeMap<(Period, ProductCode), StockEntry>,
    dropped: usize,
}

impl StockLedger {
    /// Loads `(period, product, quantity)` rows.
    ///
    /// Rows with a quantity of zero or less never take part in allocation and
    /// are dropped here. Repeated `(period, product)` rows add up.
    ///
    /// The grand total must fit in a [`Quantity`]. Every entry, flow balance
    /// and carried amount is bounded by it, so later sums cannot overflow.
    pub fn from_rows<I>(rows: I) -> Result<Self>
    where
        I: IntoIterator<Item = (Period, ProductCode, i64)>,
    {
        let mut ledger = Self::default();
        let mut total: Quantity = 0;
        for (period, product, quantity) in rows {
            if quantity <= 0 {
                ledger.dropped += 1;
                continue;
            }
            let quantity = quantity as Quantity;
            total = total.checked_add(quantity).ok_or_else(|| AllocationError::Overflow {
                table: STOCK_TABLE.to_string(),
                column: STOCK_DISPONIBLE.to_string(),
                max: Quantity::MAX,
            })?;
            ledger
                .entries
                .entry((period, product.clone()))
                .and_modify(|e| {
                    e.supplied += quantity;
                    e.remaining += quantity;
                })
                .or_insert_with(|| StockEntry::new(period, product, quantity));
        }
        Ok(ledger)
    }

    /// Keeps only the given products. Returns how many entries were removed.
    pub fn retain_products(&mut self, products: &BTreeSet<ProductCode>) -> usize {
        let before = self.entries.len();
        self.entries.retain(|(_, code), _| products.contains(code));
        before - self.entries.len()
    }

    /// Rows discarded at load time for having no supply.
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    pub fn products(&self) -> BTreeSet<ProductCode> {
        self.entries.keys().map(|(_, code)| code.clone()).collect()
    }

    pub fn periods(&self) -> BTreeSet<Period> {
        self.entries.keys().map(|(period, _)| *period).collect()
    }

    pub fn get(&self, period: Period, product: &str) -> Option<&StockEntry> {
        self.entries.get(&(period, product.to_string()))
    }

    pub fn get_mut(&mut self, period: Period, product: &str) -> Option<&mut StockEntry> {
        self.entries.get_mut(&(period, product.to_string()))
    }

    /// Entry for `(period, product)`, created empty if the input had none.
    pub fn entry_mut(&mut self, period: Period, product: &str) -> &mut StockEntry {
        self.entries
            .entry((period, product.to_string()))
            .or_insert_with(|| StockEntry::new(period, product.to_string(), 0))
    }

    /// Available quantity for `(period, product)`, zero when absent.
    pub fn available(&self, period: Period, product: &str) -> Quantity {
        self.get(period, product).map_or(0, StockEntry::available)
    }

    /// Entries of one period in product order.
    pub fn entries_in(&self, period: Period) -> impl Iterator<Item = &StockEntry> {
        self.entries
            .values()
            .filter(move |entry| entry.period == period)
    }

    pub fn entries(&self) -> impl Iterator<Item = &StockEntry> {
        self.entries.values()
    }

    /// Remaining quantity per product over all periods up to and including `period`.
    pub fn remaining_up_to(&self, period: Period) -> BTreeMap<ProductCode, Quantity> {
        let mut totals = BTreeMap::new();
        for entry in self.entries.values().take_while(|e| e.period <= period) {
            *totals.entry(entry.product.clone()).or_insert(0) += entry.remaining;
        }
        totals
    }

    /// Takes up to `quantity` units of `product` from entries up to `period`,
    /// oldest period first. Returns what was actually taken.
    pub fn consume_oldest_first(&mut self, product: &str, period: Period, quantity: Quantity) -> Quantity {
        let mut left = quantity;
        for entry in self
            .entries
            .values_mut()
            .take_while(|e| e.period <= period)
            .filter(|e| e.product == product && e.remaining > 0)
        {
            if left == 0 {
                break;
            }
            let take = left.min(entry.remaining);
            entry.remaining -= take;
            left -= take;
            debug!(
                "consumed {} of {} from period {} stock",
                take, entry.product, entry.period
            );
        }
        quantity - left
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ledger() -> StockLedger {
        StockLedger::from_rows(vec![
            (1, "P1".to_string(), 10),
            (1, "P2".to_string(), 0),
            (2, "P1".to_string(), 5),
            (2, "P2".to_string(), -3),
            (3, "P1".to_string(), 2),
            (3, "P1".to_string(), 1),
        ])
        .unwrap()
    }

    #[test]
    fn drops_empty_and_negative_rows() {
        let ledger = ledger();
        assert_eq!(ledger.dropped(), 2);
        assert_eq!(ledger.len(), 3);
        assert!(ledger.get(1, "P2").is_none());
    }

    #[test]
    fn repeated_rows_add_up() {
        let ledger = ledger();
        let entry = ledger.get(3, "P1").unwrap();
        assert_eq!(entry.supplied, 3);
        assert_eq!(entry.remaining, 3);
    }

    #[test]
    fn remaining_is_summed_up_to_period() {
        let ledger = ledger();
        assert_eq!(ledger.remaining_up_to(1).get("P1"), Some(&10));
        assert_eq!(ledger.remaining_up_to(2).get("P1"), Some(&15));
        assert_eq!(ledger.remaining_up_to(3).get("P1"), Some(&18));
    }

    #[test]
    fn consumption_takes_oldest_stock_first() {
        let mut ledger = ledger();
        let taken = ledger.consume_oldest_first("P1", 2, 12);

        assert_eq!(taken, 12);
        assert_eq!(ledger.get(1, "P1").unwrap().remaining, 0);
        assert_eq!(ledger.get(2, "P1").unwrap().remaining, 3);
        // Later periods are out of reach.
        assert_eq!(ledger.get(3, "P1").unwrap().remaining, 3);
    }

    #[test]
    fn consumption_stops_at_what_is_available() {
        let mut ledger = ledger();
        assert_eq!(ledger.consume_oldest_first("P1", 1, 50), 10);
        assert_eq!(ledger.consume_oldest_first("P9", 3, 1), 0);
    }

    #[test]
    fn supply_adding_up_past_the_maximum_is_rejected() {
        let rows = vec![
            (1, "P1".to_string(), i64::MAX),
            (2, "P1".to_string(), i64::MAX),
            (3, "P2".to_string(), i64::MAX),
        ];
        let err = StockLedger::from_rows(rows).unwrap_err();
        assert!(matches!(err, AllocationError::Overflow { .. }));

        let fits = vec![(1, "P1".to_string(), i64::MAX), (1, "P1".to_string(), i64::MAX)];
        let ledger = StockLedger::from_rows(fits).unwrap();
        assert_eq!(ledger.get(1, "P1").unwrap().supplied, 2 * i64::MAX as Quantity);
    }

    #[test]
    fn retain_products_filters_entries() {
        let mut ledger = ledger();
        let keep: BTreeSet<ProductCode> = ["P9".to_string()].into_iter().collect();
        assert_eq!(ledger.retain_products(&keep), 3);
        assert!(ledger.is_empty());
    }
}
