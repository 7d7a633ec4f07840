// src/model/allocation.rs

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::model::types::{ClientId, DemandKey, Period, ProductCode, Quantity, PUSH_SINK};

/// Cumulative quantity per `(period, product, client)` cell, plus the
/// overflow sink per `(period, product)`.
///
/// Sparse: a cell that was never written reads as zero. The sink lives in its
/// own map, so a client whose id happens to be `PUSH` never shares its cell.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AllocationTable {
    cells: BTreeMap<DemandKey, Quantity>,
    pushed: BTreeMap<(Period, ProductCode), Quantity>,
}

impl AllocationTable {
    pub fn add(&mut self, key: DemandKey, quantity: Quantity) {
        if quantity == 0 {
            return;
        }
        *self.cells.entry(key).or_insert(0) += quantity;
    }

    /// Books stock left unclaimed at the end of `period`.
    pub fn add_pushed(&mut self, period: Period, product: &str, quantity: Quantity) {
        if quantity == 0 {
            return;
        }
        *self.pushed.entry((period, product.to_string())).or_insert(0) += quantity;
    }

    pub fn get(&self, key: &DemandKey) -> Quantity {
        self.cells.get(key).copied().unwrap_or(0)
    }

    /// Value of one client cell addressed by its parts.
    pub fn cell(&self, period: Period, product: &str, client: &str) -> Quantity {
        self.get(&DemandKey::new(period, product, client))
    }

    /// Overflow recorded for `(period, product)`.
    pub fn pushed(&self, period: Period, product: &str) -> Quantity {
        self.pushed
            .get(&(period, product.to_string()))
            .copied()
            .unwrap_or(0)
    }

    pub fn cells(&self) -> impl Iterator<Item = (&DemandKey, Quantity)> {
        self.cells.iter().map(|(k, q)| (k, *q))
    }

    /// `(period, product)` pairs that hold at least one non-zero cell or overflow.
    pub fn rows(&self) -> BTreeSet<(Period, ProductCode)> {
        self.cells
            .keys()
            .map(|k| (k.period, k.product.clone()))
            .chain(self.pushed.keys().cloned())
            .collect()
    }

    /// Total handed to clients.
    pub fn client_total(&self) -> Quantity {
        self.cells.values().sum()
    }

    /// Total swept into the overflow sink.
    pub fn push_total(&self) -> Quantity {
        self.pushed.values().sum()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty() && self.pushed.is_empty()
    }
}

/// One grant or sweep made by the engine.
///
/// `served_period` is when the stock was handed out; `demand_period` is the
/// period of the demand line it satisfied. They differ only when older demand
/// is retried. Sweeps are written with `PUSH` as the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AllocationEvent {
    #[serde(rename = "MES Asignacion")]
    pub served_period: Period,
    #[serde(rename = "MES")]
    pub demand_period: Period,
    #[serde(rename = "Codigo")]
    pub product: ProductCode,
    #[serde(rename = "Cliente")]
    pub client: ClientId,
    #[serde(rename = "Cantidad")]
    pub quantity: Quantity,
    #[serde(skip)]
    pub pushed: bool,
}

impl AllocationEvent {
    /// A grant to the client of `key`.
    pub fn grant(served_period: Period, key: &DemandKey, quantity: Quantity) -> Self {
        Self {
            served_period,
            demand_period: key.period,
            product: key.product.clone(),
            client: key.client.clone(),
            quantity,
            pushed: false,
        }
    }

    /// Stock of `product` nobody claimed in `period`.
    pub fn sweep(period: Period, product: &str, quantity: Quantity) -> Self {
        Self {
            served_period: period,
            demand_period: period,
            product: product.to_string(),
            client: PUSH_SINK.to_string(),
            quantity,
            pushed: true,
        }
    }

    pub fn is_push(&self) -> bool {
        self.pushed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn untouched_cells_read_as_zero() {
        let table = AllocationTable::default();
        assert_eq!(table.cell(1, "P1", "A"), 0);
        assert_eq!(table.pushed(1, "P1"), 0);
        assert!(table.is_empty());
    }

    #[test]
    fn cells_accumulate_and_split_push_from_clients() {
        let mut table = AllocationTable::default();
        table.add(DemandKey::new(1, "P1", "A"), 4);
        table.add(DemandKey::new(1, "P1", "A"), 2);
        table.add_pushed(1, "P1", 3);
        table.add(DemandKey::new(2, "P2", "B"), 0);
        table.add_pushed(3, "P1", 1);

        assert_eq!(table.cell(1, "P1", "A"), 6);
        assert_eq!(table.client_total(), 6);
        assert_eq!(table.push_total(), 4);
        assert_eq!(table.rows().len(), 2);
    }

    #[test]
    fn a_client_named_like_the_sink_keeps_its_own_cell() {
        let mut table = AllocationTable::default();
        table.add(DemandKey::new(1, "P1", PUSH_SINK), 4);
        table.add_pushed(1, "P1", 6);

        assert_eq!(table.cell(1, "P1", PUSH_SINK), 4);
        assert_eq!(table.pushed(1, "P1"), 6);
        assert_eq!(table.client_total(), 4);
        assert_eq!(table.push_total(), 6);

        let event = AllocationEvent::grant(1, &DemandKey::new(1, "P1", PUSH_SINK), 4);
        assert!(!event.is_push());
        assert!(AllocationEvent::sweep(1, "P1", 6).is_push());
    }
}
