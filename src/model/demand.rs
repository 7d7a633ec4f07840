// src/model/demand.rs

use std::collections::{BTreeSet, HashMap};

use tracing::warn;

use crate::error::{AllocationError, Result};
use crate::io::schema::{MINIMO, MINIMUM_TABLE};
use crate::model::priority::PriorityTable;
use crate::model::types::{ClientId, DemandKey, Period, ProductCode, Quantity};

/// Minimum a client expects for one product in one period.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DemandLine {
    pub key: DemandKey,
    pub minimum: Quantity,
    /// Part of `minimum` still unserved. Only ever goes down.
    pub pending: Quantity,
    pub allocated: Quantity,
}

/// Per `(period, product, client)` minimums and their running pending amount.
///
/// Lines are kept in the order their key first appeared in the input, which
/// is the tie-break whenever two clients share a rank.
#[derive(Debug, Clone, Default)]
pub struct DemandLedger {
    lines: Vec<DemandLine>,
    index: HashMap<DemandKey, usize>,
    clamped: usize,
}

impl DemandLedger {
    /// Loads `(period, product, client, minimum)` rows, summing rows that share a key.
    ///
    /// Fails if a key's sum or the total of all minimums leaves the
    /// representable range.
    pub fn from_rows<I>(rows: I) -> Result<Self>
    where
        I: IntoIterator<Item = (Period, ProductCode, ClientId, i64)>,
    {
        let mut keys: Vec<DemandKey> = Vec::new();
        let mut sums: HashMap<DemandKey, i64> = HashMap::new();

        for (period, product, client, minimum) in rows {
            let key = DemandKey::new(period, product, client);
            match sums.get_mut(&key) {
                Some(total) => {
                    *total = total.checked_add(minimum).ok_or_else(|| overflow(i64::MAX as u64))?;
                }
                None => {
                    sums.insert(key.clone(), minimum);
                    keys.push(key);
                }
            }
        }

        let mut ledger = Self::default();
        let mut grand_total: Quantity = 0;
        for key in keys {
            let total = sums[&key];
            let minimum = if total < 0 {
                warn!(
                    "minimum for {:?} adds up to {}, clamping to zero",
                    key, total
                );
                ledger.clamped += 1;
                0
            } else {
                total as Quantity
            };
            grand_total = grand_total
                .checked_add(minimum)
                .ok_or_else(|| overflow(Quantity::MAX))?;
            ledger.index.insert(key.clone(), ledger.lines.len());
            ledger.lines.push(DemandLine {
                key,
                minimum,
                pending: minimum,
                allocated: 0,
            });
        }
        Ok(ledger)
    }

    /// Keeps only lines for the given products. Returns how many were removed.
    pub fn retain_products(&mut self, products: &BTreeSet<ProductCode>) -> usize {
        let before = self.lines.len();
        self.lines.retain(|line| products.contains(&line.key.product));
        self.index = self
            .lines
            .iter()
            .enumerate()
            .map(|(i, line)| (line.key.clone(), i))
            .collect();
        before - self.lines.len()
    }

    /// Lines whose summed minimum was negative.
    pub fn clamped(&self) -> usize {
        self.clamped
    }

    pub fn products(&self) -> BTreeSet<ProductCode> {
        self.lines.iter().map(|l| l.key.product.clone()).collect()
    }

    pub fn periods(&self) -> BTreeSet<Period> {
        self.lines.iter().map(|l| l.key.period).collect()
    }

    /// Clients in order of first appearance.
    pub fn clients(&self) -> Vec<ClientId> {
        let mut seen = BTreeSet::new();
        self.lines
            .iter()
            .filter(|l| seen.insert(l.key.client.clone()))
            .map(|l| l.key.client.clone())
            .collect()
    }

    pub fn lines(&self) -> &[DemandLine] {
        &self.lines
    }

    pub fn line(&self, idx: usize) -> &DemandLine {
        &self.lines[idx]
    }

    pub fn get(&self, key: &DemandKey) -> Option<&DemandLine> {
        self.index.get(key).map(|&i| &self.lines[i])
    }

    /// Indices of lines of `period` with something pending, highest priority first.
    pub fn pending_in(&self, period: Period, priorities: &PriorityTable) -> Vec<usize> {
        let mut queue: Vec<usize> = self
            .lines
            .iter()
            .enumerate()
            .filter(|(_, l)| l.key.period == period && l.pending > 0)
            .map(|(i, _)| i)
            .collect();
        queue.sort_by(|&a, &b| priorities.compare(&self.lines[a].key.client, &self.lines[b].key.client));
        queue
    }

    /// Indices of lines of `period` or earlier with something pending.
    ///
    /// Sorted by rank, then oldest period first, then input order.
    pub fn pending_up_to(&self, period: Period, priorities: &PriorityTable) -> Vec<usize> {
        let mut queue: Vec<usize> = self
            .lines
            .iter()
            .enumerate()
            .filter(|(_, l)| l.key.period <= period && l.pending > 0)
            .map(|(i, _)| i)
            .collect();
        queue.sort_by(|&a, &b| {
            let (la, lb) = (&self.lines[a], &self.lines[b]);
            priorities
                .compare(&la.key.client, &lb.key.client)
                .then(la.key.period.cmp(&lb.key.period))
        });
        queue
    }

    /// Moves `quantity` of line `idx` from pending to allocated.
    ///
    /// Never takes more than what is pending; returns what was recorded.
    pub fn record(&mut self, idx: usize, quantity: Quantity) -> Quantity {
        let line = &mut self.lines[idx];
        let granted = quantity.min(line.pending);
        line.pending -= granted;
        line.allocated += granted;
        granted
    }

    pub fn total_minimum(&self) -> Quantity {
        self.lines.iter().map(|l| l.minimum).sum()
    }

    pub fn total_pending(&self) -> Quantity {
        self.lines.iter().map(|l| l.pending).sum()
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

fn overflow(max: u64) -> AllocationError {
    AllocationError::Overflow {
        table: MINIMUM_TABLE.to_string(),
        column: MINIMO.to_string(),
        max,
    }
}
