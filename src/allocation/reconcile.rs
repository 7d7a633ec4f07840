// src/allocation/reconcile.rs

use serde::Serialize;

use crate::model::allocation::AllocationTable;
use crate::model::demand::DemandLedger;
use crate::model::types::{ClientId, Period, ProductCode, Quantity};

/// Final status of one demand line, as exported in the minimums table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReconciledLine {
    #[serde(rename = "MES")]
    pub period: Period,
    #[serde(rename = "Codigo")]
    pub product: ProductCode,
    #[serde(rename = "Cliente")]
    pub client: ClientId,
    #[serde(rename = "Minimo")]
    pub minimum: Quantity,
    #[serde(rename = "Pendiente")]
    pub pending: Quantity,
    #[serde(rename = "Asignado")]
    pub allocated: Quantity,
    #[serde(rename = "Cumple")]
    pub satisfied: bool,
    #[serde(rename = "Pendiente Final")]
    pub pending_final: Quantity,
}

/// Derives allocated, satisfied and final pending for every demand line.
///
/// `allocated` is read from the line's own allocation cell (zero if the cell
/// was never written). Lines come out sorted by `(period, product, client)`.
pub fn reconcile(demand: &DemandLedger, table: &AllocationTable) -> Vec<ReconciledLine> {
    let mut lines: Vec<ReconciledLine> = demand
        .lines()
        .iter()
        .map(|line| {
            let allocated = table.get(&line.key);
            ReconciledLine {
                period: line.key.period,
                product: line.key.product.clone(),
                client: line.key.client.clone(),
                minimum: line.minimum,
                pending: line.pending,
                allocated,
                satisfied: allocated >= line.minimum,
                pending_final: line.minimum.saturating_sub(allocated),
            }
        })
        .collect();

    lines.sort_by(|a, b| {
        (a.period, &a.product, &a.client).cmp(&(b.period, &b.product, &b.client))
    });
    lines
}
