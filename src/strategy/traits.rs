// src/strategy/traits.rs

use std::collections::BTreeMap;
use std::fmt::Debug;

use crate::allocation::config::PolicyKind;
use crate::allocation::state::AllocationState;
use crate::model::types::{Period, ProductCode, Quantity};

/// What a policy reports once a period is closed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PeriodReport {
    pub period: Period,
    /// Units handed to clients during this period.
    pub granted: Quantity,
    /// Units recorded in the overflow sink at period end.
    pub swept: Quantity,
    /// Stock still unconsumed per product at period end.
    pub closing: BTreeMap<ProductCode, Quantity>,
}

/// Decides how one period's supply meets pending demand.
///
/// Any carry-over between periods (a running flow balance, a pointer to the
/// previous period) lives inside the policy; the ledgers live in
/// [`AllocationState`], which the engine owns and lends out one period at a
/// time. Periods are always fed in ascending order.
pub trait AllocationPolicy: Debug + Send + Sync {
    fn kind(&self) -> PolicyKind;

    /// Serves pending demand for `period`, mutating the ledgers in `state`.
    ///
    /// # Arguments
    /// * `period` - The period being closed.
    /// * `state` - Ledgers, allocation table and event log of the run.
    fn allocate_period(&mut self, period: Period, state: &mut AllocationState) -> PeriodReport;
}
