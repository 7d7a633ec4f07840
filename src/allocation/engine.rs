// src/allocation/engine.rs

use std::collections::BTreeMap;

use tracing::{debug, info};

use crate::allocation::config::{AllocationConfig, PolicyKind};
use crate::allocation::reconcile::{reconcile, ReconciledLine};
use crate::allocation::state::AllocationState;
use crate::error::{AllocationError, Result};
use crate::io::schema::InputTables;
use crate::model::types::{ClientId, Period, Quantity, PUSH_SINK};
use crate::strategy::implementations::build_policy;
use crate::strategy::traits::{AllocationPolicy, PeriodReport};

/// One allocation run: owns the ledgers and walks the periods in order.
#[derive(Debug)]
pub struct AllocationRun {
    config: AllocationConfig,

    pub state: AllocationState,
    policy: Box<dyn AllocationPolicy>,

    pub periods: Vec<Period>,
    next: usize,
    pub history: Vec<PeriodReport>,
}

impl AllocationRun {
    /// Prepares a run from raw input rows, using the policy named in `config`.
    ///
    /// Fails only if the input quantities add up past what a run can count.
    pub fn new(config: AllocationConfig, tables: &InputTables) -> Result<Self> {
        let state = AllocationState::from_tables(tables, &config)?;
        let policy = build_policy(config.policy);
        Ok(Self::with_policy(config, state, policy))
    }

    /// Prepares a run over ready-made ledgers with an explicit policy.
    pub fn with_policy(
        mut config: AllocationConfig,
        state: AllocationState,
        policy: Box<dyn AllocationPolicy>,
    ) -> Self {
        config.policy = policy.kind();
        let periods = state.periods();
        Self {
            config,
            state,
            policy,
            periods,
            next: 0,
            history: Vec::new(),
        }
    }

    pub fn policy_kind(&self) -> PolicyKind {
        self.policy.kind()
    }

    /// Processes every remaining period.
    pub fn run(&mut self) {
        info!(
            "allocating {} periods with {:?} policy, unranked clients at rank {}",
            self.periods.len(),
            self.policy.kind(),
            self.config.default_rank
        );

        while self.step() {}

        info!(
            "allocation finished: {} of {} units of minimum demand served, {} still pending, {} recorded under {}",
            self.state.table.client_total(),
            self.state.demand.total_minimum(),
            self.state.demand.total_pending(),
            self.state.table.push_total(),
            PUSH_SINK
        );
    }

    /// Processes the next period. Returns false once all periods are done.
    pub fn step(&mut self) -> bool {
        let Some(&period) = self.periods.get(self.next) else {
            return false;
        };

        let report = self.policy.allocate_period(period, &mut self.state);
        debug!(
            "period {} closed: granted {}, swept {}",
            period, report.granted, report.swept
        );

        self.history.push(report);
        self.next += 1;
        true
    }

    pub fn is_finished(&self) -> bool {
        self.next >= self.periods.len()
    }

    /// Final status of every demand line.
    pub fn reconcile(&self) -> Vec<ReconciledLine> {
        reconcile(&self.state.demand, &self.state.table)
    }

    /// Unconsumed stock of `product` at the end of `period`, if that period was processed.
    pub fn closing(&self, period: Period, product: &str) -> Option<Quantity> {
        self.history
            .iter()
            .find(|r| r.period == period)
            .map(|r| r.closing.get(product).copied().unwrap_or(0))
    }

    /// Allocation columns: clients in priority order, then clients that only
    /// appear in demand, in order of appearance.
    pub fn client_columns(&self) -> Vec<ClientId> {
        let mut columns = self.state.priorities.ordered_clients();
        for client in self.state.demand.clients() {
            if !self.state.priorities.contains(&client) {
                columns.push(client);
            }
        }
        columns
    }

    /// Verifies the bookkeeping of a finished run.
    pub fn check_invariants(&self) -> Result<()> {
        let state = &self.state;

        for line in state.demand.lines() {
            let cell = state.table.get(&line.key);
            if cell != line.allocated || line.allocated + line.pending != line.minimum {
                return Err(AllocationError::Invariant(format!(
                    "demand {:?}: minimum {}, allocated {}, pending {}, cell {}",
                    line.key, line.minimum, line.allocated, line.pending, cell
                )));
            }
        }

        for entry in state.stock.entries() {
            if entry.remaining > entry.available() {
                return Err(AllocationError::Invariant(format!(
                    "stock ({}, {}): remaining {} exceeds available {}",
                    entry.period,
                    entry.product,
                    entry.remaining,
                    entry.available()
                )));
            }
        }

        // Served by a period never exceeds what has been supplied up to it.
        let mut supplied: BTreeMap<Period, Quantity> = BTreeMap::new();
        for entry in state.stock.entries() {
            *supplied.entry(entry.period).or_insert(0) += entry.supplied;
        }
        let mut served: BTreeMap<Period, Quantity> = BTreeMap::new();
        for event in state.events.iter().filter(|e| !e.is_push()) {
            *served.entry(event.served_period).or_insert(0) += event.quantity;
        }
        let (mut supplied_so_far, mut served_so_far) = (0, 0);
        for &period in &self.periods {
            supplied_so_far += supplied.get(&period).copied().unwrap_or(0);
            served_so_far += served.get(&period).copied().unwrap_or(0);
            if served_so_far > supplied_so_far {
                return Err(AllocationError::Invariant(format!(
                    "by period {} served {} but only {} was supplied",
                    period, served_so_far, supplied_so_far
                )));
            }
        }

        match self.policy.kind() {
            PolicyKind::CarriedFlow => self.check_flow_matches_ledger(),
            PolicyKind::PushOverflow => self.check_push_conservation(&served),
        }
    }

    fn check_flow_matches_ledger(&self) -> Result<()> {
        let Some(last) = self.history.last() else {
            return Ok(());
        };
        let ledger = self.state.stock.remaining_up_to(last.period);
        for (product, &balance) in &last.closing {
            let on_ledger = ledger.get(product).copied().unwrap_or(0);
            if balance != on_ledger {
                return Err(AllocationError::Invariant(format!(
                    "flow balance of {} is {} but the ledger holds {}",
                    product, balance, on_ledger
                )));
            }
        }
        Ok(())
    }

    fn check_push_conservation(&self, served: &BTreeMap<Period, Quantity>) -> Result<()> {
        for report in &self.history {
            let entering: Quantity = self
                .state
                .stock
                .entries_in(report.period)
                .map(|e| e.available())
                .sum();
            let granted = served.get(&report.period).copied().unwrap_or(0);
            if granted + report.swept != entering {
                return Err(AllocationError::Invariant(format!(
                    "period {}: granted {} + pushed {} != {} entering",
                    report.period, granted, report.swept, entering
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::schema::{MinimumRow, PriorityRow, StockRow};

    fn tables() -> InputTables {
        InputTables {
            stock: vec![StockRow::new(1, "P1", 10), StockRow::new(2, "P1", 0)],
            priority_headers: InputTables::default_priority_headers(),
            priorities: vec![PriorityRow::new("A", "1"), PriorityRow::new("B", "2")],
            minimums: vec![MinimumRow::new(1, "P1", "A", 4), MinimumRow::new(1, "P1", "B", 8)],
        }
    }

    #[test]
    fn step_walks_periods_once() {
        let mut run = AllocationRun::new(AllocationConfig::default(), &tables()).unwrap();
        assert_eq!(run.periods, vec![1]);
        assert!(run.step());
        assert!(!run.step());
        assert!(run.is_finished());
        assert_eq!(run.history.len(), 1);
    }

    #[test]
    fn client_columns_append_unranked_clients() {
        let mut input = tables();
        input.minimums.push(MinimumRow::new(1, "P1", "Z", 1));
        let run = AllocationRun::new(AllocationConfig::default(), &input).unwrap();
        assert_eq!(run.client_columns(), vec!["A", "B", "Z"]);
    }

    #[test]
    fn oversized_quantities_fail_instead_of_wrapping() {
        let mut input = tables();
        input.stock.push(StockRow::new(2, "P1", i64::MAX));
        input.stock.push(StockRow::new(3, "P1", i64::MAX));

        let err = AllocationRun::new(AllocationConfig::default(), &input).unwrap_err();
        assert!(matches!(err, AllocationError::Overflow { .. }));
    }

    #[test]
    fn finished_runs_pass_invariant_checks() {
        for policy in [PolicyKind::CarriedFlow, PolicyKind::PushOverflow] {
            let config = AllocationConfig {
                policy,
                ..AllocationConfig::default()
            };
            let mut run = AllocationRun::new(config, &tables()).unwrap();
            run.run();
            run.check_invariants().unwrap();
            assert_eq!(run.policy_kind(), policy);
        }
    }
}
