#![allow(dead_code)]

use stock_allocator::allocation::config::{AllocationConfig, PolicyKind};
use stock_allocator::allocation::engine::AllocationRun;
use stock_allocator::io::schema::{InputTables, MinimumRow, PriorityRow, StockRow};

pub fn tables(
    stock: &[(u32, &str, i64)],
    priorities: &[(&str, &str)],
    minimums: &[(u32, &str, &str, i64)],
) -> InputTables {
    InputTables {
        stock: stock
            .iter()
            .map(|&(period, product, qty)| StockRow::new(period, product, qty))
            .collect(),
        priority_headers: InputTables::default_priority_headers(),
        priorities: priorities
            .iter()
            .map(|&(client, rank)| PriorityRow::new(client, rank))
            .collect(),
        minimums: minimums
            .iter()
            .map(|&(period, product, client, qty)| MinimumRow::new(period, product, client, qty))
            .collect(),
    }
}

pub fn config(policy: PolicyKind) -> AllocationConfig {
    AllocationConfig {
        policy,
        ..AllocationConfig::default()
    }
}

/// Runs a workbook to completion with the given policy.
pub fn run(tables: &InputTables, policy: PolicyKind) -> AllocationRun {
    let mut run = AllocationRun::new(config(policy), tables).unwrap();
    run.run();
    run
}

pub const POLICIES: [PolicyKind; 2] = [PolicyKind::CarriedFlow, PolicyKind::PushOverflow];
