// src/io/summary.rs

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::Path;

use serde::Serialize;

use crate::error::Result;
use crate::io::reporting::{write_serialized, RunOutput};
use crate::io::schema::InputTables;
use crate::model::types::{ClientId, Period, Quantity};

pub const CLIENT_TOTALS_FILE: &str = "resumen_clientes.csv";
pub const MONTHLY_FILE: &str = "resumen_mensual.csv";
pub const STOCK_BY_MONTH_FILE: &str = "resumen_stock.csv";

/// Quick facts about an input workbook, computed before any filtering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputOverview {
    pub products: usize,
    pub clients: usize,
    pub months: usize,
    /// Demand rows with a minimum above zero.
    pub cells_with_minimum: usize,
}

impl InputOverview {
    pub fn from_tables(tables: &InputTables) -> Self {
        let products: BTreeSet<&str> = tables.stock.iter().map(|r| r.product.as_str()).collect();
        let months: BTreeSet<Period> = tables.stock.iter().map(|r| r.period).collect();
        Self {
            products: products.len(),
            clients: tables.priorities.len(),
            months: months.len(),
            cells_with_minimum: tables.minimums.iter().filter(|r| r.minimum > 0).count(),
        }
    }
}

impl fmt::Display for InputOverview {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "- Productos: {}", self.products)?;
        writeln!(f, "- Clientes: {}", self.clients)?;
        writeln!(f, "- Meses: {}", self.months)?;
        write!(f, "- Celdas con mínimo asignado: {}", self.cells_with_minimum)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClientTotal {
    #[serde(rename = "Cliente")]
    pub client: ClientId,
    #[serde(rename = "Asignado")]
    pub allocated: Quantity,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonthClientTotal {
    #[serde(rename = "MES")]
    pub period: Period,
    #[serde(rename = "Cliente")]
    pub client: ClientId,
    #[serde(rename = "Asignado")]
    pub allocated: Quantity,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonthStock {
    #[serde(rename = "MES")]
    pub period: Period,
    #[serde(rename = "Stock Disponible")]
    pub available: Quantity,
    #[serde(rename = "Stock Restante")]
    pub remaining: Quantity,
    #[serde(rename = "Asignado")]
    pub allocated: Quantity,
}

/// Aggregates of a finished run: per client, per month and client, and
/// stock use per month.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub client_totals: Vec<ClientTotal>,
    pub monthly: Vec<MonthClientTotal>,
    pub stock_by_month: Vec<MonthStock>,
}

impl RunSummary {
    pub fn from_output(output: &RunOutput) -> Self {
        let sheet = &output.allocation;

        let mut client_totals: Vec<ClientTotal> = sheet
            .columns
            .iter()
            .enumerate()
            .map(|(i, client)| ClientTotal {
                client: client.clone(),
                allocated: sheet.rows.iter().map(|r| r.cells[i]).sum(),
            })
            .collect();
        client_totals.sort_by(|a, b| b.allocated.cmp(&a.allocated));

        let mut by_month: BTreeMap<(Period, usize), Quantity> = BTreeMap::new();
        for row in &sheet.rows {
            for (i, &quantity) in row.cells.iter().enumerate() {
                *by_month.entry((row.period, i)).or_insert(0) += quantity;
            }
        }
        let monthly = by_month
            .into_iter()
            .map(|((period, i), allocated)| MonthClientTotal {
                period,
                client: sheet.columns[i].clone(),
                allocated,
            })
            .collect();

        let mut stock: BTreeMap<Period, (Quantity, Quantity)> = BTreeMap::new();
        for row in &output.stock {
            let totals = stock.entry(row.period).or_insert((0, 0));
            totals.0 += row.available();
            totals.1 += row.remaining;
        }
        let stock_by_month = stock
            .into_iter()
            .map(|(period, (available, remaining))| MonthStock {
                period,
                available,
                remaining,
                allocated: available.saturating_sub(remaining),
            })
            .collect();

        Self {
            client_totals,
            monthly,
            stock_by_month,
        }
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Total asignado por cliente:")?;
        for total in &self.client_totals {
            writeln!(f, "  {}: {}", total.client, total.allocated)?;
        }
        writeln!(f, "Distribución de stock por mes:")?;
        for month in &self.stock_by_month {
            writeln!(
                f,
                "  MES {}: disponible {}, asignado {}, restante {}",
                month.period, month.available, month.allocated, month.remaining
            )?;
        }
        Ok(())
    }
}

/// Writes the three summary tables into `dir`.
pub fn write_summary(dir: &Path, summary: &RunSummary) -> Result<()> {
    write_serialized(&dir.join(CLIENT_TOTALS_FILE), &summary.client_totals)?;
    write_serialized(&dir.join(MONTHLY_FILE), &summary.monthly)?;
    write_serialized(&dir.join(STOCK_BY_MONTH_FILE), &summary.stock_by_month)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::allocation::config::{AllocationConfig, PolicyKind};
    use crate::allocation::engine::AllocationRun;
    use crate::io::schema::{MinimumRow, PriorityRow, StockRow};

    fn tables() -> InputTables {
        InputTables {
            stock: vec![StockRow::new(1, "P1", 10), StockRow::new(2, "P1", 3)],
            priority_headers: InputTables::default_priority_headers(),
            priorities: vec![PriorityRow::new("A", "1"), PriorityRow::new("B", "2")],
            minimums: vec![
                MinimumRow::new(1, "P1", "A", 4),
                MinimumRow::new(1, "P1", "B", 2),
                MinimumRow::new(2, "P1", "A", 1),
                MinimumRow::new(3, "P1", "B", 5),
            ],
        }
    }

    fn summarize(policy: PolicyKind) -> RunSummary {
        let tables = tables();
        let config = AllocationConfig {
            policy,
            ..AllocationConfig::default()
        };
        let mut run = AllocationRun::new(config, &tables).unwrap();
        run.run();
        run.check_invariants().unwrap();
        RunSummary::from_output(&RunOutput::from_run(&run, &tables))
    }

    fn month(period: Period, client: &str, allocated: Quantity) -> MonthClientTotal {
        MonthClientTotal {
            period,
            client: client.to_string(),
            allocated,
        }
    }

    fn stock(period: Period, available: Quantity, remaining: Quantity) -> MonthStock {
        MonthStock {
            period,
            available,
            remaining,
            allocated: available - remaining,
        }
    }

    #[test]
    fn carried_flow_aggregates() {
        // Month 1 serves A=4 and B=2 from 10; month 2 serves A=1 from the
        // 4 banked units plus 3 new; month 3 gives B 5 of the 6 left.
        let summary = summarize(PolicyKind::CarriedFlow);

        assert_eq!(
            summary.client_totals,
            vec![
                ClientTotal { client: "B".to_string(), allocated: 7 },
                ClientTotal { client: "A".to_string(), allocated: 5 },
            ]
        );
        assert_eq!(
            summary.monthly,
            vec![
                month(1, "A", 4),
                month(1, "B", 2),
                month(2, "A", 1),
                month(2, "B", 0),
                month(3, "A", 0),
                month(3, "B", 5),
            ]
        );
        // Oldest stock goes first: month 1 is drained, month 2 keeps 1 unit.
        assert_eq!(summary.stock_by_month, vec![stock(1, 10, 0), stock(2, 3, 1)]);
    }

    #[test]
    fn push_overflow_counts_carried_stock_in_the_month_it_arrives() {
        // Month 1 leaves 4 which move into month 2 next to its own 3. Month 2
        // serves A=1 and leaves 6, which move into a month 3 entry that had
        // no input row. Month 3 serves B=5 and leaves 1.
        let summary = summarize(PolicyKind::PushOverflow);

        assert_eq!(summary.client_totals[0], ClientTotal { client: "B".to_string(), allocated: 7 });
        assert_eq!(summary.monthly[4..], [month(3, "A", 0), month(3, "B", 5)]);
        assert_eq!(
            summary.stock_by_month,
            vec![stock(1, 10, 4), stock(2, 7, 6), stock(3, 6, 1)]
        );
        let allocated: Quantity = summary.stock_by_month.iter().map(|m| m.allocated).sum();
        let granted: Quantity = summary.client_totals.iter().map(|c| c.allocated).sum();
        assert_eq!(allocated, granted);
    }

    #[test]
    fn overview_counts_input_rows() {
        let overview = InputOverview::from_tables(&tables());
        assert_eq!(
            overview,
            InputOverview {
                products: 1,
                clients: 2,
                months: 2,
                cells_with_minimum: 4,
            }
        );
    }
}
