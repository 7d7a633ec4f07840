// src/io/reporting.rs

use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use serde::Serialize;
use tracing::{info, warn};

use crate::allocation::config::PolicyKind;
use crate::allocation::engine::AllocationRun;
use crate::allocation::reconcile::ReconciledLine;
use crate::error::Result;
use crate::io::schema::{InputTables, PriorityRow, CODIGO, MES, STOCK_RESTANTE};
use crate::model::allocation::AllocationEvent;
use crate::model::types::{ClientId, Period, ProductCode, Quantity, PUSH_SINK};

pub const STOCK_FILE: &str = "stock_disponible.csv";
pub const PRIORITY_FILE: &str = "prioridad_clientes.csv";
pub const MINIMUM_FILE: &str = "minimos_asignacion.csv";
pub const EVENTS_FILE: &str = "movimientos.csv";

/// One `(period, product)` row of the allocation table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllocationRow {
    pub period: Period,
    pub product: ProductCode,
    /// One value per entry of [`AllocationSheet::columns`].
    pub cells: Vec<Quantity>,
    /// Overflow sink value; present only under the push-overflow policy.
    pub pushed: Option<Quantity>,
    /// Unconsumed stock at period end; `None` if the period was never processed.
    pub stock_remaining: Option<Quantity>,
}

/// Periods × products by client, as exported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllocationSheet {
    pub title: &'static str,
    pub file_name: &'static str,
    /// Client columns only; the `PUSH` column is carried by [`AllocationRow::pushed`].
    pub columns: Vec<ClientId>,
    pub with_sink: bool,
    pub rows: Vec<AllocationRow>,
}

impl AllocationSheet {
    pub fn from_run(run: &AllocationRun) -> Self {
        let kind = run.policy_kind();
        let columns = run.client_columns();
        let with_sink = kind == PolicyKind::PushOverflow;
        if with_sink && columns.iter().any(|c| c == PUSH_SINK) {
            warn!(
                "client '{}' shares its column name with the overflow sink",
                PUSH_SINK
            );
        }

        let mut keys: BTreeSet<(Period, ProductCode)> = run
            .state
            .demand
            .lines()
            .iter()
            .map(|l| (l.key.period, l.key.product.clone()))
            .collect();
        keys.extend(run.state.table.rows());

        let rows = keys
            .into_iter()
            .map(|(period, product)| AllocationRow {
                cells: columns
                    .iter()
                    .map(|client| run.state.table.cell(period, &product, client))
                    .collect(),
                pushed: with_sink.then(|| run.state.table.pushed(period, &product)),
                stock_remaining: run.closing(period, &product),
                period,
                product,
            })
            .collect();

        Self {
            title: kind.sheet_title(),
            file_name: kind.file_name(),
            columns,
            with_sink,
            rows,
        }
    }

    fn header(&self) -> Vec<String> {
        let mut header = vec![MES.to_string(), CODIGO.to_string()];
        header.extend(self.columns.iter().cloned());
        if self.with_sink {
            header.push(PUSH_SINK.to_string());
        }
        header.push(STOCK_RESTANTE.to_string());
        header
    }
}

/// One stock ledger entry as exported.
///
/// `remaining` is what the entry still holds after the run under carried
/// flow. Under push-overflow it is the leftover at the close of its own
/// month, before the next month's fold moves it on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StockOutputRow {
    #[serde(rename = "MES")]
    pub period: Period,
    #[serde(rename = "Codigo")]
    pub product: ProductCode,
    #[serde(rename = "Stock Disponible")]
    pub supplied: Quantity,
    #[serde(skip)]
    pub carried_in: Quantity,
    #[serde(rename = "Stock Restante")]
    pub remaining: Quantity,
}

impl StockOutputRow {
    pub fn available(&self) -> Quantity {
        self.supplied + self.carried_in
    }

    /// False for entries the fold created in a month without an input row.
    pub fn from_input(&self) -> bool {
        self.supplied > 0
    }
}

/// Everything a run exports, fully computed before anything touches disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOutput {
    pub allocation: AllocationSheet,
    /// Every ledger entry, including months that only received carried stock.
    pub stock: Vec<StockOutputRow>,
    pub priority_headers: (String, String),
    pub priorities: Vec<PriorityRow>,
    pub minimums: Vec<ReconciledLine>,
    pub events: Vec<AllocationEvent>,
}

impl RunOutput {
    pub fn from_run(run: &AllocationRun, tables: &InputTables) -> Self {
        let at_close = run.policy_kind() == PolicyKind::PushOverflow;
        let stock = run
            .state
            .stock
            .entries()
            .map(|e| StockOutputRow {
                period: e.period,
                product: e.product.clone(),
                supplied: e.supplied,
                carried_in: e.carried_in,
                remaining: if at_close {
                    run.closing(e.period, &e.product).unwrap_or(e.remaining)
                } else {
                    e.remaining
                },
            })
            .collect();

        Self {
            allocation: AllocationSheet::from_run(run),
            stock,
            priority_headers: tables.priority_headers.clone(),
            priorities: tables.priorities.clone(),
            minimums: run.reconcile(),
            events: run.state.events.clone(),
        }
    }
}

/// Writes the result workbook into `dir`, creating it if needed.
///
/// # Arguments
/// * `dir` - Output directory (e.g., "results/run_1").
/// * `output` - Tables produced by [`RunOutput::from_run`].
pub fn write_results(dir: &Path, output: &RunOutput) -> Result<()> {
    fs::create_dir_all(dir)?;

    let sheet = &output.allocation;
    let mut wtr = csv::Writer::from_path(dir.join(sheet.file_name))?;
    wtr.write_record(sheet.header())?;
    for row in &sheet.rows {
        let mut record = vec![row.period.to_string(), row.product.clone()];
        record.extend(row.cells.iter().map(|q| q.to_string()));
        record.extend(row.pushed.map(|q| q.to_string()));
        record.push(row.stock_remaining.map(|q| q.to_string()).unwrap_or_default());
        wtr.write_record(&record)?;
    }
    wtr.flush()?;

    // Echo of the input rows only.
    let echo: Vec<&StockOutputRow> = output.stock.iter().filter(|r| r.from_input()).collect();
    write_serialized(&dir.join(STOCK_FILE), &echo)?;

    let mut wtr = csv::Writer::from_path(dir.join(PRIORITY_FILE))?;
    let (client_header, rank_header) = &output.priority_headers;
    wtr.write_record([client_header, rank_header])?;
    for row in &output.priorities {
        wtr.write_record([&row.client, &row.raw_rank])?;
    }
    wtr.flush()?;

    write_serialized(&dir.join(MINIMUM_FILE), &output.minimums)?;
    write_serialized(&dir.join(EVENTS_FILE), &output.events)?;

    info!(
        "exported '{}' ({} rows) and {} minimum lines to '{}'",
        sheet.title,
        sheet.rows.len(),
        output.minimums.len(),
        dir.display()
    );
    Ok(())
}

/// Serializes any row type into a CSV file with a header line.
pub fn write_serialized<T: Serialize>(path: &Path, rows: &[T]) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;
    for row in rows {
        wtr.serialize(row)?;
    }
    wtr.flush()?;
    Ok(())
}
