//! Stock allocator distributes time-phased product supply across clients by
//! priority, month by month, against per-client minimum demand.
//!
//! Inputs and outputs are CSV tables, one file per workbook sheet. The
//! allocation itself runs in [`allocation::engine::AllocationRun`].

pub mod allocation;
pub mod error;
pub mod io;
pub mod model;
pub mod strategy;

use std::path::Path;
use std::sync::Once;

use crate::allocation::config::AllocationConfig;
use crate::allocation::engine::AllocationRun;
use crate::error::Result;
use crate::io::reporting::{write_results, RunOutput};
use crate::io::summary::{write_summary, RunSummary};
use crate::io::schema::InputTables;
use crate::io::workbook::read_tables;

static TRACING_INIT: Once = Once::new();

/// Installs the global `tracing` subscriber once. `RUST_LOG` refines the filter.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{fmt, EnvFilter};

        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("stock_allocator=info"));

        // Another subscriber may already be installed (e.g. by a test harness).
        let _ = fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .try_init();
    });
}

/// Reads a workbook, runs the allocation and writes every result table.
///
/// All tables are computed before the first file is written, so a failure
/// while reading or allocating leaves `output` untouched.
pub fn allocate_workbook(input: &Path, output: &Path, config: &AllocationConfig) -> Result<RunSummary> {
    let tables = read_tables(input, &config.tables)?;
    allocate_tables(&tables, output, config)
}

/// Runs the allocation over tables already read and writes every result table.
pub fn allocate_tables(tables: &InputTables, output: &Path, config: &AllocationConfig) -> Result<RunSummary> {
    let mut run = AllocationRun::new(config.clone(), tables)?;
    run.run();
    run.check_invariants()?;

    let results = RunOutput::from_run(&run, tables);
    let summary = RunSummary::from_output(&results);

    write_results(output, &results)?;
    write_summary(output, &summary)?;
    Ok(summary)
}
