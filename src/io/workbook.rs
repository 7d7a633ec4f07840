// src/io/workbook.rs

use std::fs::{self, File};
use std::path::Path;

use csv::StringRecord;
use tracing::info;

use crate::allocation::config::TableNames;
use crate::error::{AllocationError, Result};
use crate::io::schema::{
    parse_period, parse_quantity, InputTables, MinimumRow, PriorityRow, StockRow, CLIENTE, CODIGO,
    MES, MINIMO, MINIMUM_TABLE, PRIORIDAD, PRIORITY_TABLE, STOCK_DISPONIBLE, STOCK_TABLE,
};

/// Reads the three input tables from a workbook directory.
///
/// Fails on the first missing file, missing column or malformed cell; nothing
/// is returned partially.
pub fn read_tables(dir: &Path, names: &TableNames) -> Result<InputTables> {
    let stock = read_stock(&open(dir, STOCK_TABLE, &names.stock)?)?;
    let (priority_headers, priorities) = read_priorities(&open(dir, PRIORITY_TABLE, &names.priorities)?)?;
    let minimums = read_minimums(&open(dir, MINIMUM_TABLE, &names.minimums)?)?;

    info!(
        "read workbook {}: {} stock rows, {} priority rows, {} minimum rows",
        dir.display(),
        stock.len(),
        priorities.len(),
        minimums.len()
    );

    Ok(InputTables {
        stock,
        priority_headers,
        priorities,
        minimums,
    })
}

/// Writes the three input tables into `dir`, creating it if needed.
pub fn write_tables(dir: &Path, names: &TableNames, tables: &InputTables) -> Result<()> {
    fs::create_dir_all(dir)?;

    let mut wtr = csv::Writer::from_path(dir.join(&names.stock))?;
    for row in &tables.stock {
        wtr.serialize(row)?;
    }
    wtr.flush()?;

    let mut wtr = csv::Writer::from_path(dir.join(&names.priorities))?;
    let (client_header, rank_header) = &tables.priority_headers;
    wtr.write_record([client_header, rank_header])?;
    for row in &tables.priorities {
        wtr.write_record([&row.client, &row.raw_rank])?;
    }
    wtr.flush()?;

    let mut wtr = csv::Writer::from_path(dir.join(&names.minimums))?;
    for row in &tables.minimums {
        wtr.serialize(row)?;
    }
    wtr.flush()?;

    Ok(())
}

/// A table loaded into memory with its name for error messages.
struct Table {
    name: &'static str,
    headers: StringRecord,
    records: Vec<StringRecord>,
}

impl Table {
    fn column(&self, column: &str) -> Result<usize> {
        self.headers
            .iter()
            .position(|h| h == column)
            .ok_or_else(|| AllocationError::MissingColumn {
                table: self.name.to_string(),
                column: column.to_string(),
            })
    }
}

fn open(dir: &Path, name: &'static str, file: &str) -> Result<Table> {
    let path = dir.join(file);
    if !path.is_file() {
        return Err(AllocationError::MissingTable {
            table: name.to_string(),
            path,
        });
    }

    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(File::open(&path)?);
    let headers = rdr.headers()?.clone();
    let records = rdr.records().collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(Table {
        name,
        headers,
        records,
    })
}

fn read_stock(table: &Table) -> Result<Vec<StockRow>> {
    let mes = table.column(MES)?;
    let codigo = table.column(CODIGO)?;
    let quantity = table.column(STOCK_DISPONIBLE)?;

    table
        .records
        .iter()
        .enumerate()
        .map(|(i, record)| {
            let row = i + 1;
            Ok(StockRow {
                period: parse_period(table.name, row, &record[mes])?,
                product: record[codigo].to_string(),
                quantity: parse_quantity(table.name, row, STOCK_DISPONIBLE, &record[quantity])?,
            })
        })
        .collect()
}

/// The first column names the client and the second holds the rank,
/// whatever their headers say.
fn read_priorities(table: &Table) -> Result<((String, String), Vec<PriorityRow>)> {
    if table.headers.is_empty() {
        return Err(AllocationError::MissingColumn {
            table: table.name.to_string(),
            column: CLIENTE.to_string(),
        });
    }
    if table.headers.len() < 2 {
        return Err(AllocationError::MissingColumn {
            table: table.name.to_string(),
            column: PRIORIDAD.to_string(),
        });
    }

    let headers = (table.headers[0].to_string(), table.headers[1].to_string());
    let rows = table
        .records
        .iter()
        .map(|record| PriorityRow::new(&record[0], &record[1]))
        .collect();
    Ok((headers, rows))
}

fn read_minimums(table: &Table) -> Result<Vec<MinimumRow>> {
    let mes = table.column(MES)?;
    let codigo = table.column(CODIGO)?;
    let cliente = table.column(CLIENTE)?;
    let minimo = table.column(MINIMO)?;

    table
        .records
        .iter()
        .enumerate()
        .map(|(i, record)| {
            let row = i + 1;
            Ok(MinimumRow {
                period: parse_period(table.name, row, &record[mes])?,
                product: record[codigo].to_string(),
                client: record[cliente].to_string(),
                minimum: parse_quantity(table.name, row, MINIMO, &record[minimo])?,
            })
        })
        .collect()
}
