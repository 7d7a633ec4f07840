// src/io/schema.rs

use serde::Serialize;

use crate::error::{AllocationError, Result};
use crate::model::types::{ClientId, Period, ProductCode};

pub const MES: &str = "MES";
pub const CODIGO: &str = "Codigo";
pub const CLIENTE: &str = "Cliente";
pub const PRIORIDAD: &str = "Prioridad";
pub const STOCK_DISPONIBLE: &str = "Stock Disponible";
pub const STOCK_RESTANTE: &str = "Stock Restante";
pub const MINIMO: &str = "Minimo";

pub const STOCK_TABLE: &str = "Stock Disponible";
pub const PRIORITY_TABLE: &str = "Prioridad Clientes";
pub const MINIMUM_TABLE: &str = "Mínimos de Asignación";

/// A row of the stock table as read, before any filtering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StockRow {
    #[serde(rename = "MES")]
    pub period: Period,
    #[serde(rename = "Codigo")]
    pub product: ProductCode,
    #[serde(rename = "Stock Disponible")]
    pub quantity: i64,
}

impl StockRow {
    pub fn new(period: Period, product: impl Into<ProductCode>, quantity: i64) -> Self {
        Self {
            period,
            product: product.into(),
            quantity,
        }
    }
}

/// A row of the priority table. The rank is kept raw; coercion happens in
/// [`crate::model::priority::PriorityTable`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriorityRow {
    pub client: ClientId,
    pub raw_rank: String,
}

impl PriorityRow {
    pub fn new(client: impl Into<ClientId>, raw_rank: impl Into<String>) -> Self {
        Self {
            client: client.into(),
            raw_rank: raw_rank.into(),
        }
    }
}

/// A row of the minimums table as read, before duplicates are summed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MinimumRow {
    #[serde(rename = "MES")]
    pub period: Period,
    #[serde(rename = "Codigo")]
    pub product: ProductCode,
    #[serde(rename = "Cliente")]
    pub client: ClientId,
    #[serde(rename = "Minimo")]
    pub minimum: i64,
}

impl MinimumRow {
    pub fn new(
        period: Period,
        product: impl Into<ProductCode>,
        client: impl Into<ClientId>,
        minimum: i64,
    ) -> Self {
        Self {
            period,
            product: product.into(),
            client: client.into(),
            minimum,
        }
    }
}

/// The three input tables of one workbook.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct InputTables {
    pub stock: Vec<StockRow>,
    /// Header cells of the priority table, echoed on export.
    pub priority_headers: (String, String),
    pub priorities: Vec<PriorityRow>,
    pub minimums: Vec<MinimumRow>,
}

impl InputTables {
    pub fn default_priority_headers() -> (String, String) {
        (CLIENTE.to_string(), PRIORIDAD.to_string())
    }
}

fn invalid(table: &str, row: usize, column: &str, value: &str) -> AllocationError {
    AllocationError::InvalidValue {
        table: table.to_string(),
        row,
        column: column.to_string(),
        value: value.to_string(),
    }
}

/// Parses a whole number written as `12` or `12.0`. A blank cell reads as zero.
pub fn parse_quantity(table: &str, row: usize, column: &str, raw: &str) -> Result<i64> {
    let text = raw.trim();
    if text.is_empty() {
        return Ok(0);
    }
    if let Ok(value) = text.parse::<i64>() {
        return Ok(value);
    }
    match text.parse::<f64>() {
        Ok(value) if value.is_finite() && value.fract() == 0.0 && value.abs() < i64::MAX as f64 => {
            Ok(value as i64)
        }
        _ => Err(invalid(table, row, column, raw)),
    }
}

/// Parses a period cell; blanks and negatives are rejected.
pub fn parse_period(table: &str, row: usize, raw: &str) -> Result<Period> {
    if raw.trim().is_empty() {
        return Err(invalid(table, row, MES, raw));
    }
    let value = parse_quantity(table, row, MES, raw)?;
    Period::try_from(value).map_err(|_| invalid(table, row, MES, raw))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quantities_accept_spreadsheet_floats() {
        assert_eq!(parse_quantity("t", 1, "c", "12").unwrap(), 12);
        assert_eq!(parse_quantity("t", 1, "c", " 12.0 ").unwrap(), 12);
        assert_eq!(parse_quantity("t", 1, "c", "-3").unwrap(), -3);
        assert_eq!(parse_quantity("t", 1, "c", "").unwrap(), 0);
    }

    #[test]
    fn fractional_or_text_quantities_are_rejected() {
        let err = parse_quantity("Stock Disponible", 4, STOCK_DISPONIBLE, "2.5").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Table 'Stock Disponible', row 4, column 'Stock Disponible': invalid value '2.5'"
        );
        assert!(parse_quantity("t", 1, "c", "diez").is_err());
        assert!(parse_quantity("t", 1, "c", "inf").is_err());
    }

    #[test]
    fn periods_must_be_present_and_non_negative() {
        assert_eq!(parse_period("t", 1, "3.0").unwrap(), 3);
        assert!(parse_period("t", 1, "").is_err());
        assert!(parse_period("t", 1, "-1").is_err());
    }
}
