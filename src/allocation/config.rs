// src/allocation/config.rs

use std::fs;
use std::path::Path;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::model::types::DEFAULT_RANK;

/// How leftover stock is treated between periods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum PolicyKind {
    /// Leftovers are banked per product and serve later demand.
    #[default]
    CarriedFlow,
    /// Leftovers move to the next period's ledger and are reported under `PUSH`;
    /// older unmet demand is retried every period.
    PushOverflow,
}

impl PolicyKind {
    /// Title of the allocation table.
    pub fn sheet_title(&self) -> &'static str {
        match self {
            PolicyKind::CarriedFlow => "Asignación Flujo",
            PolicyKind::PushOverflow => "Asignación Óptima",
        }
    }

    /// File name of the allocation table inside the output directory.
    pub fn file_name(&self) -> &'static str {
        match self {
            PolicyKind::CarriedFlow => "asignacion_flujo.csv",
            PolicyKind::PushOverflow => "asignacion_optima.csv",
        }
    }
}

/// File names of the three input tables inside a workbook directory.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct TableNames {
    pub stock: String,
    pub priorities: String,
    pub minimums: String,
}

impl Default for TableNames {
    fn default() -> Self {
        Self {
            stock: "stock_disponible.csv".to_string(),
            priorities: "prioridad_clientes.csv".to_string(),
            minimums: "minimos_asignacion.csv".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct AllocationConfig {
    pub policy: PolicyKind,
    /// Rank for clients with a missing or non-numeric priority.
    pub default_rank: f64,
    pub tables: TableNames,
}

impl Default for AllocationConfig {
    fn default() -> Self {
        Self {
            policy: PolicyKind::CarriedFlow,
            default_rank: DEFAULT_RANK,
            tables: TableNames::default(),
        }
    }
}

impl AllocationConfig {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }
}
