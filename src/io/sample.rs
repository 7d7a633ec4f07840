// src/io/sample.rs

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};

use crate::error::{AllocationError, Result};
use crate::io::schema::{InputTables, MinimumRow, PriorityRow, StockRow};
use crate::model::types::Period;

/// Shape of a generated test workbook.
#[derive(Debug, Clone)]
pub struct SampleParams {
    pub products: usize,
    pub clients: usize,
    pub months: Period,
    pub seed: u64,
    /// Stock per (month, product) ~ Normal(mean_stock, std_dev_stock).
    pub mean_stock: f64,
    pub std_dev_stock: f64,
    /// Minimum per demand row ~ Normal(mean_minimum, std_dev_minimum).
    pub mean_minimum: f64,
    pub std_dev_minimum: f64,
    /// Probability that a (month, product, client) cell has demand.
    pub demand_density: f64,
}

impl Default for SampleParams {
    fn default() -> Self {
        Self {
            products: 5,
            clients: 4,
            months: 6,
            seed: 42,
            mean_stock: 40.0,
            std_dev_stock: 20.0,
            mean_minimum: 12.0,
            std_dev_minimum: 6.0,
            demand_density: 0.6,
        }
    }
}

fn normal(mean: f64, std_dev: f64) -> Result<Normal<f64>> {
    Normal::new(mean, std_dev).map_err(|e| AllocationError::Sample(e.to_string()))
}

pub fn product_code(i: usize) -> String {
    format!("SKU-{:03}", i + 1)
}

pub fn client_id(i: usize) -> String {
    format!("CLI-{:02}", i + 1)
}

/// Generates a reproducible input workbook.
///
/// The same parameters always yield the same tables. Besides regular rows it
/// contains the cases the loader has to clean up: stock rows at or below
/// zero, a non-numeric rank, a client missing from the priority table,
/// split demand rows and products that appear on one side only.
pub fn generate_sample(params: &SampleParams) -> Result<InputTables> {
    if params.products == 0 || params.clients == 0 || params.months == 0 {
        return Err(AllocationError::Sample(
            "products, clients and months must be at least 1".to_string(),
        ));
    }
    if !(0.0..=1.0).contains(&params.demand_density) {
        return Err(AllocationError::Sample(format!(
            "demand density {} is not a probability",
            params.demand_density
        )));
    }

    let mut rng = StdRng::seed_from_u64(params.seed);
    let stock_dist = normal(params.mean_stock, params.std_dev_stock)?;
    let minimum_dist = normal(params.mean_minimum, params.std_dev_minimum)?;

    // 1. Stock: may come out at or below zero, which the loader drops
    let mut stock = Vec::new();
    for month in 1..=params.months {
        for p in 0..params.products {
            let quantity = stock_dist.sample(&mut rng).round() as i64;
            stock.push(StockRow::new(month, product_code(p), quantity));
        }
    }
    // Nobody asks for this one.
    stock.push(StockRow::new(1, product_code(params.products + 1), 25));

    // 2. Priorities: the last client is left out when there is more than one
    let ranked = if params.clients > 1 { params.clients - 1 } else { 1 };
    let priorities = (0..ranked)
        .map(|c| {
            let rank = if rng.gen_bool(0.15) {
                "sin prioridad".to_string()
            } else {
                rng.gen_range(1..=4).to_string()
            };
            PriorityRow::new(client_id(c), rank)
        })
        .collect();

    // 3. Minimums, some split over two rows
    let mut minimums = Vec::new();
    for month in 1..=params.months {
        for p in 0..params.products {
            for c in 0..params.clients {
                if !rng.gen_bool(params.demand_density) {
                    continue;
                }
                let minimum = (minimum_dist.sample(&mut rng).round() as i64).max(1);
                if minimum > 1 && rng.gen_bool(0.1) {
                    let first = rng.gen_range(1..minimum);
                    minimums.push(MinimumRow::new(month, product_code(p), client_id(c), first));
                    minimums.push(MinimumRow::new(month, product_code(p), client_id(c), minimum - first));
                } else {
                    minimums.push(MinimumRow::new(month, product_code(p), client_id(c), minimum));
                }
            }
        }
    }
    // No stock ever arrives for this one.
    minimums.push(MinimumRow::new(1, product_code(params.products), client_id(0), 10));

    Ok(InputTables {
        stock,
        priority_headers: InputTables::default_priority_headers(),
        priorities,
        minimums,
    })
}
