// src/model/types.rs

/// Month index. Periods are processed in ascending order.
pub type Period = u32;

/// Product code as it appears in the `Codigo` column.
pub type ProductCode = String;

/// Client identifier as it appears in the `Cliente` column.
pub type ClientId = String;

/// Whole product units. Loading drops or clamps anything below zero.
pub type Quantity = u64;

/// Rank given to clients whose priority is missing or not a number.
pub const DEFAULT_RANK: f64 = 5.0;

/// Allocation column that absorbs stock nobody asked for (push-overflow policy).
pub const PUSH_SINK: &str = "PUSH";

/// Composite key of a demand line and of an allocation cell.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DemandKey {
    pub period: Period,
    pub product: ProductCode,
    pub client: ClientId,
}

impl DemandKey {
    pub fn new(period: Period, product: impl Into<ProductCode>, client: impl Into<ClientId>) -> Self {
        Self {
            period,
            product: product.into(),
            client: client.into(),
        }
    }
}
