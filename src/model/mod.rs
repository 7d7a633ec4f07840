pub mod allocation;
pub mod demand;
pub mod priority;
pub mod stock;
pub mod types;
