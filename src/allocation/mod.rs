pub mod config;
pub mod engine;
pub mod reconcile;
pub mod state;
