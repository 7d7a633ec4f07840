pub mod reporting;
pub mod sample;
pub mod schema;
pub mod summary;
pub mod workbook;
