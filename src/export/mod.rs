//! Export module for Kesef
//!
//! - CSV: transaction data in fixed Hebrew-header layouts (spreadsheet-compatible)
//! - JSON: machine-readable full database export and restore
//! - YAML: human-readable full database export

pub mod csv;
pub mod json;
pub mod yaml;

pub use csv::{export_csv, CsvExportOptions, CsvLayout, STANDARD_HEADERS};
pub use json::{export_full_json, import_from_json, restore, ExportMetadata, FullExport};
pub use yaml::{export_full_yaml, import_from_yaml};
