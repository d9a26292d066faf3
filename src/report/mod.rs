//! Report rendering and export.

pub mod export;
pub mod generator;

pub use export::export_device_stats;
pub use generator::{generate_json_report, generate_markdown_report};
