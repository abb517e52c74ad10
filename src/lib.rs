//! tidyfile: load CSV and spreadsheet files, clean them, and export CSV or XLSX.
//!
//! The per-stage modules can be used on their own; [`pipeline`] chains them per file.

pub mod chart_data;
pub mod chart_export;
pub mod cleaning;
pub mod config;
pub mod error;
pub mod error_display;
pub mod export;
pub mod loader;
pub mod logging;
pub mod normalize;
pub mod pipeline;
pub mod projection;
pub mod table;

pub use config::{AppConfig, ConfigManager};
pub use error::PipelineError;
pub use pipeline::{process_batch, process_upload, FileReport, FileResult, PipelineOptions, Upload};
pub use table::{ColumnKind, Table};
pub use tidyfile_cli::{Args, ChartFormat, ExportFormat, FileFormat};

/// Application name, used for the config directory.
pub const APP_NAME: &str = "tidyfile";
